//! Configuration management for the keg installer.
//!
//! This crate resolves the keg home directory and loads `config.yaml`
//! layered with `KEG_*` environment overrides.

pub mod config;
pub mod keg_home;
