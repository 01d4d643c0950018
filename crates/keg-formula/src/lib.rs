//! Formula descriptors for the keg installer.
//!
//! A formula declares where a package's source archive lives, the digest it
//! must match, the host tools it needs, and two typed command sequences:
//! `install` (run inside the extracted source tree) and `test` (run against
//! the installed prefix).

pub mod builtin;
pub mod engine;
pub mod parser;
pub mod types;
pub mod validation;

pub use types::{
    CommandSpec, Dependency, DependencyStage, FormulaDescriptor, FormulaError, RawFormula,
    ResolvedCommand,
};
