//! Configuration types and loading for keg.
//!
//! The main entry point is [`KegConfig`], loaded with [`load_config`] from
//! built-in defaults, then `config.yaml`, then `KEG_*` environment variables
//! (`__` separates nested keys, e.g. `KEG_HTTP__TIMEOUT_SECS=60`).

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the configuration file inside the keg home directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "KEG_";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A provider failed or the merged values did not match the schema.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// The home directory could not be determined or created.
    #[error("keg home unavailable: {0}")]
    Home(#[from] std::io::Error),

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Figment(Box::new(e))
    }
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest archive accepted, in bytes.
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("keg/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_download_bytes() -> u64 {
    512 * 1024 * 1024
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `"keg=debug"`. `RUST_LOG` wins.
    #[serde(default)]
    pub filter: Option<String>,
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full keg configuration.
///
/// All fields use `serde` defaults so that a partially-specified YAML file
/// will be deserialized correctly with sensible default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KegConfig {
    /// Root for installs; a formula installs to `<cellar>/<name>/<version>`.
    /// Defaults to `<keg home>/Cellar`.
    #[serde(default)]
    pub cellar: Option<PathBuf>,

    /// Extra directories searched for formula files.
    #[serde(default)]
    pub formula_dirs: Vec<PathBuf>,

    /// Parent directory for session work directories (default: system temp).
    #[serde(default)]
    pub work_root: Option<PathBuf>,

    /// HTTP fetch settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl KegConfig {
    /// Resolve the cellar directory against the keg home.
    pub fn cellar_dir(&self, home: &Path) -> PathBuf {
        self.cellar
            .clone()
            .unwrap_or_else(|| home.join("Cellar"))
    }

    /// Default install prefix for a package.
    pub fn install_prefix(&self, home: &Path, name: &str, version: &str) -> PathBuf {
        self.cellar_dir(home).join(name).join(version)
    }

    /// Check values that deserialize fine but make no sense.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "http.timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.http.max_download_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "http.max_download_bytes".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "http.user_agent".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the provider stack: defaults, then the YAML file, then `KEG_*` env.
///
/// `explicit` replaces `<home>/config.yaml` and must exist.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if `explicit` does not exist.
pub fn figment(home: &Path, explicit: Option<&Path>) -> Result<Figment> {
    let file = match explicit {
        Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => home.join(CONFIG_FILE),
    };

    Ok(Figment::from(Serialized::defaults(KegConfig::default()))
        .merge(Yaml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).split("__")))
}

/// Load and validate configuration.
///
/// A missing `<home>/config.yaml` is not an error: defaults apply.
///
/// # Errors
///
/// Returns [`ConfigError::Figment`] on malformed YAML or mistyped values, and
/// [`ConfigError::InvalidValue`] when validation fails.
pub fn load_config(home: &Path, explicit: Option<&Path>) -> Result<KegConfig> {
    let config: KegConfig = figment(home, explicit)?.extract()?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
