//! Discovery and creation of the keg home directory.
//!
//! The home directory holds `config.yaml` and, by default, the `Cellar/`
//! install root. It is `$KEG_HOME` when set, else `~/.keg`.

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// The name of the keg home directory under the user's home.
const KEG_DIR_NAME: &str = ".keg";

/// The name of the environment variable that overrides the home directory.
pub const KEG_HOME_ENV: &str = "KEG_HOME";

/// Resolve the keg home directory without touching the filesystem.
///
/// Returns `None` when neither `KEG_HOME` nor a user home is available.
pub fn keg_home() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(KEG_HOME_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    user_home().map(|home| home.join(KEG_DIR_NAME))
}

/// Resolve the keg home directory, returning an error if it cannot be found.
///
/// # Errors
///
/// Returns [`ConfigError::Home`] if no home directory can be determined.
pub fn keg_home_or_error() -> Result<PathBuf, ConfigError> {
    keg_home().ok_or_else(|| {
        ConfigError::Home(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "set KEG_HOME or HOME",
        ))
    })
}

/// Ensure a directory exists, creating it and any parents.
///
/// # Errors
///
/// Returns [`ConfigError::Home`] if directory creation fails.
pub fn ensure_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    std::fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Get the user's home directory.
fn user_home() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
