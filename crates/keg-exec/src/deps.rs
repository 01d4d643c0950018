//! Dependency precondition checks.
//!
//! A dependency is satisfied when every executable it provides is on the
//! session `PATH`. Nothing is installed or resolved transitively.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use keg_formula::{DependencyStage, FormulaDescriptor};

use crate::error::StepFailure;

/// A resolved dependency executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub dependency: String,
    pub executable: String,
    pub path: PathBuf,
}

/// Check every dependency declared for `stage`.
///
/// # Errors
///
/// Returns a [`StepFailure`] naming all missing executables.
pub fn check_dependencies(
    formula: &FormulaDescriptor,
    stage: DependencyStage,
    search_path: &OsStr,
    cwd: &Path,
) -> Result<Vec<ResolvedTool>, StepFailure> {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for dep in formula.dependencies_for(stage) {
        for exe in dep.executables() {
            match which::which_in(exe, Some(search_path), cwd) {
                Ok(path) => {
                    tracing::debug!(dependency = %dep.name, executable = exe, path = %path.display(), "dependency found");
                    found.push(ResolvedTool {
                        dependency: dep.name.clone(),
                        executable: exe.to_string(),
                        path,
                    });
                }
                Err(_) => missing.push(format!("{} (needs `{exe}`)", dep.name)),
            }
        }
    }

    if missing.is_empty() {
        Ok(found)
    } else {
        Err(StepFailure::without_output(
            None,
            format!(
                "missing {stage} dependencies: {}",
                missing.join(", ")
            ),
        ))
    }
}
