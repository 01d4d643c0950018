//! Subprocess execution for install and test steps.
//!
//! Wraps `std::process::Command` so the session only deals with resolved
//! commands and captured output. Each step blocks until the child exits.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use keg_formula::ResolvedCommand;

use crate::error::StepFailure;

/// Where and how a stage runs its commands.
#[derive(Debug, Clone)]
pub struct StepEnv<'a> {
    /// Default working directory; relative command `cwd`s resolve against it.
    pub cwd: &'a Path,
    /// `PATH` for the child and for program lookup.
    pub path: &'a OsStr,
    /// Stage-wide environment, applied before the command's own `env`.
    pub vars: &'a BTreeMap<String, String>,
}

/// Output of a successful step.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run one resolved command to completion, capturing stdout and stderr.
///
/// # Errors
///
/// Returns a [`StepFailure`] if the working directory is missing, the
/// program cannot be started, or it exits unsuccessfully.
pub fn run_step(cmd: &ResolvedCommand, env: &StepEnv<'_>) -> Result<StepOutput, StepFailure> {
    let shown = cmd.to_string();
    let cwd = resolve_cwd(env.cwd, cmd.cwd.as_deref());
    if !cwd.is_dir() {
        return Err(StepFailure::without_output(
            Some(shown),
            format!("working directory does not exist: {}", cwd.display()),
        ));
    }

    tracing::debug!(command = %shown, cwd = %cwd.display(), "running step");

    let output = Command::new(&cmd.program)
        .args(&cmd.args)
        .current_dir(&cwd)
        .env("PATH", env.path)
        .envs(env.vars)
        .envs(&cmd.env)
        .output()
        .map_err(|e| {
            StepFailure::without_output(Some(shown.clone()), format!("failed to start: {e}"))
        })?;

    log_lines("stdout", &output.stdout);
    log_lines("stderr", &output.stderr);

    if !output.status.success() {
        return Err(StepFailure::from_output(
            shown,
            output.status.code(),
            &output.stdout,
            &output.stderr,
        ));
    }

    Ok(StepOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn resolve_cwd(base: &Path, cwd: Option<&str>) -> PathBuf {
    match cwd {
        Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => base.join(dir),
        None => base.to_path_buf(),
    }
}

fn log_lines(stream: &'static str, bytes: &[u8]) {
    for line in String::from_utf8_lossy(bytes).lines() {
        tracing::debug!(stream, "{line}");
    }
}
