//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what every command handler needs: the keg
//! home, the loaded configuration, global flags and the shared interrupt.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use keg_config::config::{KegConfig, load_config};
use keg_config::keg_home::{ensure_dir, keg_home_or_error};
use keg_exec::Interrupt;
use keg_exec::fetch::HttpFetcher;
use keg_exec::session::Executor;
use keg_formula::parser::{find_formula, load_formula};
use keg_formula::{FormulaDescriptor, builtin};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Resolved keg home (`$KEG_HOME` or `~/.keg`).
    pub keg_home: PathBuf,

    /// Layered configuration.
    pub config: KegConfig,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,

    /// Set by the Ctrl+C handler.
    pub interrupt: Interrupt,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs, interrupt: Interrupt) -> Result<Self> {
        let keg_home = keg_home_or_error()?;
        let config = load_config(&keg_home, global.config.as_deref())?;

        Ok(Self {
            keg_home,
            config,
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
            interrupt,
        })
    }

    /// Resolve a formula argument.
    ///
    /// `None` is the built-in `git-action` formula. A name is searched on
    /// disk first (so a local `Formula/git-action.toml` wins) and falls back
    /// to the built-in formulas.
    pub fn load_formula(&self, name: Option<&str>) -> Result<FormulaDescriptor> {
        let Some(name) = name else {
            return builtin::git_action().context("built-in formula is invalid");
        };

        let cwd = std::env::current_dir().context("failed to read current directory")?;
        match find_formula(name, &cwd, &self.config.formula_dirs) {
            Ok(path) => load_formula(&path)
                .with_context(|| format!("failed to load formula {}", path.display())),
            Err(not_found) => match builtin::find(name) {
                Some(formula) => formula.context("built-in formula is invalid"),
                None => Err(not_found.into()),
            },
        }
    }

    /// The install prefix for `formula`: the explicit one, else the cellar path.
    pub fn install_prefix(&self, formula: &FormulaDescriptor, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(prefix) => prefix.to_path_buf(),
            None => self
                .config
                .install_prefix(&self.keg_home, formula.name(), formula.version()),
        }
    }

    /// Fetcher configured from `http.*`.
    pub fn fetcher(&self) -> HttpFetcher {
        let http = &self.config.http;
        HttpFetcher::new(
            Duration::from_secs(http.timeout_secs),
            http.user_agent.clone(),
            http.max_download_bytes,
        )
    }

    /// Executor wired to the configured fetcher, work root and interrupt.
    pub fn executor(&self) -> Result<Executor<HttpFetcher>> {
        let mut executor = Executor::new(self.fetcher()).with_interrupt(self.interrupt.clone());
        if let Some(ref root) = self.config.work_root {
            let root = ensure_dir(root).context("failed to create work root")?;
            executor = executor.with_work_root(root);
        }
        Ok(executor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx(home: &Path) -> RuntimeContext {
        RuntimeContext {
            keg_home: home.to_path_buf(),
            config: KegConfig::default(),
            json: false,
            verbose: false,
            quiet: false,
            interrupt: Interrupt::new(),
        }
    }

    #[test]
    fn default_formula_is_git_action() {
        let home = tempfile::tempdir().unwrap();
        let formula = ctx(home.path()).load_formula(None).unwrap();
        assert_eq!(formula.name(), "git-action");
    }

    #[test]
    fn unknown_formula_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let err = ctx(home.path()).load_formula(Some("keg-no-such-formula")).unwrap_err();
        assert!(err.to_string().contains("not found"), "{err}");
    }

    #[test]
    fn prefix_defaults_to_cellar() {
        let home = tempfile::tempdir().unwrap();
        let c = ctx(home.path());
        let formula = c.load_formula(None).unwrap();
        assert_eq!(
            c.install_prefix(&formula, None),
            home.path().join("Cellar/git-action/0.0.1")
        );
        assert_eq!(
            c.install_prefix(&formula, Some(Path::new("/opt/ga"))),
            PathBuf::from("/opt/ga")
        );
    }
}
