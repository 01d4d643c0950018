//! The install session state machine.
//!
//! An [`Executor`] runs one formula through
//! `Fetching -> Verifying -> Extracting -> Building -> Testing` and ends in
//! `Succeeded` or `Failed(reason)`. Each run owns a work directory held as a
//! [`TempDir`], so it is removed on success, on failure, and on unwinding.
//! While a session runs its work directory is also registered with the
//! [`Interrupt`], so a forced exit can remove it too.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use keg_formula::engine::session_vars;
use keg_formula::{CommandSpec, DependencyStage, FormulaDescriptor, ResolvedCommand};
use serde::Serialize;
use tempfile::TempDir;

use crate::deps::{ResolvedTool, check_dependencies};
use crate::error::{FailureReason, StepFailure};
use crate::extract::extract_archive;
use crate::fetch::{Fetcher, archive_file_name};
use crate::process::{StepEnv, StepOutput, run_step};
use crate::state::{SessionState, Stage};
use crate::verify::verify_checksum;

/// `PATH` used when the environment has none.
const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Exit code reported for interrupted sessions (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

// ---------------------------------------------------------------------------
// Interrupt
// ---------------------------------------------------------------------------

/// Shared cancellation flag.
///
/// Checked before every state entry and around every subprocess. Setting it
/// never resumes anything: the session ends in `Failed(Interrupted)`.
///
/// It also tracks the running session's work directory so a handler that
/// exits the process outright can call [`force_cleanup`](Self::force_cleanup)
/// first.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
    work_dir: Arc<Mutex<Option<PathBuf>>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Work directory of the session currently running, if any.
    pub fn registered_work_dir(&self) -> Option<PathBuf> {
        self.slot().clone()
    }

    /// Remove the registered work directory now. Used right before a forced
    /// `process::exit`, which skips every destructor.
    pub fn force_cleanup(&self) {
        if let Some(dir) = self.slot().take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                tracing::warn!(path = %dir.display(), error = %e, "failed to remove work directory");
            }
        }
    }

    fn register_work_dir(&self, dir: &Path) {
        *self.slot() = Some(dir.to_path_buf());
    }

    fn clear_work_dir(&self) {
        self.slot().take();
    }

    fn slot(&self) -> MutexGuard<'_, Option<PathBuf>> {
        self.work_dir.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Receives progress notifications while a session runs.
pub trait SessionObserver {
    /// Called on every state entry, terminal states included.
    fn on_state(&mut self, _formula: &FormulaDescriptor, _state: &SessionState) {}

    /// Called before each build or test command starts.
    fn on_step(&mut self, _stage: Stage, _command: &ResolvedCommand) {}

    /// Called once a stage's dependencies are all found on `PATH`.
    fn on_tools(&mut self, _stage: Stage, _tools: &[ResolvedTool]) {}
}

/// An observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What a finished session leaves behind.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub formula: String,
    pub version: String,
    /// Terminal state.
    pub state: SessionState,
    /// Every state entered, in order, ending with [`state`](Self::state).
    pub history: Vec<SessionState>,
    /// Where the work directory was. It no longer exists.
    pub work_dir: Option<PathBuf>,
    /// Set once `Building` completed.
    pub installed_prefix: Option<PathBuf>,
    /// Digest computed during `Verifying`.
    pub sha256: Option<String>,
    /// Stdout of the last test command, once `Testing` completed.
    pub test_output: Option<String>,
}

impl SessionReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.state, SessionState::Succeeded)
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.state.failure()
    }

    /// Whether the session ever entered `stage`.
    pub fn reached(&self, stage: Stage) -> bool {
        self.history.iter().any(|s| s.stage() == Some(stage))
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self.state {
            SessionState::Succeeded => 0,
            SessionState::Failed(FailureReason::Interrupted) => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One execution of a formula.
struct InstallSession<'a> {
    formula: &'a FormulaDescriptor,
    work_dir: TempDir,
    history: Vec<SessionState>,
    installed_prefix: Option<PathBuf>,
    sha256: Option<String>,
    test_output: Option<String>,
    observer: &'a mut dyn SessionObserver,
}

impl<'a> InstallSession<'a> {
    fn new(
        formula: &'a FormulaDescriptor,
        work_dir: TempDir,
        observer: &'a mut dyn SessionObserver,
    ) -> Self {
        Self {
            formula,
            work_dir,
            history: Vec::new(),
            installed_prefix: None,
            sha256: None,
            test_output: None,
            observer,
        }
    }

    fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    fn enter(&mut self, state: SessionState) {
        tracing::info!(formula = self.formula.name(), stage = state.name(), "entering state");
        self.observer.on_state(self.formula, &state);
        self.history.push(state);
    }

    /// Enter the terminal state, remove the work directory, and report.
    fn finish(mut self, outcome: Result<(), FailureReason>) -> SessionReport {
        let terminal = match outcome {
            Ok(()) => SessionState::Succeeded,
            Err(reason) => SessionState::Failed(reason),
        };
        self.enter(terminal.clone());

        let work_dir = self.work_dir.path().to_path_buf();
        if let Err(e) = self.work_dir.close() {
            tracing::warn!(path = %work_dir.display(), error = %e, "failed to remove work directory");
        }

        SessionReport {
            formula: self.formula.name().to_string(),
            version: self.formula.version().to_string(),
            state: terminal,
            history: self.history,
            work_dir: Some(work_dir),
            installed_prefix: self.installed_prefix,
            sha256: self.sha256,
            test_output: self.test_output,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs formulas. Holds no per-session state; one executor can run many
/// sessions one after another.
pub struct Executor<F: Fetcher> {
    fetcher: F,
    work_root: Option<PathBuf>,
    search_path: OsString,
    interrupt: Interrupt,
}

impl<F: Fetcher> Executor<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            work_root: None,
            search_path: std::env::var_os("PATH").unwrap_or_else(|| FALLBACK_PATH.into()),
            interrupt: Interrupt::new(),
        }
    }

    /// Create session work directories under `root` instead of the system temp dir.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    /// `PATH` used for dependency checks and subprocesses.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = path.into();
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Run the full lifecycle, installing into `prefix`.
    pub fn install(
        &self,
        formula: &FormulaDescriptor,
        prefix: &Path,
        observer: &mut dyn SessionObserver,
    ) -> SessionReport {
        self.run_session(formula, observer, |exec, session| {
            let prefix = absolute(prefix)?;
            exec.fetch_verify_extract(session)
                .and_then(|source| exec.build(session, &source, &prefix))
                .and_then(|()| exec.test(session, &prefix))
        })
    }

    /// Run only the `Testing` stage against an existing install.
    pub fn test_installed(
        &self,
        formula: &FormulaDescriptor,
        prefix: &Path,
        observer: &mut dyn SessionObserver,
    ) -> SessionReport {
        self.run_session(formula, observer, |exec, session| {
            let prefix = absolute(prefix)?;
            if !prefix.is_dir() {
                return Err(FailureReason::Test(StepFailure::without_output(
                    None,
                    format!("install prefix does not exist: {}", prefix.display()),
                )));
            }
            exec.test(session, &prefix)
        })
    }

    fn run_session<B>(
        &self,
        formula: &FormulaDescriptor,
        observer: &mut dyn SessionObserver,
        body: B,
    ) -> SessionReport
    where
        B: FnOnce(&Self, &mut InstallSession<'_>) -> Result<(), FailureReason>,
    {
        let work_dir = match self.make_work_dir(formula) {
            Ok(dir) => dir,
            Err(reason) => {
                let state = SessionState::Failed(reason);
                observer.on_state(formula, &state);
                return SessionReport {
                    formula: formula.name().to_string(),
                    version: formula.version().to_string(),
                    state: state.clone(),
                    history: vec![state],
                    work_dir: None,
                    installed_prefix: None,
                    sha256: None,
                    test_output: None,
                };
            }
        };

        self.interrupt.register_work_dir(work_dir.path());
        let mut session = InstallSession::new(formula, work_dir, observer);
        let outcome = body(self, &mut session);
        let report = session.finish(outcome);
        self.interrupt.clear_work_dir();
        report
    }

    fn make_work_dir(&self, formula: &FormulaDescriptor) -> Result<TempDir, FailureReason> {
        let prefix = format!("keg-{}-", formula.name());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let result = match self.work_root {
            Some(ref root) => std::fs::create_dir_all(root).and_then(|()| builder.tempdir_in(root)),
            None => builder.tempdir(),
        };
        result.map_err(|e| FailureReason::Session {
            message: format!("failed to create work directory: {e}"),
        })
    }

    fn checkpoint(&self) -> Result<(), FailureReason> {
        if self.interrupt.is_triggered() {
            Err(FailureReason::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Fetching, Verifying and Extracting. Returns the extracted source root.
    fn fetch_verify_extract(&self, session: &mut InstallSession<'_>) -> Result<PathBuf, FailureReason> {
        let formula = session.formula;
        let url = formula.source_url();

        self.checkpoint()?;
        session.enter(SessionState::Fetching);
        let bytes = self.fetcher.fetch(url).map_err(|e| FailureReason::Fetch {
            url: url.to_string(),
            message: e.message,
        })?;
        // Kept apart from `src` and `test`, which the archive may be named after.
        let download_dir = session.work_dir().join("download");
        let archive = download_dir.join(archive_file_name(url));
        std::fs::create_dir_all(&download_dir)
            .and_then(|()| std::fs::write(&archive, &bytes))
            .map_err(|e| FailureReason::Fetch {
                url: url.to_string(),
                message: format!("failed to write {}: {e}", archive.display()),
            })?;
        tracing::debug!(bytes = bytes.len(), path = %archive.display(), "archive downloaded");

        self.checkpoint()?;
        session.enter(SessionState::Verifying);
        session.sha256 = Some(verify_checksum(&bytes, formula.checksum())?);

        self.checkpoint()?;
        session.enter(SessionState::Extracting);
        let source = extract_archive(&bytes, &session.work_dir().join("src"))?;
        tracing::debug!(root = %source.display(), "archive extracted");
        Ok(source)
    }

    fn build(
        &self,
        session: &mut InstallSession<'_>,
        source: &Path,
        prefix: &Path,
    ) -> Result<(), FailureReason> {
        let formula = session.formula;

        self.checkpoint()?;
        session.enter(SessionState::Building);
        let tools = check_dependencies(formula, DependencyStage::Build, &self.search_path, source)
            .map_err(FailureReason::Build)?;
        session.observer.on_tools(Stage::Building, &tools);
        std::fs::create_dir_all(prefix).map_err(|e| {
            FailureReason::Build(StepFailure::without_output(
                None,
                format!("failed to create prefix {}: {e}", prefix.display()),
            ))
        })?;

        let mut stage_env = prefix_env(prefix);
        stage_env.insert("KEG_SOURCE".into(), source.display().to_string());
        let env = StepEnv {
            cwd: source,
            path: &self.search_path,
            vars: &stage_env,
        };
        let vars = session_vars(formula, prefix, Some(source));
        self.run_procedure(
            session,
            Stage::Building,
            formula.install_procedure(),
            &vars,
            &env,
            FailureReason::Build,
        )?;

        session.installed_prefix = Some(prefix.to_path_buf());
        Ok(())
    }

    fn test(&self, session: &mut InstallSession<'_>, prefix: &Path) -> Result<(), FailureReason> {
        let formula = session.formula;

        self.checkpoint()?;
        session.enter(SessionState::Testing);
        let test_failure = |message: String| {
            FailureReason::Test(StepFailure::without_output(None, message))
        };

        let test_dir = session.work_dir().join("test");
        std::fs::create_dir_all(&test_dir)
            .map_err(|e| test_failure(format!("failed to create {}: {e}", test_dir.display())))?;

        let bin = prefix.join("bin");
        let search_path = std::env::join_paths(
            std::iter::once(bin).chain(std::env::split_paths(&self.search_path)),
        )
        .map_err(|e| test_failure(format!("cannot put install prefix on PATH: {e}")))?;

        let tools = check_dependencies(formula, DependencyStage::Run, &search_path, &test_dir)
            .map_err(FailureReason::Test)?;
        session.observer.on_tools(Stage::Testing, &tools);

        let mut stage_env = prefix_env(prefix);
        stage_env.insert("HOME".into(), test_dir.display().to_string());
        let env = StepEnv {
            cwd: &test_dir,
            path: &search_path,
            vars: &stage_env,
        };
        let vars = session_vars(formula, prefix, None);
        let last = self.run_procedure(
            session,
            Stage::Testing,
            formula.test_procedure(),
            &vars,
            &env,
            FailureReason::Test,
        )?;
        session.test_output = last.map(|output| output.stdout);
        Ok(())
    }

    fn run_procedure(
        &self,
        session: &mut InstallSession<'_>,
        stage: Stage,
        commands: &[CommandSpec],
        vars: &std::collections::HashMap<String, String>,
        env: &StepEnv<'_>,
        wrap: fn(StepFailure) -> FailureReason,
    ) -> Result<Option<StepOutput>, FailureReason> {
        let mut last = None;
        for spec in commands {
            self.checkpoint()?;
            let command = spec.render(vars);
            session.observer.on_step(stage, &command);
            let result = run_step(&command, env);
            // A child killed by the same Ctrl+C is reported as the interrupt.
            self.checkpoint()?;
            let output = result.map_err(wrap)?;
            tracing::trace!(stage = %stage, stdout = %output.stdout, stderr = %output.stderr, "step output");
            last = Some(output);
        }
        Ok(last)
    }
}

fn prefix_env(prefix: &Path) -> BTreeMap<String, String> {
    let prefix = prefix.display().to_string();
    BTreeMap::from([
        ("PREFIX".to_string(), prefix.clone()),
        ("KEG_PREFIX".to_string(), prefix),
    ])
}

fn absolute(path: &Path) -> Result<PathBuf, FailureReason> {
    std::path::absolute(path).map_err(|e| FailureReason::Session {
        message: format!("invalid install prefix {}: {e}", path.display()),
    })
}
