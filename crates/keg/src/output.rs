//! Output helpers for the `keg` CLI.
//!
//! JSON goes to stdout; stage lines (`==> [fetching] ...`) and diagnostics go
//! to stderr so `--json` output stays machine-readable.

use std::io::{self, Write};

use keg_exec::deps::ResolvedTool;
use keg_exec::fetch::archive_file_name;
use keg_exec::{SessionObserver, SessionState, Stage};
use keg_formula::{FormulaDescriptor, ResolvedCommand};
use keg_ui::styles::{Tone, render_muted, stage_line};
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// One-line summary of what a state is doing, for stage lines.
pub fn describe_state(formula: &FormulaDescriptor, state: &SessionState) -> String {
    match state {
        SessionState::Fetching => formula.source_url().to_string(),
        SessionState::Verifying => format!("sha256 {}", formula.checksum()),
        SessionState::Extracting => archive_file_name(formula.source_url()),
        SessionState::Building | SessionState::Testing | SessionState::Succeeded => {
            format!("{} {}", formula.name(), formula.version())
        }
        SessionState::Failed(reason) => reason.to_string(),
    }
}

/// Which executable satisfied a dependency.
pub fn describe_tool(tool: &ResolvedTool) -> String {
    format!("using {} ({}) for {}", tool.executable, tool.path.display(), tool.dependency)
}

/// Prints a stage line on every state entry and each command as it starts.
#[derive(Debug, Default)]
pub struct StageReporter {
    quiet: bool,
}

impl StageReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl SessionObserver for StageReporter {
    fn on_state(&mut self, formula: &FormulaDescriptor, state: &SessionState) {
        let failed = matches!(state, SessionState::Failed(_));
        if self.quiet && !failed {
            return;
        }
        let tone = match state {
            SessionState::Succeeded => Tone::Pass,
            SessionState::Failed(_) => Tone::Fail,
            _ => Tone::Progress,
        };
        let text = describe_state(formula, state);
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();
        eprintln!("{}", stage_line(state.name(), first, tone));
        // Captured stdout/stderr of a failed step follows the headline.
        for line in lines {
            eprintln!("{line}");
        }
    }

    fn on_step(&mut self, stage: Stage, command: &ResolvedCommand) {
        if !self.quiet {
            eprintln!(
                "{}",
                stage_line(stage.as_str(), &render_muted(&format!("$ {command}")), Tone::Progress)
            );
        }
    }

    fn on_tools(&mut self, stage: Stage, tools: &[ResolvedTool]) {
        if self.quiet {
            return;
        }
        for tool in tools {
            eprintln!(
                "{}",
                stage_line(stage.as_str(), &render_muted(&describe_tool(tool)), Tone::Progress)
            );
        }
    }
}
