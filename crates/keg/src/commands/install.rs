//! `keg install` -- run the full lifecycle for a formula.

use anyhow::Result;
use keg_formula::validation::lint;

use super::session_outcome;
use crate::cli::InstallArgs;
use crate::context::RuntimeContext;
use crate::output::{StageReporter, output_json};

/// Execute the `keg install` command.
pub fn run(ctx: &RuntimeContext, args: &InstallArgs) -> Result<()> {
    let formula = ctx.load_formula(args.formula.formula.as_deref())?;
    for warning in lint(&formula) {
        tracing::warn!(formula = formula.name(), code = warning.code, "{}", warning.message);
    }

    let prefix = ctx.install_prefix(&formula, args.prefix.as_deref());
    let executor = ctx.executor()?;
    let mut reporter = StageReporter::new(ctx.quiet);
    let report = executor.install(&formula, &prefix, &mut reporter);

    if ctx.json {
        output_json(&report);
    } else if report.succeeded() && !ctx.quiet {
        if let Some(ref installed) = report.installed_prefix {
            println!("{} {} installed to {}", formula.name(), formula.version(), installed.display());
        }
    }

    session_outcome(&report)
}
