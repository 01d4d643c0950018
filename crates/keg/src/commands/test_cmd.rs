//! `keg test` -- run a formula's smoke test against an existing install.

use anyhow::Result;

use super::session_outcome;
use crate::cli::TestArgs;
use crate::context::RuntimeContext;
use crate::output::{StageReporter, output_json};

/// Execute the `keg test` command.
pub fn run(ctx: &RuntimeContext, args: &TestArgs) -> Result<()> {
    let formula = ctx.load_formula(args.formula.formula.as_deref())?;
    let prefix = ctx.install_prefix(&formula, args.prefix.as_deref());
    let executor = ctx.executor()?;
    let mut reporter = StageReporter::new(ctx.quiet);
    let report = executor.test_installed(&formula, &prefix, &mut reporter);

    if ctx.json {
        output_json(&report);
    } else if report.succeeded() && !ctx.quiet {
        println!("{} {} passed its test", formula.name(), formula.version());
    }

    session_outcome(&report)
}
