//! `keg lint` -- validate a formula and report warnings.
//!
//! Loading already rejects malformed descriptors; this adds the non-fatal
//! checks from [`keg_formula::validation::lint`].

use anyhow::{Result, bail};
use keg_formula::validation::lint;
use keg_ui::styles::{render_pass_icon, render_warn, render_warn_icon};

use crate::cli::LintArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `keg lint` command.
pub fn run(ctx: &RuntimeContext, args: &LintArgs) -> Result<()> {
    let formula = ctx.load_formula(args.formula.formula.as_deref())?;
    let warnings = lint(&formula);

    if ctx.json {
        let items: Vec<_> = warnings
            .iter()
            .map(|w| serde_json::json!({ "code": w.code, "message": w.message }))
            .collect();
        output_json(&serde_json::json!({
            "formula": formula.name(),
            "valid": true,
            "warnings": items,
        }));
    } else if warnings.is_empty() {
        if !ctx.quiet {
            println!("{} {}: no problems found", render_pass_icon(), formula.name());
        }
    } else {
        for w in &warnings {
            println!("{} {} {}", render_warn_icon(), render_warn(w.code), w.message);
        }
    }

    if args.strict && !warnings.is_empty() {
        bail!("{}: {} warning(s) with --strict", formula.name(), warnings.len());
    }
    Ok(())
}
