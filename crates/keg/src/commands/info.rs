//! `keg info` -- show every field of a formula.

use anyhow::Result;
use keg_formula::{CommandSpec, FormulaDescriptor};
use keg_ui::styles::{render_bold, render_muted};

use crate::cli::FormulaArg;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `keg info` command.
pub fn run(ctx: &RuntimeContext, args: &FormulaArg) -> Result<()> {
    let formula = ctx.load_formula(args.formula.as_deref())?;

    if ctx.json {
        output_json(&formula);
    } else {
        print!("{}", render_info(&formula, &render_bold, &render_muted));
    }
    Ok(())
}

/// Human-readable description of a formula.
fn render_info(
    formula: &FormulaDescriptor,
    bold: &dyn Fn(&str) -> String,
    muted: &dyn Fn(&str) -> String,
) -> String {
    let mut out = String::new();
    let version = if formula.version_inferred() {
        format!("{} {}", formula.version(), muted("(from url)"))
    } else {
        formula.version().to_string()
    };
    out.push_str(&format!("{} {}\n", bold(formula.name()), version));

    let fields = [
        ("description", formula.description().to_string()),
        ("homepage", formula.homepage().to_string()),
        ("url", formula.source_url().to_string()),
        ("sha256", formula.checksum().to_string()),
        ("license", formula.license().to_string()),
        ("source", formula.source().to_string()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            out.push_str(&format!("  {:<12} {}\n", format!("{label}:"), value));
        }
    }

    if !formula.build_dependencies().is_empty() {
        out.push_str("  dependencies:\n");
        for dep in formula.build_dependencies() {
            out.push_str(&format!(
                "    {} {}\n",
                dep.name,
                muted(&format!("({}; provides {})", dep.stage, dep.executables().join(", ")))
            ));
        }
    }
    push_procedure(&mut out, "install", formula.install_procedure());
    push_procedure(&mut out, "test", formula.test_procedure());
    out
}

fn push_procedure(out: &mut String, label: &str, commands: &[CommandSpec]) {
    out.push_str(&format!("  {label}:\n"));
    for command in commands {
        out.push_str(&format!("    {command}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn renders_git_action() {
        let formula = keg_formula::builtin::git_action().unwrap();
        let text = render_info(&formula, &plain, &plain);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("git-action 0.0.1"), "{}", lines[0]);
        assert!(text.contains("  description: Git-Action\n"), "{text}");
        assert!(text.contains("    rust (build; provides cargo)\n"), "{text}");
        assert!(text.contains("    cargo install --locked --root {{prefix}} --path .\n"), "{text}");
        assert_eq!(lines.last(), Some(&"    git-action --version"));
    }
}
