//! `keg` -- fetch, verify, build and test formulas.
//!
//! Parses CLI arguments with clap, loads configuration into a runtime
//! context, and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use keg_exec::Interrupt;
use keg_exec::session::EXIT_INTERRUPTED;
use keg_ui::styles::render_fail;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::SessionFailed;
use context::RuntimeContext;

fn main() {
    // First Ctrl+C: stop the session at the next checkpoint. Second: remove
    // the work directory and exit.
    let interrupt = Interrupt::new();
    {
        let interrupt = interrupt.clone();
        let _ = ctrlc::set_handler(move || {
            if interrupt.is_triggered() {
                interrupt.force_cleanup();
                std::process::exit(EXIT_INTERRUPTED);
            }
            interrupt.trigger();
        });
    }

    let cli = Cli::parse();

    let result = RuntimeContext::from_global_args(&cli.global, interrupt).and_then(|ctx| {
        init_tracing(&ctx);
        dispatch(&ctx, cli.command)
    });

    if let Err(e) = result {
        if let Some(failed) = e.downcast_ref::<SessionFailed>() {
            std::process::exit(failed.exit_code);
        }
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("{} {:#}", render_fail("Error:"), e);
        }
        std::process::exit(1);
    }
}

fn dispatch(ctx: &RuntimeContext, command: Option<Commands>) -> anyhow::Result<()> {
    match command {
        Some(Commands::Install(args)) => commands::install::run(ctx, &args),
        Some(Commands::Test(args)) => commands::test_cmd::run(ctx, &args),
        Some(Commands::Info(args)) => commands::info::run(ctx, &args),
        Some(Commands::Lint(args)) => commands::lint::run(ctx, &args),
        Some(Commands::Checksum(args)) => commands::checksum::run(ctx, &args),
        Some(Commands::Version) => commands::version::run(ctx),
        Some(Commands::Completion(args)) => commands::completion::run(&args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}

/// Crates whose events `--verbose` turns up to debug.
const VERBOSE_TARGETS: &[&str] = &["keg", "keg_exec", "keg_formula", "keg_config"];

/// `RUST_LOG` wins; otherwise the flags, then `log.filter`, then warnings only.
fn init_tracing(ctx: &RuntimeContext) {
    let directive = default_directive(ctx.verbose, ctx.quiet, ctx.config.log.filter.as_deref());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_directive(verbose: bool, quiet: bool, configured: Option<&str>) -> String {
    if verbose {
        VERBOSE_TARGETS
            .iter()
            .map(|target| format!("{target}=debug"))
            .collect::<Vec<_>>()
            .join(",")
    } else if quiet {
        "error".to_string()
    } else {
        configured.unwrap_or("warn").to_string()
    }
}
