//! Clap CLI definitions for the `keg` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// keg -- fetch, verify, build and test a formula.
///
/// Downloads a source archive, checks its SHA-256, unpacks it, runs the
/// formula's install steps into a prefix and then its smoke test.
#[derive(Parser, Debug)]
#[command(
    name = "keg",
    about = "Fetch, verify, build and test formulas",
    long_about = "Downloads a formula's source archive, verifies its SHA-256, unpacks it, runs the install steps into a prefix and finishes with the formula's smoke test.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Config file (default: $KEG_HOME/config.yaml).
    #[arg(long, global = true, env = "KEG_CONFIG")]
    pub config: Option<PathBuf>,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, verify, extract, build and test a formula.
    Install(InstallArgs),

    /// Run a formula's smoke test against an existing install.
    Test(TestArgs),

    /// Show every field of a formula.
    Info(FormulaArg),

    /// Validate a formula and report warnings.
    Lint(LintArgs),

    /// Print the SHA-256 of a local file or a URL.
    Checksum(ChecksumArgs),

    /// Print version information.
    Version,

    /// Generate shell completion scripts.
    Completion(CompletionArgs),
}

/// A formula name or path; omitted means the built-in `git-action`.
#[derive(Args, Debug, Clone)]
pub struct FormulaArg {
    /// Formula name or path to a .toml/.json file.
    pub formula: Option<String>,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub formula: FormulaArg,

    /// Install prefix (default: <cellar>/<name>/<version>).
    #[arg(long)]
    pub prefix: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub formula: FormulaArg,

    /// Install prefix to test (default: <cellar>/<name>/<version>).
    #[arg(long)]
    pub prefix: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LintArgs {
    #[command(flatten)]
    pub formula: FormulaArg,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// Local file path or http(s)/file URL.
    pub target: String,
}

#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

/// Completion subcommands.
#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}
