//! Formula data model.
//!
//! [`RawFormula`] is the on-disk shape (TOML or JSON). It is turned into a
//! [`FormulaDescriptor`] only through validation, so a descriptor that exists
//! is always well-formed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root structure for `<name>.toml` / `<name>.json` formula files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFormula {
    /// Unique package name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Project homepage.
    pub homepage: String,

    /// Source archive URL.
    pub url: String,

    /// Expected SHA-256 of the archive, hex encoded.
    pub sha256: String,

    /// SPDX license identifier.
    #[serde(default)]
    pub license: String,

    /// Explicit version. Inferred from `url` when absent.
    #[serde(default)]
    pub version: Option<String>,

    /// Tools that must be present on the host.
    #[serde(default)]
    pub depends_on: Vec<Dependency>,

    /// Commands that build and install into the prefix.
    #[serde(default)]
    pub install: Vec<CommandSpec>,

    /// Commands that smoke-test the installed result.
    #[serde(default)]
    pub test: Vec<CommandSpec>,
}

/// When a dependency is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStage {
    /// Needed while running the install procedure.
    #[default]
    Build,
    /// Needed while running the test procedure.
    Run,
}

impl DependencyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyStage::Build => "build",
            DependencyStage::Run => "run",
        }
    }
}

impl fmt::Display for DependencyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host tool the formula needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Dependency name, e.g. `"rust"`.
    pub name: String,

    /// Stage in which the dependency must be satisfied.
    #[serde(default)]
    pub stage: DependencyStage,

    /// Executables whose presence on `PATH` satisfies the dependency.
    /// Empty means "an executable called `name`".
    #[serde(default)]
    pub provides: Vec<String>,
}

impl Dependency {
    /// Executables to look up on `PATH`.
    pub fn executables(&self) -> Vec<&str> {
        if self.provides.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.provides.iter().map(String::as_str).collect()
        }
    }
}

/// A typed command: one program, its arguments, and environment overrides.
///
/// Every string field may contain `{{placeholder}}` references which are
/// resolved by [`CommandSpec::render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program to execute (looked up on `PATH` unless it contains a slash).
    pub program: String,

    /// Arguments, passed verbatim after substitution.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for this command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory; relative paths resolve against the stage directory.
    #[serde(default)]
    pub cwd: Option<String>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A [`CommandSpec`] with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<String>,
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// A validated, immutable formula.
///
/// Construct with [`FormulaDescriptor::from_raw`] or the parser functions.
#[derive(Debug, Clone, Serialize)]
pub struct FormulaDescriptor {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) homepage: Url,
    pub(crate) source_url: Url,
    pub(crate) checksum: String,
    pub(crate) license: String,
    pub(crate) version: String,
    pub(crate) version_inferred: bool,
    pub(crate) build_dependencies: Vec<Dependency>,
    pub(crate) install_procedure: Vec<CommandSpec>,
    pub(crate) test_procedure: Vec<CommandSpec>,
    #[serde(skip)]
    pub(crate) source: String,
}

impl FormulaDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn homepage(&self) -> &Url {
        &self.homepage
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Lowercase hex SHA-256 the archive must match.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn license(&self) -> &str {
        &self.license
    }

    /// Package version, explicit or inferred from the source URL.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether [`version`](Self::version) was inferred rather than declared.
    pub fn version_inferred(&self) -> bool {
        self.version_inferred
    }

    pub fn build_dependencies(&self) -> &[Dependency] {
        &self.build_dependencies
    }

    /// Dependencies required in the given stage.
    pub fn dependencies_for(&self, stage: DependencyStage) -> impl Iterator<Item = &Dependency> {
        self.build_dependencies
            .iter()
            .filter(move |d| d.stage == stage)
    }

    pub fn install_procedure(&self) -> &[CommandSpec] {
        &self.install_procedure
    }

    pub fn test_procedure(&self) -> &[CommandSpec] {
        &self.test_procedure
    }

    /// Where this formula was loaded from (empty for in-memory formulas).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Errors that can occur during formula loading.
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("malformed descriptor: {}", .0.join("; "))]
    Malformed(Vec<String>),

    #[error("formula '{0}' not found")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for formula operations.
pub type Result<T> = std::result::Result<T, FormulaError>;
