//! Descriptor validation and lint rules.

use std::path::{Component, Path};

use url::Url;

use crate::engine::{KNOWN_VARIABLES, extract_variables};
use crate::types::{
    CommandSpec, DependencyStage, FormulaDescriptor, FormulaError, RawFormula, Result,
};

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// Version used when neither the file nor the URL carries one.
pub const FALLBACK_VERSION: &str = "HEAD";

/// Archive suffixes stripped before version inference, longest first.
const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".tar", ".zip"];

/// Schemes the executor knows how to fetch.
const FETCHABLE_SCHEMES: &[&str] = &["http", "https", "file"];

impl FormulaDescriptor {
    /// Validate a raw formula and build a descriptor from it.
    ///
    /// Every violation is collected; the error lists all of them.
    pub fn from_raw(raw: RawFormula) -> Result<Self> {
        let mut problems = Vec::new();

        if raw.name.is_empty() {
            problems.push("name is required".to_string());
        } else if !is_path_segment(&raw.name) {
            problems.push(format!("name '{}' contains invalid characters", raw.name));
        }
        if let Some(ref v) = raw.version {
            if !v.trim().is_empty() && !is_path_segment(v) {
                problems.push(format!("version '{v}' contains invalid characters"));
            }
        }

        let homepage = match Url::parse(&raw.homepage) {
            Ok(u) => Some(u),
            Err(e) => {
                problems.push(format!("homepage '{}' is not a valid URL: {e}", raw.homepage));
                None
            }
        };

        let source_url = match Url::parse(&raw.url) {
            Ok(u) if FETCHABLE_SCHEMES.contains(&u.scheme()) => Some(u),
            Ok(u) => {
                problems.push(format!("url scheme '{}' is not fetchable", u.scheme()));
                None
            }
            Err(e) => {
                problems.push(format!("url '{}' is not a valid URL: {e}", raw.url));
                None
            }
        };

        if !is_sha256_hex(&raw.sha256) {
            problems.push(format!(
                "sha256 must be {SHA256_HEX_LEN} hex characters (got {} characters)",
                raw.sha256.len()
            ));
        }

        for dep in &raw.depends_on {
            if dep.name.is_empty() {
                problems.push("dependency name is required".to_string());
            }
            if dep.provides.iter().any(String::is_empty) {
                problems.push(format!("dependency '{}' provides an empty name", dep.name));
            }
        }

        if raw.install.is_empty() {
            problems.push("install procedure is empty".to_string());
        }
        if raw.test.is_empty() {
            problems.push("test procedure is empty".to_string());
        }
        check_commands("install", &raw.install, &mut problems);
        check_commands("test", &raw.test, &mut problems);

        let (Some(homepage), Some(source_url), true) = (homepage, source_url, problems.is_empty())
        else {
            return Err(FormulaError::Malformed(problems));
        };

        let (version, version_inferred) = match raw.version.filter(|v| !v.trim().is_empty()) {
            Some(v) => (v, false),
            None => (
                infer_version(&source_url).unwrap_or_else(|| FALLBACK_VERSION.to_string()),
                true,
            ),
        };

        Ok(FormulaDescriptor {
            name: raw.name,
            description: raw.description,
            homepage,
            source_url,
            checksum: raw.sha256.to_ascii_lowercase(),
            license: raw.license,
            version,
            version_inferred,
            build_dependencies: raw.depends_on,
            install_procedure: raw.install,
            test_procedure: raw.test,
            source: String::new(),
        })
    }
}

/// Returns `true` if `s` is exactly 64 ASCII hex digits.
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == SHA256_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Infer a version from the last path segment of an archive URL.
///
/// `0.0.1.tar.gz` gives `0.0.1`, `tool-1.2.3.tgz` gives `1.2.3`, and
/// `v2.0.tar.gz` gives `2.0`.
pub fn infer_version(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let stem = ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| segment.strip_suffix(suffix))
        .unwrap_or(segment);
    let candidate = stem.rsplit(['-', '_']).next()?;
    let candidate = candidate
        .strip_prefix(['v', 'V'])
        .unwrap_or(candidate);

    let starts_with_digit = candidate.bytes().next().is_some_and(|b| b.is_ascii_digit());
    let well_formed = candidate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.');
    (starts_with_digit && well_formed).then(|| candidate.to_string())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-')
}

/// Name and version each become one directory under the cellar.
fn is_path_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && s.chars().all(is_name_char)
}

fn check_commands(procedure: &str, commands: &[CommandSpec], problems: &mut Vec<String>) {
    for (i, cmd) in commands.iter().enumerate() {
        if cmd.program.trim().is_empty() {
            problems.push(format!("{procedure}[{i}]: program is empty"));
        }
        if let Some(ref cwd) = cmd.cwd {
            if Path::new(cwd)
                .components()
                .any(|c| matches!(c, Component::ParentDir))
            {
                problems.push(format!("{procedure}[{i}]: cwd '{cwd}' must not contain '..'"));
            }
        }
        if cmd.env.keys().any(|k| k.is_empty() || k.contains('=')) {
            problems.push(format!("{procedure}[{i}]: invalid environment variable name"));
        }
    }
}

// ---------------------------------------------------------------------------
// Lint
// ---------------------------------------------------------------------------

/// A non-fatal finding about a valid descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintWarning {
    /// Short machine-readable identifier, e.g. `"placeholder-checksum"`.
    pub code: &'static str,
    pub message: String,
}

/// Check a descriptor for problems that do not prevent loading it.
pub fn lint(formula: &FormulaDescriptor) -> Vec<LintWarning> {
    let mut warnings = Vec::new();

    if formula.checksum().bytes().all(|b| b == b'0') {
        warnings.push(LintWarning {
            code: "placeholder-checksum",
            message: "sha256 is a placeholder; installs will fail the checksum gate".into(),
        });
    }
    if formula.source_url().scheme() == "http" {
        warnings.push(LintWarning {
            code: "insecure-url",
            message: format!("source url uses plain http: {}", formula.source_url()),
        });
    }
    if formula.description().trim().is_empty() {
        warnings.push(LintWarning {
            code: "missing-description",
            message: "description is empty".into(),
        });
    }
    if formula.license().trim().is_empty() {
        warnings.push(LintWarning {
            code: "missing-license",
            message: "license is empty".into(),
        });
    }
    if formula.version_inferred() && formula.version() == FALLBACK_VERSION {
        warnings.push(LintWarning {
            code: "unknown-version",
            message: format!("version could not be inferred from url; using {FALLBACK_VERSION}"),
        });
    }
    if formula.dependencies_for(DependencyStage::Build).next().is_none() {
        warnings.push(LintWarning {
            code: "no-build-dependency",
            message: "no build-stage dependency declared".into(),
        });
    }
    for var in extract_variables(formula) {
        if !KNOWN_VARIABLES.contains(&var.as_str()) {
            warnings.push(LintWarning {
                code: "unknown-placeholder",
                message: format!("{{{{{var}}}}} is never substituted"),
            });
        }
    }

    warnings
}
