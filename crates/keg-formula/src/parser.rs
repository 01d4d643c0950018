//! Parse formula files (TOML and JSON) and resolve formula paths.

use std::path::{Path, PathBuf};

use crate::types::{FormulaDescriptor, FormulaError, RawFormula, Result};

/// Directory, relative to a search root, that holds formula files.
pub const FORMULA_DIR: &str = "Formula";

/// Parse and validate a formula from a TOML string.
pub fn parse_toml(content: &str) -> Result<FormulaDescriptor> {
    let raw: RawFormula = toml::from_str(content).map_err(|e| FormulaError::Parse(e.to_string()))?;
    FormulaDescriptor::from_raw(raw)
}

/// Parse and validate a formula from a JSON string.
pub fn parse_json(content: &str) -> Result<FormulaDescriptor> {
    let raw: RawFormula =
        serde_json::from_str(content).map_err(|e| FormulaError::Parse(e.to_string()))?;
    FormulaDescriptor::from_raw(raw)
}

/// Load a formula from a file path (auto-detect TOML vs JSON by extension).
///
/// Syntax errors are reported as [`FormulaError::Parse`]; a file that parses
/// but fails validation is [`FormulaError::Malformed`].
pub fn load_formula(path: &Path) -> Result<FormulaDescriptor> {
    let content = std::fs::read_to_string(path)?;
    let formula = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => parse_toml(&content)?,
        Some("json") => parse_json(&content)?,
        _ => match parse_json(&content) {
            Err(FormulaError::Parse(_)) => parse_toml(&content)?,
            other => other?,
        },
    };
    Ok(formula.with_source(path.display().to_string()))
}

/// Search for a formula by name.
///
/// Search order:
/// 1. Exact path (absolute, or relative to `cwd`)
/// 2. `cwd` with `.toml` / `.json`
/// 3. `cwd/Formula/` with `.toml` / `.json`
/// 4. Each directory in `search_dirs`, in order
pub fn find_formula(name: &str, cwd: &Path, search_dirs: &[PathBuf]) -> Result<PathBuf> {
    let exact = Path::new(name);
    if exact.is_absolute() {
        if exact.is_file() {
            return Ok(exact.to_path_buf());
        }
        return Err(FormulaError::NotFound(name.to_string()));
    }
    let relative = cwd.join(name);
    if relative.is_file() {
        return Ok(relative);
    }

    let mut roots = vec![cwd.to_path_buf(), cwd.join(FORMULA_DIR)];
    roots.extend(search_dirs.iter().cloned());

    for root in roots.iter().filter(|r| r.is_dir()) {
        for ext in ["toml", "json"] {
            let candidate = root.join(format!("{name}.{ext}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(FormulaError::NotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DependencyStage;
    use pretty_assertions::assert_eq;

    const TOML: &str = r#"
name = "tool"
description = "A tool"
homepage = "https://example.com/tool"
url = "https://example.com/tool-1.0.tar.gz"
sha256 = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
license = "MIT"

[[depends_on]]
name = "rust"
provides = ["cargo", "rustc"]

[[depends_on]]
name = "git"
stage = "run"

[[install]]
program = "cargo"
args = ["install", "--root", "{{prefix}}", "--path", "."]

[[test]]
program = "tool"
args = ["--version"]
"#;

    #[test]
    fn parse_toml_full() {
        let f = parse_toml(TOML).unwrap();
        assert_eq!(f.name(), "tool");
        assert_eq!(f.license(), "MIT");
        assert_eq!(f.build_dependencies().len(), 2);
        assert_eq!(f.build_dependencies()[0].stage, DependencyStage::Build);
        assert_eq!(f.build_dependencies()[0].executables(), vec!["cargo", "rustc"]);
        assert_eq!(f.build_dependencies()[1].stage, DependencyStage::Run);
        assert_eq!(f.build_dependencies()[1].executables(), vec!["git"]);
        assert_eq!(f.install_procedure()[0].program, "cargo");
        assert_eq!(f.test_procedure()[0].to_string(), "tool --version");
    }

    #[test]
    fn parse_json_minimal() {
        let json = r#"{
            "name": "tool",
            "homepage": "https://example.com",
            "url": "file:///tmp/tool-0.3.tar.gz",
            "sha256": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
            "install": [{"program": "make"}],
            "test": [{"program": "tool", "args": ["--version"]}]
        }"#;
        let f = parse_json(json).unwrap();
        assert_eq!(f.version(), "0.3");
        assert!(f.build_dependencies().is_empty());
        assert!(f.install_procedure()[0].args.is_empty());
    }

    #[test]
    fn parse_error_is_not_malformed() {
        let err = parse_toml("name = ").unwrap_err();
        assert!(matches!(err, FormulaError::Parse(_)), "{err:?}");
    }

    #[test]
    fn missing_procedures_are_malformed() {
        let toml = r#"
name = "tool"
homepage = "https://example.com"
url = "https://example.com/tool-1.0.tar.gz"
sha256 = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
"#;
        let err = parse_toml(toml).unwrap_err();
        assert!(matches!(err, FormulaError::Malformed(ref p) if p.len() == 2), "{err:?}");
    }

    #[test]
    fn load_formula_sets_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.toml");
        std::fs::write(&path, TOML).unwrap();
        let f = load_formula(&path).unwrap();
        assert_eq!(f.source(), path.display().to_string());
    }

    #[test]
    fn load_formula_without_extension_falls_back_to_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool");
        std::fs::write(&path, TOML).unwrap();
        assert_eq!(load_formula(&path).unwrap().name(), "tool");
    }

    #[test]
    fn find_formula_search_order() {
        let dir = tempfile::tempdir().unwrap();
        let extra = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(FORMULA_DIR)).unwrap();
        std::fs::write(dir.path().join(FORMULA_DIR).join("a.toml"), TOML).unwrap();
        std::fs::write(extra.path().join("b.json"), "{}").unwrap();

        let search = vec![extra.path().to_path_buf()];
        assert_eq!(
            find_formula("a", dir.path(), &search).unwrap(),
            dir.path().join(FORMULA_DIR).join("a.toml")
        );
        assert_eq!(
            find_formula("b", dir.path(), &search).unwrap(),
            extra.path().join("b.json")
        );
        assert!(matches!(
            find_formula("missing", dir.path(), &search),
            Err(FormulaError::NotFound(_))
        ));
    }

    #[test]
    fn find_formula_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.formula");
        std::fs::write(&path, TOML).unwrap();
        let abs = path.display().to_string();
        assert_eq!(find_formula(&abs, Path::new("/"), &[]).unwrap(), path);
        assert_eq!(find_formula("custom.formula", dir.path(), &[]).unwrap(), path);
    }
}
