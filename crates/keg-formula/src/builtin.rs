//! The formula shipped with this repository.

use crate::parser::parse_toml;
use crate::types::{FormulaDescriptor, Result};

/// Name of the embedded formula.
pub const GIT_ACTION: &str = "git-action";

/// Source of `Formula/git-action.toml`, embedded at compile time.
pub const GIT_ACTION_TOML: &str = include_str!("../../../Formula/git-action.toml");

/// Load the embedded `git-action` formula.
pub fn git_action() -> Result<FormulaDescriptor> {
    Ok(parse_toml(GIT_ACTION_TOML)?.with_source(format!("builtin:{GIT_ACTION}")))
}

/// Look up an embedded formula by name.
pub fn find(name: &str) -> Option<Result<FormulaDescriptor>> {
    (name == GIT_ACTION).then(git_action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DependencyStage;
    use crate::validation::lint;
    use pretty_assertions::assert_eq;

    #[test]
    fn git_action_formula_loads() {
        let f = git_action().unwrap();
        assert_eq!(f.name(), "git-action");
        assert_eq!(f.description(), "Git-Action");
        assert_eq!(f.homepage().as_str(), "https://github.com/uname-n/git-action");
        assert_eq!(
            f.source_url().as_str(),
            "https://github.com/uname-n/git-action/archive/refs/tags/0.0.1.tar.gz"
        );
        assert_eq!(f.license(), "MIT");
        assert_eq!(f.version(), "0.0.1");
        assert_eq!(f.source(), "builtin:git-action");
    }

    #[test]
    fn git_action_needs_cargo_to_build() {
        let f = git_action().unwrap();
        let deps: Vec<_> = f.dependencies_for(DependencyStage::Build).collect();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "rust");
        assert_eq!(deps[0].executables(), vec!["cargo"]);
        assert_eq!(
            f.install_procedure()[0].to_string(),
            "cargo install --locked --root {{prefix}} --path ."
        );
        assert_eq!(f.test_procedure()[0].to_string(), "git-action --version");
    }

    #[test]
    fn git_action_checksum_is_placeholder() {
        let f = git_action().unwrap();
        let codes: Vec<_> = lint(&f).iter().map(|w| w.code).collect();
        assert_eq!(codes, vec!["placeholder-checksum"]);
    }

    #[test]
    fn find_by_name() {
        assert!(find("git-action").is_some());
        assert!(find("other").is_none());
    }
}
