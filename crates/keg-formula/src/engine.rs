//! Placeholder substitution for command specs.
//!
//! Commands reference `{{prefix}}`, `{{bin}}`, `{{name}}`, `{{version}}` and
//! `{{source}}`. Unknown placeholders are left as-is.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::types::{CommandSpec, FormulaDescriptor, ResolvedCommand};

/// Placeholders a session can fill in.
pub const KNOWN_VARIABLES: &[&str] = &["bin", "name", "prefix", "source", "version"];

/// Substitute `{{variable}}` patterns in a string with provided values.
/// Unresolved variables are left as-is.
pub fn substitute_vars(text: &str, vars: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let (before, after) = rest.split_at(open);
        result.push_str(before);
        match placeholder_at(after) {
            Some((name, len)) => {
                match vars.get(name) {
                    Some(val) => result.push_str(val),
                    None => result.push_str(&after[..len]),
                }
                rest = &after[len..];
            }
            None => {
                result.push_str("{{");
                rest = &after[2..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Collect every placeholder name referenced by a formula's commands.
pub fn extract_variables(formula: &FormulaDescriptor) -> Vec<String> {
    let mut names = BTreeSet::new();
    let commands = formula
        .install_procedure()
        .iter()
        .chain(formula.test_procedure());
    for cmd in commands {
        scan_vars(&cmd.program, &mut names);
        for arg in &cmd.args {
            scan_vars(arg, &mut names);
        }
        for val in cmd.env.values() {
            scan_vars(val, &mut names);
        }
        if let Some(ref cwd) = cmd.cwd {
            scan_vars(cwd, &mut names);
        }
    }
    names.into_iter().collect()
}

/// Build the placeholder map for a session.
///
/// `source` is the extracted source root; it is absent while testing an
/// existing install.
pub fn session_vars(
    formula: &FormulaDescriptor,
    prefix: &Path,
    source: Option<&Path>,
) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("name".to_string(), formula.name().to_string());
    vars.insert("version".to_string(), formula.version().to_string());
    vars.insert("prefix".to_string(), prefix.display().to_string());
    vars.insert("bin".to_string(), prefix.join("bin").display().to_string());
    if let Some(source) = source {
        vars.insert("source".to_string(), source.display().to_string());
    }
    vars
}

impl CommandSpec {
    /// Resolve every placeholder in this command.
    pub fn render(&self, vars: &HashMap<String, String>) -> ResolvedCommand {
        ResolvedCommand {
            program: substitute_vars(&self.program, vars),
            args: self.args.iter().map(|a| substitute_vars(a, vars)).collect(),
            env: self
                .env
                .iter()
                .map(|(k, v)| (k.clone(), substitute_vars(v, vars)))
                .collect(),
            cwd: self.cwd.as_ref().map(|c| substitute_vars(c, vars)),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn is_var_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_var_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// If `text` starts with `{{name}}`, return the name and the total length.
fn placeholder_at(text: &str) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if !text.starts_with("{{") || bytes.len() < 5 || !is_var_start(bytes[2]) {
        return None;
    }
    let mut end = 3;
    while end < bytes.len() && is_var_cont(bytes[end]) {
        end += 1;
    }
    if text[end..].starts_with("}}") {
        Some((&text[2..end], end + 2))
    } else {
        None
    }
}

fn scan_vars(text: &str, names: &mut BTreeSet<String>) {
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open..];
        match placeholder_at(after) {
            Some((name, len)) => {
                names.insert(name.to_string());
                rest = &after[len..];
            }
            None => rest = &after[2..],
        }
    }
}
