//! End-to-end CLI integration tests for the `keg` binary.
//!
//! Each test gets its own `KEG_HOME` and builds its source archive in a temp
//! directory, served through a `file://` URL. `/bin/sh` plays the toolchain.

#![cfg(unix)]

use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const BUILD_SH: &[u8] = b"#!/bin/sh\nset -e\ncp tool.in tool\nchmod 755 tool\n";
const INSTALL_SH: &[u8] = b"#!/bin/sh\nset -e\nprefix=\"${1#--prefix=}\"\nmkdir -p \"$prefix/bin\"\ncp tool \"$prefix/bin/tool\"\n";
const GOOD_TOOL: &[u8] = b"#!/bin/sh\necho \"tool 1.0\"\n";
const BAD_TOOL: &[u8] = b"#!/bin/sh\necho broken >&2\nexit 3\n";

/// An isolated keg home plus a scratch directory for archives and formulas.
struct Sandbox {
    home: TempDir,
    scratch: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            scratch: TempDir::new().unwrap(),
        }
    }

    /// A `keg` command with this sandbox's home and no ambient config.
    fn keg(&self) -> Command {
        let mut cmd = Command::cargo_bin("keg").unwrap();
        cmd.env("KEG_HOME", self.home.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("KEG_CONFIG")
            .current_dir(self.scratch.path());
        cmd
    }

    fn path(&self, name: &str) -> PathBuf {
        self.scratch.path().join(name)
    }

    /// Write `tool-1.0.tar.gz` whose built tool runs `tool_script`; returns its digest.
    fn write_archive(&self, tool_script: &[u8]) -> String {
        let data = tarball(&[
            ("tool-1.0/build.sh", BUILD_SH),
            ("tool-1.0/install.sh", INSTALL_SH),
            ("tool-1.0/tool.in", tool_script),
        ]);
        std::fs::write(self.path("tool-1.0.tar.gz"), &data).unwrap();
        format!("{:x}", Sha256::digest(&data))
    }

    /// Write `tool.toml` pointing at the local archive.
    fn write_formula(&self, sha256: &str, extra_install: &str) -> PathBuf {
        let toml = format!(
            r#"name = "tool"
description = "Test tool"
homepage = "https://example.com/tool"
url = "file://{archive}"
sha256 = "{sha256}"
license = "MIT"

[[depends_on]]
name = "shell"
provides = ["sh"]

[[install]]
program = "sh"
args = ["build.sh"]

[[install]]
program = "sh"
args = ["install.sh", "--prefix={{{{prefix}}}}"]
{extra_install}
[[test]]
program = "tool"
args = ["--version"]
"#,
            archive = self.path("tool-1.0.tar.gz").display()
        );
        let path = self.path("tool.toml");
        std::fs::write(&path, toml).unwrap();
        path
    }
}

fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for &(path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_path(path).unwrap();
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }
    let tar_data = builder.into_inner().unwrap();
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&tar_data).unwrap();
    encoder.finish().unwrap()
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn assert_no_work_dirs(dir: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("keg-"))
        .collect();
    assert!(leftovers.is_empty(), "work dirs left behind: {leftovers:?}");
}

// ---------------------------------------------------------------------------
// install / test
// ---------------------------------------------------------------------------

#[test]
fn install_runs_full_lifecycle() {
    let sb = Sandbox::new();
    let digest = sb.write_archive(GOOD_TOOL);
    let formula = sb.write_formula(&digest, "");
    let prefix = sb.path("prefix");

    sb.keg()
        .arg("install")
        .arg(&formula)
        .arg("--prefix")
        .arg(&prefix)
        .assert()
        .success()
        .stdout(predicate::str::contains("tool 1.0 installed to"))
        .stderr(predicate::str::contains("==> [fetching] file://"))
        .stderr(predicate::str::contains("==> [verifying] sha256"))
        .stderr(predicate::str::contains("==> [testing] tool 1.0"))
        .stderr(predicate::str::contains("==> [succeeded] tool 1.0"));

    assert!(prefix.join("bin/tool").is_file());
}

#[test]
fn install_defaults_to_cellar_and_test_reuses_it() {
    let sb = Sandbox::new();
    let digest = sb.write_archive(GOOD_TOOL);
    sb.write_formula(&digest, "");

    sb.keg().args(["install", "tool", "-q"]).assert().success();
    assert!(sb.home.path().join("Cellar/tool/1.0/bin/tool").is_file());

    sb.keg()
        .args(["test", "tool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tool 1.0 passed its test"));
}

#[test]
fn checksum_mismatch_stops_before_build() {
    let sb = Sandbox::new();
    sb.write_archive(GOOD_TOOL);
    let marker = sb.path("built.marker");
    let extra = format!(
        "[[install]]\nprogram = \"touch\"\nargs = [\"{}\"]\n",
        marker.display()
    );
    let wrong = "a".repeat(64);
    let formula = sb.write_formula(&wrong, &extra);
    let work_root = sb.path("work");
    std::fs::create_dir(&work_root).unwrap();

    sb.keg()
        .env("KEG_WORK_ROOT", &work_root)
        .arg("install")
        .arg(&formula)
        .arg("--prefix")
        .arg(sb.path("prefix"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("checksum mismatch"))
        .stderr(predicate::str::contains("==> [building]").not());

    assert!(!marker.exists());
    assert_no_work_dirs(&work_root);
}

#[test]
fn failing_smoke_test_reports_exit_code_as_json() {
    let sb = Sandbox::new();
    let digest = sb.write_archive(BAD_TOOL);
    let formula = sb.write_formula(&digest, "");
    let work_root = sb.path("work");

    let output = sb
        .keg()
        .env("KEG_WORK_ROOT", &work_root)
        .arg("install")
        .arg(&formula)
        .arg("--prefix")
        .arg(sb.path("prefix"))
        .arg("--json")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report = json_stdout(&output);
    assert_eq!(report["state"]["state"], "failed");
    assert_eq!(report["state"]["reason"]["kind"], "test");
    assert_eq!(report["state"]["reason"]["exit_code"], 3);
    assert_eq!(report["state"]["reason"]["stderr"], "broken\n");
    assert_no_work_dirs(&work_root);
}

#[test]
fn missing_archive_is_fetch_error() {
    let sb = Sandbox::new();
    let formula = sb.write_formula(&"b".repeat(64), "");

    sb.keg()
        .arg("install")
        .arg(&formula)
        .arg("--prefix")
        .arg(sb.path("prefix"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("==> [failed] fetch failed"));
}

#[test]
fn short_checksum_is_malformed() {
    let sb = Sandbox::new();
    sb.write_archive(GOOD_TOOL);
    let formula = sb.write_formula("abc123", "");

    sb.keg()
        .arg("install")
        .arg(&formula)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("malformed descriptor"))
        .stderr(predicate::str::contains("==> [fetching]").not());
}

#[test]
fn test_without_install_fails() {
    let sb = Sandbox::new();
    let digest = sb.write_archive(GOOD_TOOL);
    sb.write_formula(&digest, "");

    sb.keg()
        .args(["test", "tool"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("install prefix does not exist"));
}

// ---------------------------------------------------------------------------
// info / lint / checksum
// ---------------------------------------------------------------------------

#[test]
fn info_json_for_builtin_formula() {
    let sb = Sandbox::new();
    let output = sb.keg().args(["info", "--json"]).output().unwrap();
    assert!(output.status.success());

    let info = json_stdout(&output);
    assert_eq!(info["name"], "git-action");
    assert_eq!(info["description"], "Git-Action");
    assert_eq!(info["license"], "MIT");
    assert_eq!(info["version"], "0.0.1");
    assert_eq!(info["checksum"], "0".repeat(64));
    assert_eq!(info["build_dependencies"][0]["name"], "rust");
}

#[test]
fn lint_flags_placeholder_checksum() {
    let sb = Sandbox::new();
    sb.keg()
        .arg("lint")
        .assert()
        .success()
        .stdout(predicate::str::contains("placeholder-checksum"));

    sb.keg().args(["lint", "--strict"]).assert().code(1);
}

#[test]
fn lint_clean_formula() {
    let sb = Sandbox::new();
    let digest = sb.write_archive(GOOD_TOOL);
    sb.write_formula(&digest, "");

    sb.keg()
        .args(["lint", "tool", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no problems found"));
}

#[test]
fn checksum_of_local_file() {
    let sb = Sandbox::new();
    let digest = sb.write_archive(GOOD_TOOL);

    sb.keg()
        .args(["checksum", "tool-1.0.tar.gz"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!("{digest}  tool-1.0.tar.gz")));
}

// ---------------------------------------------------------------------------
// misc
// ---------------------------------------------------------------------------

#[test]
fn version_and_completion() {
    let sb = Sandbox::new();
    sb.keg()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("keg version "));
    sb.keg()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keg"));
}

#[test]
fn invalid_config_is_reported() {
    let sb = Sandbox::new();
    sb.keg()
        .env("KEG_HTTP__TIMEOUT_SECS", "0")
        .arg("version")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("http.timeout_secs"));
}

#[test]
fn unknown_formula_is_error() {
    let sb = Sandbox::new();
    sb.keg()
        .args(["info", "no-such-formula", "--json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"error\""));
}
