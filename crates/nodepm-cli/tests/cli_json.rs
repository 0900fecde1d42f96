//! Integration tests for `nodepm --json` output.
//!
//! Only commands that do not need a package manager binary on PATH are
//! exercised here.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn nodepm(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nodepm"))
        .arg("--json")
        .arg("--cwd")
        .arg(cwd)
        .args(args)
        .env_remove("npm_config_user_agent")
        .env_remove("NODEPM_LOG_FILE")
        .output()
        .expect("failed to run nodepm")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "invalid JSON ({e}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[test]
fn test_version_json() {
    let dir = tempdir().unwrap();
    let output = nodepm(dir.path(), &["version"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert!(!json["version"].as_str().unwrap().is_empty());
}

#[test]
fn test_detect_from_lockfile() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("pnpm-lock.yaml"), "lockfileVersion: '6.0'\n").unwrap();

    let json = stdout_json(&nodepm(dir.path(), &["detect"]));
    assert_eq!(json["backend"], "pnpm");
    assert_eq!(json["binary"], "pnpm");
    assert_eq!(json["capabilities"]["listInstalled"], true);
}

#[test]
fn test_detect_bun_capabilities() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bun.lockb"), "").unwrap();

    let json = stdout_json(&nodepm(dir.path(), &["detect"]));
    assert_eq!(json["backend"], "bun");
    assert_eq!(json["capabilities"]["listInstalled"], false);
    assert_eq!(json["capabilities"]["versionLookup"], false);
    assert_eq!(json["capabilities"]["errorParsing"], false);
}

#[test]
fn test_run_command_with_forced_backend() {
    let dir = tempdir().unwrap();
    let json = stdout_json(&nodepm(dir.path(), &["--pm", "yarn1", "run-command", "test"]));
    assert_eq!(json["command"], "yarn test");
}

#[test]
fn test_config_file_selects_backend() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("nodepm.json"), r#"{"packageManager":"bun"}"#).unwrap();

    let json = stdout_json(&nodepm(dir.path(), &["run-command", "dev"]));
    assert_eq!(json["command"], "bun run dev");
}

#[test]
fn test_unknown_backend_error() {
    let dir = tempdir().unwrap();
    let output = nodepm(dir.path(), &["--pm", "cargo", "detect"]);
    assert!(!output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "PM_UNKNOWN_BACKEND");
}

#[test]
fn test_deps_merges_sections() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"dependencies":{"react":"^17.0.0"},"peerDependencies":{"react":">=16"},"devDependencies":{"vite":"^5.0.0"}}"#,
    )
    .unwrap();

    let json = stdout_json(&nodepm(dir.path(), &["--pm", "npm", "deps"]));
    assert_eq!(json["dependencies"]["react"], ">=16");
    assert_eq!(json["dependencies"]["vite"], "^5.0.0");
}

#[test]
fn test_deps_without_manifest() {
    let dir = tempdir().unwrap();
    let output = nodepm(dir.path(), &["--pm", "npm", "deps"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["error"]["code"], "PM_MANIFEST_NOT_FOUND");
}

#[test]
fn test_resolutions_written_for_pnpm() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("package.json");
    fs::write(&manifest, r#"{"name":"app","version":"1.0.0"}"#).unwrap();

    let output = nodepm(dir.path(), &["--pm", "pnpm", "resolutions", "react@18.2.0"]);
    assert!(output.status.success());

    let written: Value = serde_json::from_str(&fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(written["pnpm"]["overrides"]["react"], "18.2.0");
    assert_eq!(written["name"], "app");
}

#[test]
fn test_resolutions_require_version() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("package.json"), "{}").unwrap();

    let output = nodepm(dir.path(), &["--pm", "npm", "resolutions", "react"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["error"]["code"], "PM_SPEC_INVALID");
}

#[test]
fn test_manifest_lookup() {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("node_modules").join("left-pad");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(pkg.join("package.json"), r#"{"name":"left-pad","version":"1.0.0"}"#).unwrap();

    let json = stdout_json(&nodepm(dir.path(), &["--pm", "npm", "manifest", "left-pad"]));
    assert_eq!(json["manifest"]["version"], "1.0.0");

    let json = stdout_json(&nodepm(
        dir.path(),
        &["--pm", "npm", "manifest", "nonexistent-pkg-xyz"],
    ));
    assert_eq!(json["ok"], true);
    assert!(json["manifest"].is_null());
}

#[test]
fn test_bun_queries_are_neutral() {
    let dir = tempdir().unwrap();

    let json = stdout_json(&nodepm(dir.path(), &["--pm", "bun", "versions", "react"]));
    assert_eq!(json["versions"], "");

    let json = stdout_json(&nodepm(dir.path(), &["--pm", "bun", "versions", "react", "--all"]));
    assert_eq!(json["versions"], serde_json::json!([]));

    let json = stdout_json(&nodepm(dir.path(), &["--pm", "bun", "find", "react"]));
    assert!(json["installations"].is_null());
}

#[test]
fn test_add_rejects_invalid_spec() {
    let dir = tempdir().unwrap();
    let output = nodepm(dir.path(), &["--pm", "npm", "add", "@scope-only"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["error"]["code"], "PM_SPEC_INVALID");
}
