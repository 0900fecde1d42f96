//! pnpm dialect.
//!
//! `pnpm list --json` prints an array with one entry per workspace project;
//! each entry splits its tree into `dependencies`, `devDependencies` and
//! `optionalDependencies`. Version queries reuse npm's `info` format.

use super::tree_from_nested_objects;
use crate::pm::metadata::DependencyTree;
use crate::pm::signatures::ErrorSignature;
use serde_json::Value;
use std::path::Path;

pub(super) const BIN: &str = "pnpm";
pub(super) const INFO_COMMAND: &str = "pnpm list --depth=1";
pub(super) const DEDUPE_COMMAND: &str = "pnpm dedupe";

const WORKSPACE_FILE: &str = "pnpm-workspace.yaml";
const ERROR_PATTERN: &str = r"(?i)(ELIFECYCLE|ERR_PNPM_[A-Z0-9_]+)\s+(.*)";

const PROJECT_SECTIONS: [&str; 3] = ["dependencies", "devDependencies", "optionalDependencies"];

pub(super) fn init_args() -> Vec<String> {
    vec!["init".to_string()]
}

pub(super) fn run_command(script: &str) -> String {
    format!("pnpm run {script}")
}

/// pnpm refuses to touch the root of a workspace without `-w`.
fn workspace_root_flag(cwd: &Path) -> Option<String> {
    cwd.join(WORKSPACE_FILE)
        .exists()
        .then(|| "-w".to_string())
}

pub(super) fn add_args(dependencies: &[String], as_dev: bool, cwd: &Path) -> Vec<String> {
    let mut out = vec!["add".to_string()];
    if as_dev {
        out.push("-D".to_string());
    }
    out.extend(workspace_root_flag(cwd));
    out.extend(dependencies.iter().cloned());
    out
}

pub(super) fn remove_args(dependencies: &[String], cwd: &Path) -> Vec<String> {
    let mut out = vec!["remove".to_string()];
    out.extend(workspace_root_flag(cwd));
    out.extend(dependencies.iter().cloned());
    out
}

pub(super) fn list_args(patterns: &[String]) -> Vec<String> {
    let mut out = vec!["list".to_string()];
    out.extend(patterns.iter().cloned());
    out.push("--json".to_string());
    out.push("--depth=99".to_string());
    out
}

pub(super) fn parse_tree(raw: &str) -> Result<DependencyTree, String> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| format!("invalid JSON output: {e}"))?;

    let Some(projects) = value.as_array() else {
        return Err("expected a JSON array of projects".to_string());
    };

    let sections = projects.iter().flat_map(|project| {
        PROJECT_SECTIONS
            .iter()
            .filter_map(move |key| project.get(*key).and_then(Value::as_object))
    });

    Ok(tree_from_nested_objects(sections, "path"))
}

pub(super) fn error_signature() -> ErrorSignature {
    ErrorSignature::new("PNPM error", ERROR_PATTERN, 1)
}
