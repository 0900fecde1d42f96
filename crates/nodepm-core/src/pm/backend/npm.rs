//! npm dialect.
//!
//! `npm ls --json` prints one nested object rooted at the project; `npm info
//! --json` prints a bare JSON value, or an `{"error": {...}}` object.

use super::{tree_from_nested_objects, VersionLookup, VersionQuery};
use crate::pm::metadata::DependencyTree;
use crate::pm::signatures::ErrorSignature;
use serde_json::Value;

pub(super) const BIN: &str = "npm";
pub(super) const INFO_COMMAND: &str = "npm ls --depth=1";
pub(super) const DEDUPE_COMMAND: &str = "npm dedupe";

const ERROR_PATTERN: &str = r"npm ERR! code (\w+)";

const ERROR_CODES: &[(&str, &str)] = &[
    ("E401", "You need to authorize this machine using `npm adduser`."),
    ("E403", "Access to this package is forbidden. Check your registry credentials."),
    ("E404", "The package could not be found in the registry."),
    ("EACCES", "Permission denied while writing to the install location."),
    ("EAI_AGAIN", "DNS lookup failed. Check your network connection."),
    ("ECONNREFUSED", "The registry refused the connection."),
    ("ECONNRESET", "The connection to the registry was reset."),
    ("EINTEGRITY", "A downloaded tarball failed its integrity check. Try `npm cache verify`."),
    ("EJSONPARSE", "A package.json or lockfile could not be parsed."),
    ("ELIFECYCLE", "A lifecycle script of an installed package failed."),
    ("ENOENT", "A file or directory required for the install was not found."),
    ("ENOSPC", "There is no space left on the device."),
    ("ENOTFOUND", "The registry host could not be resolved."),
    ("ERESOLVE", "Unable to resolve the dependency tree. Check for conflicting peer dependencies."),
    ("ETARGET", "No version matching the requested range was found."),
    ("ETIMEDOUT", "The request to the registry timed out."),
];

pub(super) fn init_args() -> Vec<String> {
    vec!["init".to_string(), "-y".to_string()]
}

pub(super) fn run_command(script: &str) -> String {
    format!("npm run {script}")
}

pub(super) fn run_args(script: &str, args: &[String]) -> Vec<String> {
    let mut out = vec!["run".to_string(), script.to_string()];
    // npm only forwards arguments after `--` to the script
    if !args.is_empty() {
        out.push("--".to_string());
        out.extend(args.iter().cloned());
    }
    out
}

pub(super) fn add_args(dependencies: &[String], as_dev: bool) -> Vec<String> {
    let mut out = vec!["install".to_string()];
    if as_dev {
        out.push("-D".to_string());
    }
    out.extend(dependencies.iter().cloned());
    out
}

pub(super) fn remove_args(dependencies: &[String]) -> Vec<String> {
    let mut out = vec!["uninstall".to_string()];
    out.extend(dependencies.iter().cloned());
    out
}

/// Shared with pnpm, which mirrors npm's `info` command.
pub(super) fn versions_args(name: &str, query: VersionQuery) -> Vec<String> {
    let field = match query {
        VersionQuery::Latest => "version",
        VersionQuery::All => "versions",
    };
    vec![
        "info".to_string(),
        name.to_string(),
        field.to_string(),
        "--json".to_string(),
    ]
}

/// Shared with pnpm.
pub(super) fn parse_versions(raw: &str, query: VersionQuery) -> Result<VersionLookup, String> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| format!("invalid JSON output: {e}"))?;

    if let Some(error) = value.get("error") {
        let summary = error
            .get("summary")
            .and_then(Value::as_str)
            .or_else(|| error.get("code").and_then(Value::as_str))
            .unwrap_or("unknown registry error");
        return Err(summary.to_string());
    }

    match (query, value) {
        (VersionQuery::Latest, Value::String(v)) => Ok(VersionLookup::Latest(v)),
        // A package with a single published version yields a string here
        (VersionQuery::All, Value::String(v)) => Ok(VersionLookup::All(vec![v])),
        (VersionQuery::All, Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(v) => Ok(v),
                other => Err(format!("unexpected version entry: {other}")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(VersionLookup::All),
        (_, other) => Err(format!("unexpected output shape: {other}")),
    }
}

/// The whole tree is listed: `npm ls` treats positional arguments as exact
/// specs, so `@scope/*` would match nothing. Callers filter the parsed tree.
pub(super) fn list_args() -> Vec<String> {
    vec![
        "ls".to_string(),
        "--json".to_string(),
        "--depth=99".to_string(),
    ]
}

pub(super) fn parse_tree(raw: &str) -> Result<DependencyTree, String> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| format!("invalid JSON output: {e}"))?;

    // An empty project prints `{}` with no dependencies key at all
    let Some(root) = value.as_object() else {
        return Err("expected a JSON object".to_string());
    };

    Ok(match root.get("dependencies").and_then(Value::as_object) {
        Some(deps) => tree_from_nested_objects([deps], "resolved"),
        None => DependencyTree::new(),
    })
}

pub(super) fn error_signature() -> ErrorSignature {
    ErrorSignature::new("NPM error", ERROR_PATTERN, 1).with_codes(ERROR_CODES)
}
