//! Yarn berry (2.x+) dialect.
//!
//! `yarn info --name-only --recursive` prints a flat list of locators, one
//! per line (`"react@npm:18.2.0"`, sometimes behind tree-drawing glyphs).
//! There is no parent/child information, so every locator becomes a root.

use super::{VersionLookup, VersionQuery};
use crate::pm::identity::split_name_version;
use crate::pm::metadata::DependencyTree;
use crate::pm::signatures::ErrorSignature;
use serde_json::Value;

const ERROR_PATTERN: &str = r"(YN\d{4}):.*?Error:\s+(.*)";

const ERROR_CODES: &[(&str, &str)] = &[
    ("YN0001", "An unexpected exception was thrown."),
    ("YN0002", "A package is missing a peer dependency."),
    ("YN0009", "A package build script failed."),
    ("YN0018", "A package checksum does not match the cache."),
    ("YN0028", "The lockfile would have been modified but is frozen."),
    ("YN0060", "A peer dependency is provided at an incompatible version."),
];

pub(super) fn init_args() -> Vec<String> {
    vec!["init".to_string()]
}

pub(super) fn add_args(dependencies: &[String], as_dev: bool) -> Vec<String> {
    let mut out = vec!["add".to_string()];
    if as_dev {
        out.push("-D".to_string());
    }
    out.extend(dependencies.iter().cloned());
    out
}

pub(super) fn remove_args(dependencies: &[String]) -> Vec<String> {
    let mut out = vec!["remove".to_string()];
    out.extend(dependencies.iter().cloned());
    out
}

pub(super) fn versions_args(name: &str, query: VersionQuery) -> Vec<String> {
    let field = match query {
        VersionQuery::Latest => "version",
        VersionQuery::All => "versions",
    };
    vec![
        "npm".to_string(),
        "info".to_string(),
        name.to_string(),
        "--fields".to_string(),
        field.to_string(),
        "--json".to_string(),
    ]
}

pub(super) fn parse_versions(raw: &str, query: VersionQuery) -> Result<VersionLookup, String> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| format!("invalid JSON output: {e}"))?;

    match query {
        VersionQuery::Latest => value
            .get("version")
            .and_then(Value::as_str)
            .map(|v| VersionLookup::Latest(v.to_string()))
            .ok_or_else(|| "missing 'version' field".to_string()),
        VersionQuery::All => value
            .get("versions")
            .and_then(Value::as_array)
            .map(|items| {
                VersionLookup::All(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                )
            })
            .ok_or_else(|| "missing 'versions' field".to_string()),
    }
}

pub(super) fn list_args(patterns: &[String]) -> Vec<String> {
    let mut out = vec![
        "info".to_string(),
        "--name-only".to_string(),
        "--recursive".to_string(),
    ];
    out.extend(patterns.iter().cloned());
    out
}

/// Split a locator into name and version, dropping the `npm:` protocol.
fn parse_locator(line: &str) -> Option<(&str, &str)> {
    let locator = line
        .trim()
        .trim_start_matches(|c: char| !(c == '"' || c == '@' || c.is_ascii_alphanumeric()))
        .trim_matches('"');

    let (name, version) = match locator.split_once("@npm:") {
        Some((name, version)) if !name.is_empty() => (name, version),
        _ => {
            let (name, version) = split_name_version(locator);
            (name, version?)
        }
    };

    (!name.is_empty() && !version.is_empty()).then_some((name, version))
}

/// Lines that are not locators are skipped. A failed run that printed no
/// locator at all (usage error, not a project) is an error.
pub(super) fn parse_tree(raw: &str, succeeded: bool) -> Result<DependencyTree, String> {
    let mut tree = DependencyTree::new();
    for (name, version) in raw.lines().filter_map(parse_locator) {
        tree.add(None, name, None, version, "");
    }

    if tree.is_empty() && !succeeded {
        let first = raw.lines().map(str::trim).find(|l| !l.is_empty());
        return Err(first.unwrap_or("yarn info failed").to_string());
    }
    Ok(tree)
}

pub(super) fn error_signature() -> ErrorSignature {
    ErrorSignature::new("YARN2 error", ERROR_PATTERN, 1).with_codes(ERROR_CODES)
}
