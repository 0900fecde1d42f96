//! Yarn classic (1.x) dialect.
//!
//! `--json` makes yarn 1 print newline-delimited JSON events. The payload we
//! want is the event whose `type` is `tree` (listing) or `inspect` (info);
//! `warning`/`info` events around it are ignored and an `error` event becomes
//! the failure reason.

use super::{VersionLookup, VersionQuery};
use crate::pm::identity::split_name_version;
use crate::pm::metadata::{DependencyTree, NodeId};
use crate::pm::signatures::ErrorSignature;
use serde_json::Value;

/// Both yarn generations share the binary and the run/info conventions.
pub(super) const BIN: &str = "yarn";
pub(super) const INFO_COMMAND: &str = "yarn why";
pub(super) const DEDUPE_COMMAND: &str = "yarn dedupe";

const ERROR_PATTERN: &str = r"error\s(.*)";

pub(super) fn init_args() -> Vec<String> {
    vec!["init".to_string(), "-y".to_string()]
}

pub(super) fn run_command(script: &str) -> String {
    format!("yarn {script}")
}

pub(super) fn add_args(dependencies: &[String], as_dev: bool) -> Vec<String> {
    let mut out = vec![
        "add".to_string(),
        "--ignore-workspace-root-check".to_string(),
    ];
    if as_dev {
        out.push("-D".to_string());
    }
    out.extend(dependencies.iter().cloned());
    out
}

pub(super) fn remove_args(dependencies: &[String]) -> Vec<String> {
    let mut out = vec![
        "remove".to_string(),
        "--ignore-workspace-root-check".to_string(),
    ];
    out.extend(dependencies.iter().cloned());
    out
}

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

/// Find the first event of `kind`, or the first `error` event's message.
fn find_event(raw: &str, kind: &str) -> Result<Value, String> {
    let mut saw_json = false;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        saw_json = true;

        match event.get("type").and_then(Value::as_str) {
            Some(t) if t == kind => return Ok(event),
            Some("error") => {
                let message = event
                    .get("data")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown yarn error");
                return Err(message.to_string());
            }
            _ => {}
        }
    }

    if saw_json {
        Err(format!("no '{kind}' event in output"))
    } else {
        Err("output is not JSON".to_string())
    }
}

pub(super) fn parse_versions(raw: &str, query: VersionQuery) -> Result<VersionLookup, String> {
    let event = find_event(raw, "inspect")?;
    let data = event.get("data").cloned().unwrap_or(Value::Null);

    match (query, data) {
        (VersionQuery::Latest, Value::String(v)) => Ok(VersionLookup::Latest(v)),
        (VersionQuery::All, Value::Array(items)) => Ok(VersionLookup::All(
            items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )),
        (_, other) => Err(format!("unexpected output shape: {other}")),
    }
}

pub(super) fn list_args(patterns: &[String]) -> Vec<String> {
    vec![
        "list".to_string(),
        "--pattern".to_string(),
        patterns.join("|"),
        "--recursive".to_string(),
        "--json".to_string(),
    ]
}

/// Parse the `tree` event: `data.trees[]` of `{ name: "pkg@1.0.0", children: [...] }`.
pub(super) fn parse_tree(raw: &str) -> Result<DependencyTree, String> {
    let event = find_event(raw, "tree")?;
    let Some(trees) = event
        .get("data")
        .and_then(|d| d.get("trees"))
        .and_then(Value::as_array)
    else {
        return Err("tree event has no data.trees".to_string());
    };

    let mut tree = DependencyTree::new();
    let mut pending: Vec<(Option<NodeId>, &Vec<Value>)> = vec![(None, trees)];

    while let Some((parent, items)) = pending.pop() {
        let mut nested = Vec::new();

        for item in items {
            let Some(label) = item.get("name").and_then(Value::as_str) else {
                continue;
            };
            let (name, version) = split_name_version(label);
            let Some(version) = version.filter(|v| !v.is_empty()) else {
                continue;
            };

            let id = tree.add(parent, name, None, version, "");

            if let Some(children) = item.get("children").and_then(Value::as_array) {
                nested.push((Some(id), children));
            }
        }

        pending.extend(nested.into_iter().rev());
    }

    Ok(tree)
}

pub(super) fn error_signature() -> ErrorSignature {
    ErrorSignature::new("YARN1 error", ERROR_PATTERN, 1)
}
