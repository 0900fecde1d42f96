//! Bun dialect.
//!
//! Two capabilities are not implemented for bun yet:
//! - version lookup: bun has no `info` command; callers get the neutral
//!   result (`""` or an empty list).
//! - installed package listing: `bun pm ls` only prints yarn-1-style text,
//!   no JSON, so introspection reports `None`.
//!
//! There is no built-in failure signature either; one can be supplied through
//! the `errorSignatures.bun` entry of the config file.

use super::{Support, VersionQuery};

pub(super) const BIN: &str = "bun";
pub(super) const INFO_COMMAND: &str = "bun pm ls";
pub(super) const DEDUPE_COMMAND: &str = "bun install";

pub(super) fn init_args() -> Vec<String> {
    vec!["init".to_string()]
}

pub(super) fn run_command(script: &str) -> String {
    format!("bun run {script}")
}

pub(super) fn add_args(dependencies: &[String], as_dev: bool) -> Vec<String> {
    let mut out = vec!["add".to_string()];
    if as_dev {
        out.push("--dev".to_string());
    }
    out.extend(dependencies.iter().cloned());
    out
}

pub(super) fn remove_args(dependencies: &[String]) -> Vec<String> {
    let mut out = vec!["remove".to_string()];
    out.extend(dependencies.iter().cloned());
    out
}

pub(super) fn versions_args(_name: &str, _query: VersionQuery) -> Support<Vec<String>> {
    Support::NotYetSupported
}

pub(super) fn list_args(_patterns: &[String]) -> Support<Vec<String>> {
    Support::NotYetSupported
}
