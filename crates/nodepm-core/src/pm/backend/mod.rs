//! Package manager backends.
//!
//! One variant per supported tool. Each variant's CLI dialect (argument
//! shapes, output formats, failure signatures) lives in its own module; this
//! module only dispatches.

mod bun;
mod npm;
mod pnpm;
mod yarn1;
mod yarn2;

use super::error::PmError;
use super::exec::CommandOutput;
use super::manifest::PackageJson;
use super::metadata::{DependencyTree, NodeId};
use super::signatures::ErrorSignature;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// npm
    Npm,
    /// Yarn classic (1.x)
    Yarn1,
    /// Yarn berry (2.x and later)
    Yarn2,
    /// pnpm
    Pnpm,
    /// Bun's built-in package manager
    Bun,
}

/// Which version(s) a lookup should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionQuery {
    /// The version the registry tags as latest.
    Latest,
    /// Every published version.
    All,
}

/// Result of a version lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum VersionLookup {
    Latest(String),
    All(Vec<String>),
}

impl VersionLookup {
    /// The neutral result returned by backends without version lookup.
    #[must_use]
    pub fn neutral(query: VersionQuery) -> Self {
        match query {
            VersionQuery::Latest => Self::Latest(String::new()),
            VersionQuery::All => Self::All(Vec::new()),
        }
    }
}

/// Whether a backend implements an optional capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Support<T> {
    Available(T),
    /// The tool integration does not implement this yet.
    NotYetSupported,
}

/// Optional capabilities a backend may lack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub list_installed: bool,
    pub version_lookup: bool,
    pub error_parsing: bool,
}

impl Backend {
    /// Every backend, in detection priority order.
    pub const ALL: [Backend; 5] = [
        Backend::Npm,
        Backend::Yarn1,
        Backend::Yarn2,
        Backend::Pnpm,
        Backend::Bun,
    ];

    /// Stable identifier used in config files and on the command line.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn1 => "yarn1",
            Self::Yarn2 => "yarn2",
            Self::Pnpm => "pnpm",
            Self::Bun => "bun",
        }
    }

    /// Executable name.
    #[must_use]
    pub fn binary(self) -> &'static str {
        match self {
            Self::Npm => npm::BIN,
            Self::Yarn1 | Self::Yarn2 => yarn1::BIN,
            Self::Pnpm => pnpm::BIN,
            Self::Bun => bun::BIN,
        }
    }

    /// Check if the executable is on `PATH`.
    #[must_use]
    pub fn is_available(self) -> bool {
        which::which(self.binary()).is_ok()
    }

    /// Arguments for the project bootstrap command.
    #[must_use]
    pub fn init_args(self) -> Vec<String> {
        match self {
            Self::Npm => npm::init_args(),
            Self::Yarn1 => yarn1::init_args(),
            Self::Yarn2 => yarn2::init_args(),
            Self::Pnpm => pnpm::init_args(),
            Self::Bun => bun::init_args(),
        }
    }

    /// The command a user would type to run `script`.
    #[must_use]
    pub fn run_command(self, script: &str) -> String {
        match self {
            Self::Npm => npm::run_command(script),
            Self::Yarn1 | Self::Yarn2 => yarn1::run_command(script),
            Self::Pnpm => pnpm::run_command(script),
            Self::Bun => bun::run_command(script),
        }
    }

    /// Arguments for running a manifest script.
    #[must_use]
    pub fn run_args(self, script: &str, args: &[String]) -> Vec<String> {
        match self {
            Self::Npm => npm::run_args(script, args),
            Self::Yarn1 | Self::Yarn2 | Self::Pnpm | Self::Bun => {
                let mut out = vec!["run".to_string(), script.to_string()];
                out.extend(args.iter().cloned());
                out
            }
        }
    }

    /// Arguments for installing from the existing manifest/lockfile.
    #[must_use]
    pub fn install_args(self) -> Vec<String> {
        vec!["install".to_string()]
    }

    /// Arguments for adding dependencies.
    #[must_use]
    pub fn add_args(self, dependencies: &[String], as_dev: bool, cwd: &Path) -> Vec<String> {
        match self {
            Self::Npm => npm::add_args(dependencies, as_dev),
            Self::Yarn1 => yarn1::add_args(dependencies, as_dev),
            Self::Yarn2 => yarn2::add_args(dependencies, as_dev),
            Self::Pnpm => pnpm::add_args(dependencies, as_dev, cwd),
            Self::Bun => bun::add_args(dependencies, as_dev),
        }
    }

    /// Arguments for removing dependencies.
    #[must_use]
    pub fn remove_args(self, dependencies: &[String], cwd: &Path) -> Vec<String> {
        match self {
            Self::Npm => npm::remove_args(dependencies),
            Self::Yarn1 => yarn1::remove_args(dependencies),
            Self::Yarn2 => yarn2::remove_args(dependencies),
            Self::Pnpm => pnpm::remove_args(dependencies, cwd),
            Self::Bun => bun::remove_args(dependencies),
        }
    }

    /// Arguments for a registry version query.
    #[must_use]
    pub fn versions_args(self, name: &str, query: VersionQuery) -> Support<Vec<String>> {
        match self {
            Self::Npm | Self::Pnpm => Support::Available(npm::versions_args(name, query)),
            Self::Yarn1 => Support::Available(yarn1::versions_args(name, query)),
            Self::Yarn2 => Support::Available(yarn2::versions_args(name, query)),
            Self::Bun => bun::versions_args(name, query),
        }
    }

    /// Parse the output of the version query.
    ///
    /// # Errors
    /// Returns a human reason when the tool reported an error or the output
    /// has an unexpected shape.
    pub fn parse_versions(self, raw: &str, query: VersionQuery) -> Result<VersionLookup, String> {
        match self {
            Self::Npm | Self::Pnpm => npm::parse_versions(raw, query),
            Self::Yarn1 => yarn1::parse_versions(raw, query),
            Self::Yarn2 => yarn2::parse_versions(raw, query),
            Self::Bun => Ok(VersionLookup::neutral(query)),
        }
    }

    /// Arguments for listing installed packages matching `patterns`.
    #[must_use]
    pub fn list_args(self, patterns: &[String]) -> Support<Vec<String>> {
        match self {
            Self::Npm => Support::Available(npm::list_args()),
            Self::Yarn1 => Support::Available(yarn1::list_args(patterns)),
            Self::Yarn2 => Support::Available(yarn2::list_args(patterns)),
            Self::Pnpm => Support::Available(pnpm::list_args(patterns)),
            Self::Bun => bun::list_args(patterns),
        }
    }

    /// Translate the listing output into a dependency tree.
    ///
    /// npm and pnpm exit non-zero on extraneous or invalid installs but still
    /// print the tree, so only yarn berry looks at the exit code.
    ///
    /// # Errors
    /// Returns a human reason when the output cannot be parsed or the listing
    /// itself failed.
    pub fn parse_tree(self, output: &CommandOutput) -> Result<DependencyTree, String> {
        let raw = output.stdout.as_str();
        match self {
            Self::Npm => npm::parse_tree(raw),
            Self::Yarn1 => yarn1::parse_tree(raw),
            Self::Yarn2 => yarn2::parse_tree(raw, output.success()),
            Self::Pnpm => pnpm::parse_tree(raw),
            Self::Bun => Err("listing installed packages is not supported by bun yet".to_string()),
        }
    }

    /// Built-in failure signature, if the backend has one.
    #[must_use]
    pub fn default_error_signature(self) -> Option<ErrorSignature> {
        match self {
            Self::Npm => Some(npm::error_signature()),
            Self::Yarn1 => Some(yarn1::error_signature()),
            Self::Yarn2 => Some(yarn2::error_signature()),
            Self::Pnpm => Some(pnpm::error_signature()),
            Self::Bun => None,
        }
    }

    /// Command a user can run to see why a package is installed.
    #[must_use]
    pub fn info_command(self) -> &'static str {
        match self {
            Self::Npm => npm::INFO_COMMAND,
            Self::Yarn1 | Self::Yarn2 => yarn1::INFO_COMMAND,
            Self::Pnpm => pnpm::INFO_COMMAND,
            Self::Bun => bun::INFO_COMMAND,
        }
    }

    /// Command a user can run to deduplicate the tree.
    #[must_use]
    pub fn dedupe_command(self) -> &'static str {
        match self {
            Self::Npm => npm::DEDUPE_COMMAND,
            Self::Yarn1 | Self::Yarn2 => yarn1::DEDUPE_COMMAND,
            Self::Pnpm => pnpm::DEDUPE_COMMAND,
            Self::Bun => bun::DEDUPE_COMMAND,
        }
    }

    /// Which optional capabilities this backend implements.
    #[must_use]
    pub fn capabilities(self) -> Capabilities {
        Capabilities {
            list_installed: matches!(self.list_args(&[]), Support::Available(_)),
            version_lookup: matches!(
                self.versions_args("", VersionQuery::Latest),
                Support::Available(_)
            ),
            error_parsing: self.default_error_signature().is_some(),
        }
    }

    /// Build the manifest patch pinning `versions` through the tool's
    /// override mechanism.
    ///
    /// Existing overrides are kept; caller versions win for the same name.
    #[must_use]
    pub fn resolutions_patch(
        self,
        doc: &PackageJson,
        versions: &BTreeMap<String, String>,
    ) -> Map<String, Value> {
        let mut patch = Map::new();

        match self {
            Self::Npm | Self::Bun => {
                patch.insert(
                    "overrides".to_string(),
                    Value::Object(merge_pins(doc.section("overrides"), versions)),
                );
            }
            Self::Yarn1 | Self::Yarn2 => {
                patch.insert(
                    "resolutions".to_string(),
                    Value::Object(merge_pins(doc.section("resolutions"), versions)),
                );
            }
            Self::Pnpm => {
                let mut pnpm = doc.section("pnpm").cloned().unwrap_or_default();
                let existing = pnpm.get("overrides").and_then(Value::as_object);
                let merged = merge_pins(existing, versions);
                pnpm.insert("overrides".to_string(), Value::Object(merged));
                patch.insert("pnpm".to_string(), Value::Object(pnpm));
            }
        }

        patch
    }
}

fn merge_pins(
    existing: Option<&Map<String, Value>>,
    versions: &BTreeMap<String, String>,
) -> Map<String, Value> {
    let mut merged = existing.cloned().unwrap_or_default();
    for (name, version) in versions {
        merged.insert(name.clone(), Value::String(version.clone()));
    }
    merged
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Backend {
    type Err = PmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "yarn" | "yarn1" | "yarn-classic" => Ok(Self::Yarn1),
            "yarn2" | "berry" | "yarn-berry" => Ok(Self::Yarn2),
            "pnpm" => Ok(Self::Pnpm),
            "bun" => Ok(Self::Bun),
            _ => Err(PmError::UnknownBackend(s.to_string())),
        }
    }
}

/// Build a tree from npm-style nested objects:
/// `{ "<name>": { "version": "..", "<location_key>": "..", "dependencies": { .. } } }`.
///
/// Each top-level object in `sections` contributes roots, in order. Entries
/// without a string `version` (missing or invalid installs) are skipped along
/// with their subtree.
pub(crate) fn tree_from_nested_objects<'a>(
    sections: impl IntoIterator<Item = &'a Map<String, Value>>,
    location_key: &str,
) -> DependencyTree {
    let mut tree = DependencyTree::new();
    let mut pending: Vec<(Option<NodeId>, &Map<String, Value>)> =
        sections.into_iter().map(|s| (None, s)).collect();
    pending.reverse();

    while let Some((parent, entries)) = pending.pop() {
        let mut nested = Vec::new();

        for (name, info) in entries {
            let Some(version) = info.get("version").and_then(Value::as_str) else {
                continue;
            };
            let location = info
                .get(location_key)
                .and_then(Value::as_str)
                .unwrap_or_default();

            let id = tree.add(parent, name.as_str(), None, version, location);

            if let Some(children) = info.get("dependencies").and_then(Value::as_object) {
                nested.push((Some(id), children));
            }
        }

        pending.extend(nested.into_iter().rev());
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deps(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_from_str() {
        assert_eq!("npm".parse::<Backend>().unwrap(), Backend::Npm);
        assert_eq!("yarn".parse::<Backend>().unwrap(), Backend::Yarn1);
        assert_eq!("berry".parse::<Backend>().unwrap(), Backend::Yarn2);
        assert_eq!(" PNPM ".parse::<Backend>().unwrap(), Backend::Pnpm);
        assert!(matches!(
            "cargo".parse::<Backend>(),
            Err(PmError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_id_round_trip() {
        for backend in Backend::ALL {
            assert_eq!(backend.id().parse::<Backend>().unwrap(), backend);
            assert_eq!(backend.to_string(), backend.id());
        }
    }

    #[test]
    fn test_serde_ids() {
        assert_eq!(serde_json::to_value(Backend::Yarn2).unwrap(), json!("yarn2"));
        let parsed: Backend = serde_json::from_value(json!("bun")).unwrap();
        assert_eq!(parsed, Backend::Bun);
    }

    #[test]
    fn test_run_command_deterministic_and_non_empty() {
        for backend in Backend::ALL {
            let a = backend.run_command("test");
            let b = backend.run_command("test");
            assert_eq!(a, b);
            assert!(a.ends_with("test"));
            assert!(a.starts_with(backend.binary()));
        }
        assert_eq!(Backend::Npm.run_command("test"), "npm run test");
        assert_eq!(Backend::Yarn1.run_command("test"), "yarn test");
        assert_eq!(Backend::Yarn2.run_command("test"), "yarn test");
        assert_eq!(Backend::Pnpm.run_command("test"), "pnpm run test");
        assert_eq!(Backend::Bun.run_command("test"), "bun run test");
    }

    #[test]
    fn test_run_args() {
        let args = deps(&["--watch"]);
        assert_eq!(
            Backend::Npm.run_args("test", &args),
            deps(&["run", "test", "--", "--watch"])
        );
        assert_eq!(Backend::Npm.run_args("build", &[]), deps(&["run", "build"]));
        assert_eq!(
            Backend::Pnpm.run_args("test", &args),
            deps(&["run", "test", "--watch"])
        );
    }

    #[test]
    fn test_dev_flag_conventions() {
        let cwd = Path::new("/nonexistent");
        let d = deps(&["vite"]);
        assert_eq!(Backend::Npm.add_args(&d, true, cwd), deps(&["install", "-D", "vite"]));
        assert_eq!(
            Backend::Yarn1.add_args(&d, true, cwd),
            deps(&["add", "--ignore-workspace-root-check", "-D", "vite"])
        );
        assert_eq!(Backend::Yarn2.add_args(&d, true, cwd), deps(&["add", "-D", "vite"]));
        assert_eq!(Backend::Pnpm.add_args(&d, true, cwd), deps(&["add", "-D", "vite"]));
        assert_eq!(Backend::Bun.add_args(&d, true, cwd), deps(&["add", "--dev", "vite"]));
        assert_eq!(Backend::Npm.add_args(&d, false, cwd), deps(&["install", "vite"]));
    }

    #[test]
    fn test_remove_args() {
        let cwd = Path::new("/nonexistent");
        let d = deps(&["left-pad"]);
        assert_eq!(Backend::Npm.remove_args(&d, cwd), deps(&["uninstall", "left-pad"]));
        assert_eq!(Backend::Yarn2.remove_args(&d, cwd), deps(&["remove", "left-pad"]));
        assert_eq!(Backend::Bun.remove_args(&d, cwd), deps(&["remove", "left-pad"]));
    }

    #[test]
    fn test_capabilities() {
        let npm = Backend::Npm.capabilities();
        assert!(npm.list_installed && npm.version_lookup && npm.error_parsing);

        let bun = Backend::Bun.capabilities();
        assert!(!bun.list_installed);
        assert!(!bun.version_lookup);
        assert!(!bun.error_parsing);
    }

    #[test]
    fn test_bun_versions_neutral() {
        assert_eq!(
            Backend::Bun.parse_versions("garbage", VersionQuery::Latest).unwrap(),
            VersionLookup::Latest(String::new())
        );
        assert_eq!(
            Backend::Bun.parse_versions("", VersionQuery::All).unwrap(),
            VersionLookup::All(Vec::new())
        );
    }

    #[test]
    fn test_parse_tree_yarn2_failed_listing() {
        let usage = CommandOutput {
            exit_code: Some(1),
            stdout: "Usage Error: The project in /tmp/x/package.json doesn't seem to have been installed\n"
                .to_string(),
            stderr: String::new(),
        };
        assert!(Backend::Yarn2.parse_tree(&usage).is_err());

        let partial = CommandOutput {
            exit_code: Some(1),
            stdout: "\"react@npm:18.2.0\"\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(Backend::Yarn2.parse_tree(&partial).unwrap().len(), 1);

        assert!(Backend::Yarn2.parse_tree(&CommandOutput::ok("")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tree_npm_ignores_exit_code() {
        let output = CommandOutput {
            exit_code: Some(1),
            stdout: r#"{"name":"app","dependencies":{"a":{"version":"1.0.0"}}}"#.to_string(),
            stderr: "npm ERR! extraneous: b@1.0.0".to_string(),
        };
        assert_eq!(Backend::Npm.parse_tree(&output).unwrap().len(), 1);
    }

    #[test]
    fn test_resolutions_caller_wins() {
        let doc = PackageJson::parse(
            r#"{"overrides":{"react":"17.0.0","lodash":"4.17.21"},"resolutions":{"a":"1"}}"#,
        )
        .unwrap();
        let mut versions = BTreeMap::new();
        versions.insert("react".to_string(), "18.2.0".to_string());

        let npm = Backend::Npm.resolutions_patch(&doc, &versions);
        assert_eq!(npm["overrides"]["react"], "18.2.0");
        assert_eq!(npm["overrides"]["lodash"], "4.17.21");
        assert!(!npm.contains_key("resolutions"));

        let yarn = Backend::Yarn1.resolutions_patch(&doc, &versions);
        assert_eq!(yarn["resolutions"]["react"], "18.2.0");
        assert_eq!(yarn["resolutions"]["a"], "1");
    }

    #[test]
    fn test_resolutions_pnpm_nested() {
        let doc = PackageJson::parse(
            r#"{"pnpm":{"onlyBuiltDependencies":["esbuild"],"overrides":{"a":"1"}}}"#,
        )
        .unwrap();
        let mut versions = BTreeMap::new();
        versions.insert("b".to_string(), "2".to_string());

        let patch = Backend::Pnpm.resolutions_patch(&doc, &versions);
        assert_eq!(patch["pnpm"]["overrides"], json!({ "a": "1", "b": "2" }));
        assert_eq!(patch["pnpm"]["onlyBuiltDependencies"], json!(["esbuild"]));
    }

    #[test]
    fn test_tree_from_nested_objects_order_and_skips() {
        let value = json!({
            "react": { "version": "17.0.0", "resolved": "r1" },
            "broken": { "missing": true, "dependencies": { "x": { "version": "1.0.0" } } },
            "widget": {
                "version": "1.0.0",
                "dependencies": {
                    "react": { "version": "16.8.0" },
                    "scheduler": { "version": "0.20.0" }
                }
            }
        });

        let tree = tree_from_nested_objects([value.as_object().unwrap()], "resolved");
        assert_eq!(tree.len(), 4);
        let roots: Vec<_> = tree
            .roots()
            .iter()
            .map(|id| tree.node(*id).unwrap().identity.name.as_str())
            .collect();
        assert_eq!(roots, vec!["react", "widget"]);
        assert_eq!(tree.node(tree.roots()[0]).unwrap().location, "r1");

        let widget = tree.node(tree.roots()[1]).unwrap();
        let children: Vec<_> = widget
            .children
            .iter()
            .map(|id| tree.node(*id).unwrap().resolved_version.as_str())
            .collect();
        assert_eq!(children, vec!["16.8.0", "0.20.0"]);
    }
}
