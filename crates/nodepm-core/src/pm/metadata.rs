//! Installed dependency introspection model.
//!
//! Every backend turns its tool's listing output into a [`DependencyTree`]
//! (an arena of nodes with ordered roots); [`collect_installations`] then
//! flattens the tree into the tool-agnostic [`InstallationMetadata`].

use super::error::PmError;
use super::identity::PackageIdentity;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Index of a node inside a [`DependencyTree`].
pub type NodeId = usize;

/// One resolved package occurrence within a dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Name plus the requested range, when the tool reports one.
    pub identity: PackageIdentity,
    /// Version the tool actually installed.
    pub resolved_version: String,
    /// Install path or resolution URL; empty when the tool does not report it.
    pub location: String,
    /// Child nodes, in the order the tool listed them.
    pub children: Vec<NodeId>,
}

/// Arena-backed dependency forest.
///
/// The same package name may appear many times at different versions; nodes
/// are never shared between parents, so the structure is acyclic.
#[derive(Debug, Clone, Default)]
pub struct DependencyTree {
    nodes: Vec<DependencyNode>,
    roots: Vec<NodeId>,
}

impl DependencyTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under `parent`, or as a root when `parent` is `None`.
    pub fn add(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        requested: Option<String>,
        resolved_version: impl Into<String>,
        location: impl Into<String>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DependencyNode {
            identity: PackageIdentity::new(name, requested),
            resolved_version: resolved_version.into(),
            location: location.into(),
            children: Vec::new(),
        });

        match parent {
            Some(parent) => self.nodes[parent].children.push(id),
            None => self.roots.push(id),
        }

        id
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    /// Root node ids in document order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Total number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A single installed version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub version: String,
    pub location: String,
}

/// Normalized result of a dependency introspection query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationMetadata {
    /// Matched packages with one entry per distinct version, in discovery order.
    pub dependencies: BTreeMap<String, Vec<PackageMetadata>>,
    /// Names found at two or more versions, with every version seen.
    pub duplicated_dependencies: BTreeMap<String, Vec<String>>,
    /// Command a user can run to see why a package is installed.
    pub info_command: String,
    /// Command a user can run to deduplicate the tree.
    pub dedupe_command: String,
}

impl InstallationMetadata {
    /// Whether any matched package is installed at more than one version.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.duplicated_dependencies.is_empty()
    }
}

/// Compiled glob-style name patterns.
///
/// `*` matches any substring; every other character is literal and the whole
/// name must match.
#[derive(Debug, Clone)]
pub struct NamePatterns {
    compiled: Vec<Regex>,
}

impl NamePatterns {
    /// Compile the given patterns.
    ///
    /// # Errors
    /// Returns `PmError::InvalidPattern` if a pattern cannot be compiled.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PmError> {
        let compiled = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                let body = p
                    .split('*')
                    .map(regex_lite::escape)
                    .collect::<Vec<_>>()
                    .join(".*");
                Regex::new(&format!("^{body}$")).map_err(|e| PmError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { compiled })
    }

    /// Whether `name` matches any pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        !name.is_empty() && self.compiled.iter().any(|re| re.is_match(name))
    }
}

/// Flatten a dependency tree into per-name version lists.
///
/// Traverses every node reachable from a root with an explicit stack, in
/// document (pre-)order. A `(name, version)` pair is recorded once no matter
/// how many branches reach it.
#[must_use]
pub fn collect_installations(
    tree: &DependencyTree,
    patterns: &NamePatterns,
    info_command: &str,
    dedupe_command: &str,
) -> InstallationMetadata {
    let mut result = InstallationMetadata {
        info_command: info_command.to_string(),
        dedupe_command: dedupe_command.to_string(),
        ..Default::default()
    };
    let mut versions_seen: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = tree.roots.iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = tree.node(id) else {
            continue;
        };

        stack.extend(node.children.iter().rev().copied());

        let name = node.identity.name.as_str();
        if !patterns.matches(name) {
            continue;
        }

        let seen = versions_seen.entry(name).or_default();
        if seen.contains(&node.resolved_version.as_str()) {
            continue;
        }
        seen.push(&node.resolved_version);

        result
            .dependencies
            .entry(name.to_string())
            .or_default()
            .push(PackageMetadata {
                version: node.resolved_version.clone(),
                location: node.location.clone(),
            });

        if seen.len() > 1 {
            result.duplicated_dependencies.insert(
                name.to_string(),
                seen.iter().map(|v| (*v).to_string()).collect(),
            );
        }
    }

    result
}
