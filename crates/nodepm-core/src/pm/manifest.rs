//! package.json documents.
//!
//! The manifest is treated as an opaque JSON object: unknown fields survive a
//! read/write cycle untouched and in their original order. Typed accessors
//! exist only for the fields this layer reasons about.

use super::error::PmError;
use nodepm_util::fs::{atomic_write, find_up_file, read_to_string_lossy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Manifest file name.
pub const PACKAGE_JSON: &str = "package.json";

/// Dependency store directory name.
pub const NODE_MODULES: &str = "node_modules";

/// A parsed package.json document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageJson(Map<String, Value>);

impl PackageJson {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from JSON text.
    ///
    /// # Errors
    /// Returns the JSON error if the text is not a JSON object.
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Read a document from disk.
    ///
    /// # Errors
    /// Returns `ManifestNotFound` if the file is missing and
    /// `MalformedManifest` if it is not a JSON object.
    pub fn read(path: &Path) -> Result<Self, PmError> {
        let content = match read_to_string_lossy(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PmError::ManifestNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(PmError::Io(e)),
        };

        Self::parse(&content).map_err(|source| PmError::MalformedManifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the document atomically, pretty-printed with a trailing newline.
    ///
    /// # Errors
    /// Returns `ManifestWrite` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), PmError> {
        let mut content = serde_json::to_string_pretty(&self.0).map_err(|e| {
            PmError::ManifestWrite {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;
        content.push('\n');

        atomic_write(path, content.as_bytes()).map_err(|source| PmError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Raw field access.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Shallow-merge another object into this document; `patch` wins.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key, value);
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }

    #[must_use]
    pub fn dependencies(&self) -> Option<&Map<String, Value>> {
        self.section("dependencies")
    }

    #[must_use]
    pub fn dev_dependencies(&self) -> Option<&Map<String, Value>> {
        self.section("devDependencies")
    }

    #[must_use]
    pub fn peer_dependencies(&self) -> Option<&Map<String, Value>> {
        self.section("peerDependencies")
    }

    #[must_use]
    pub fn scripts(&self) -> Option<&Map<String, Value>> {
        self.section("scripts")
    }

    /// An object-valued field; `None` if missing or not an object.
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }
}

impl From<Map<String, Value>> for PackageJson {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Merge `dependencies`, `devDependencies` and `peerDependencies`.
///
/// Later sections take precedence (peer over dev over regular). Entries whose
/// range is not a string are skipped with a warning.
#[must_use]
pub fn all_dependencies(doc: &PackageJson) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();

    for section in ["dependencies", "devDependencies", "peerDependencies"] {
        let Some(value) = doc.get(section) else {
            continue;
        };
        let Some(entries) = value.as_object() else {
            tracing::warn!(section, "ignoring non-object dependency section");
            continue;
        };

        for (name, range) in entries {
            if let Some(range) = range.as_str() {
                merged.insert(name.clone(), range.to_string());
            } else {
                tracing::warn!(section, name = %name, "ignoring non-string dependency range");
            }
        }
    }

    merged
}

/// Search upward from `base` for `node_modules/<package_name>/package.json`.
///
/// # Errors
/// Returns `MalformedManifest` if a candidate exists but is not a JSON object.
pub fn find_installed_manifest(
    package_name: &str,
    base: &Path,
) -> Result<Option<(PathBuf, PackageJson)>, PmError> {
    let relative = Path::new(NODE_MODULES).join(package_name).join(PACKAGE_JSON);
    let found = find_up_file(base, &relative).filter(|path| path.is_file());

    match found {
        Some(path) => {
            let doc = PackageJson::read(&path)?;
            Ok(Some((path, doc)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn write_installed(root: &Path, name: &str, content: &str) {
        let dir = root.join(NODE_MODULES).join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(PACKAGE_JSON), content).unwrap();
    }

    #[test]
    fn test_accessors() {
        let doc = PackageJson::parse(
            r#"{
                "name": "app",
                "version": "1.0.0",
                "dependencies": { "react": "^18.0.0" },
                "devDependencies": { "vite": "^5.0.0" },
                "scripts": { "test": "vitest" }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.name(), Some("app"));
        assert_eq!(doc.version(), Some("1.0.0"));
        assert_eq!(doc.dependencies().unwrap()["react"], "^18.0.0");
        assert_eq!(doc.dev_dependencies().unwrap()["vite"], "^5.0.0");
        assert!(doc.peer_dependencies().is_none());
        assert!(doc.scripts().unwrap().contains_key("test"));
    }

    #[test]
    fn test_non_object_root_rejected() {
        assert!(PackageJson::parse("[1, 2, 3]").is_err());
        assert!(PackageJson::parse("\"text\"").is_err());
    }

    #[test]
    fn test_write_preserves_unknown_fields_and_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(PACKAGE_JSON);
        fs::write(
            &path,
            r#"{"name":"app","zzz":{"custom":true},"aaa":[1,2],"version":"0.0.1"}"#,
        )
        .unwrap();

        let doc = PackageJson::read(&path).unwrap();
        doc.write(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        let zzz = written.find("\"zzz\"").unwrap();
        let aaa = written.find("\"aaa\"").unwrap();
        assert!(zzz < aaa);
        assert_eq!(PackageJson::read(&path).unwrap(), doc);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let err = PackageJson::read(&dir.path().join(PACKAGE_JSON)).unwrap_err();
        assert!(matches!(err, PmError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_all_dependencies_precedence() {
        let doc = PackageJson::parse(
            r#"{
                "dependencies": { "react": "^17.0.0", "a": "1.0.0" },
                "devDependencies": { "react": "^18.0.0", "b": 2 },
                "peerDependencies": { "c": "*" }
            }"#,
        )
        .unwrap();

        let deps = all_dependencies(&doc);
        assert_eq!(deps.len(), 3);
        assert_eq!(deps["react"], "^18.0.0");
        assert_eq!(deps["a"], "1.0.0");
        assert_eq!(deps["c"], "*");
        assert!(!deps.contains_key("b"));
    }

    #[test]
    fn test_merge_patch_wins() {
        let mut doc = PackageJson::parse(r#"{"name":"app","overrides":{"a":"1"}}"#).unwrap();
        let patch = json!({ "overrides": { "a": "2" } });
        doc.merge(patch.as_object().unwrap().clone());
        assert_eq!(doc.get("overrides").unwrap()["a"], "2");
        assert_eq!(doc.name(), Some("app"));
    }

    #[test]
    fn test_find_installed_manifest_walks_up() {
        let root = tempdir().unwrap();
        write_installed(root.path(), "left-pad", r#"{"name":"left-pad","version":"1.0.0"}"#);
        let nested = root.path().join("packages").join("web");
        fs::create_dir_all(&nested).unwrap();

        let (path, doc) = find_installed_manifest("left-pad", &nested).unwrap().unwrap();
        assert_eq!(doc.version(), Some("1.0.0"));
        assert!(path.ends_with("node_modules/left-pad/package.json"));
    }

    #[test]
    fn test_find_installed_manifest_scoped() {
        let root = tempdir().unwrap();
        write_installed(root.path(), "@types/node", r#"{"name":"@types/node","version":"20.1.0"}"#);

        let (_, doc) = find_installed_manifest("@types/node", root.path())
            .unwrap()
            .unwrap();
        assert_eq!(doc.name(), Some("@types/node"));
    }

    #[test]
    fn test_find_installed_manifest_absent() {
        let root = tempdir().unwrap();
        assert!(find_installed_manifest("nonexistent-pkg-xyz", root.path())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_installed_manifest_malformed() {
        let root = tempdir().unwrap();
        write_installed(root.path(), "broken", "{ not json");

        let err = find_installed_manifest("broken", root.path()).unwrap_err();
        assert!(matches!(err, PmError::MalformedManifest { .. }));
    }
}
