//! Package identity parsing.
//!
//! Parses dependency requests like:
//! - `react`
//! - `react@18.2.0`
//! - `react@^18.0.0`
//! - `@types/node`
//! - `@types/node@^20`
//!
//! The version part is passed to the external tool untouched; no range
//! validation happens here.

use super::error::PmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A package name plus an optional version specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    /// Full package name (e.g., "@scope/name" or "name").
    pub name: String,
    /// Version range, exact version or tag (None lets the tool pick).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageIdentity {
    /// Create an identity from its parts.
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse a `name[@version]` request.
    ///
    /// # Errors
    /// Returns `PmError::InvalidSpec` if the name or version part is empty,
    /// or a scoped name has no `/`.
    pub fn parse(input: &str) -> Result<Self, PmError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(PmError::InvalidSpec("Empty package spec".to_string()));
        }

        let (name, version) = split_name_version(input);

        if name.is_empty() {
            return Err(PmError::InvalidSpec(format!("empty name in '{input}'")));
        }

        // The tools would read these as options
        if name.starts_with('-') {
            return Err(PmError::InvalidSpec(format!(
                "'{input}' looks like a flag, not a package"
            )));
        }

        if let Some(scoped) = name.strip_prefix('@') {
            match scoped.split_once('/') {
                Some((scope, rest)) if !scope.is_empty() && !rest.is_empty() => {}
                _ => {
                    return Err(PmError::InvalidSpec(format!(
                        "Invalid scoped package '{input}'"
                    )))
                }
            }
        }

        if name.chars().any(char::is_whitespace) {
            return Err(PmError::InvalidSpec(format!(
                "Invalid whitespace in package name '{name}'"
            )));
        }

        match version {
            Some("") => Err(PmError::InvalidSpec(format!(
                "empty version range in '{input}'"
            ))),
            Some(v) => Ok(Self::new(name, Some(v.to_string()))),
            None => Ok(Self::new(name, None)),
        }
    }

    /// Check if this is a scoped package.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.name.starts_with('@')
    }
}

impl FromStr for PackageIdentity {
    type Err = PmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Split `name@version` at the version delimiter, honoring the scope `@`.
///
/// Also used for tool output such as yarn's `react@17.0.2` tree labels.
#[must_use]
pub fn split_name_version(input: &str) -> (&str, Option<&str>) {
    // A leading @ belongs to the scope, never to the version
    let search_from = usize::from(input.starts_with('@'));

    match input[search_from..].find('@') {
        Some(pos) => {
            let at = search_from + pos;
            (&input[..at], Some(&input[at + 1..]))
        }
        None => (input, None),
    }
}
