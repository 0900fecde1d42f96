//! Tool failure signatures.
//!
//! A signature is plain data: a label, a regex run over the captured log, the
//! capture group holding the error code, and optional per-code descriptions.
//! Each backend ships a default; the config file can replace it.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How to recognise and summarise one tool's failure output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSignature {
    /// Prefix of every summary, e.g. `NPM error`.
    pub label: String,
    /// Regex searched for in the log.
    pub pattern: String,
    /// Capture group with the error code; 0 is the whole match.
    #[serde(default = "default_code_group")]
    pub code_group: usize,
    /// Human explanations keyed by error code.
    #[serde(default)]
    pub codes: BTreeMap<String, String>,
}

fn default_code_group() -> usize {
    1
}

impl ErrorSignature {
    /// Create a signature without code descriptions.
    pub fn new(label: impl Into<String>, pattern: impl Into<String>, code_group: usize) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
            code_group,
            codes: BTreeMap::new(),
        }
    }

    /// Add descriptions for known codes.
    #[must_use]
    pub fn with_codes(mut self, codes: &[(&str, &str)]) -> Self {
        self.codes.extend(
            codes
                .iter()
                .map(|(code, text)| ((*code).to_string(), (*text).to_string())),
        );
        self
    }

    /// Summarise `logs` as `"<label> <code>[ - <description>]"`.
    ///
    /// Returns an empty string when the pattern does not match or cannot be
    /// compiled. Never panics, whatever the input.
    #[must_use]
    pub fn summarize(&self, logs: &str) -> String {
        let re = match Regex::new(&self.pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(pattern = %self.pattern, error = %e, "invalid error signature");
                return String::new();
            }
        };

        let Some(captures) = re.captures(logs) else {
            return String::new();
        };

        let code = captures
            .get(self.code_group)
            .or_else(|| captures.get(0))
            .map_or("", |m| m.as_str().trim());

        let mut summary = self.label.clone();
        if !code.is_empty() {
            summary.push(' ');
            summary.push_str(code);
        }
        if let Some(description) = self.codes.get(code) {
            summary.push_str(" - ");
            summary.push_str(description);
        }

        summary.trim().to_string()
    }
}
