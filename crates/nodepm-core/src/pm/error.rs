//! Package manager error types.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Package manager error codes.
pub mod codes {
    pub const PM_EXTERNAL_TOOL_FAILED: &str = "PM_EXTERNAL_TOOL_FAILED";
    pub const PM_SPAWN_FAILED: &str = "PM_SPAWN_FAILED";
    pub const PM_VERSION_LOOKUP_FAILED: &str = "PM_VERSION_LOOKUP_FAILED";
    pub const PM_MANIFEST_MALFORMED: &str = "PM_MANIFEST_MALFORMED";
    pub const PM_MANIFEST_NOT_FOUND: &str = "PM_MANIFEST_NOT_FOUND";
    pub const PM_MANIFEST_WRITE_FAILED: &str = "PM_MANIFEST_WRITE_FAILED";
    pub const PM_LOG_IO_ERROR: &str = "PM_LOG_IO_ERROR";
    pub const PM_CONFIG_READ_FAILED: &str = "PM_CONFIG_READ_FAILED";
    pub const PM_CONFIG_INVALID: &str = "PM_CONFIG_INVALID";
    pub const PM_PATTERN_INVALID: &str = "PM_PATTERN_INVALID";
    pub const PM_SPEC_INVALID: &str = "PM_SPEC_INVALID";
    pub const PM_UNKNOWN_BACKEND: &str = "PM_UNKNOWN_BACKEND";
}

/// Errors raised by the package manager layer.
///
/// "Not found" and "not supported" are never errors here; they are reported
/// as `None` or empty results by the facade.
#[derive(Error, Debug)]
pub enum PmError {
    /// The external tool ran and exited unsuccessfully.
    #[error("{}", render_tool_failure(.command, .exit_code, .summary, .log_file.as_deref()))]
    ExternalTool {
        /// The command line that was run, e.g. `npm install -D vite`.
        command: String,
        /// Exit code, `None` if the process was killed by a signal.
        exit_code: Option<i32>,
        /// Short parsed summary, empty when no failure signature matched.
        summary: String,
        /// Captured stdout and stderr (empty when stdio was inherited).
        output: String,
        /// Where the full log was preserved, if it was captured.
        log_file: Option<PathBuf>,
    },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to find versions of {name}: {reason}")]
    VersionLookup { name: String, reason: String },

    #[error("Malformed manifest at {path}: {source}")]
    MalformedManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("package.json not found: {}", .path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("Failed to write {}: {source}", .path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Log file error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read config at {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config at {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid package spec: {0}")]
    InvalidSpec(String),

    #[error("Unknown package manager '{0}' (expected npm, yarn1, yarn2, pnpm or bun)")]
    UnknownBackend(String),
}

impl PmError {
    /// Get the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExternalTool { .. } => codes::PM_EXTERNAL_TOOL_FAILED,
            Self::Spawn { .. } => codes::PM_SPAWN_FAILED,
            Self::VersionLookup { .. } => codes::PM_VERSION_LOOKUP_FAILED,
            Self::MalformedManifest { .. } => codes::PM_MANIFEST_MALFORMED,
            Self::ManifestNotFound { .. } => codes::PM_MANIFEST_NOT_FOUND,
            Self::ManifestWrite { .. } => codes::PM_MANIFEST_WRITE_FAILED,
            Self::Io(_) => codes::PM_LOG_IO_ERROR,
            Self::ConfigRead { .. } => codes::PM_CONFIG_READ_FAILED,
            Self::ConfigParse { .. } => codes::PM_CONFIG_INVALID,
            Self::InvalidPattern { .. } => codes::PM_PATTERN_INVALID,
            Self::InvalidSpec(_) => codes::PM_SPEC_INVALID,
            Self::UnknownBackend(_) => codes::PM_UNKNOWN_BACKEND,
        }
    }

    /// Create a version lookup error.
    pub fn version_lookup(name: &str, reason: impl Into<String>) -> Self {
        Self::VersionLookup {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Exit code of the failed tool, if this is an external tool failure.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExternalTool { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Path of the preserved log file, if one was written.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        match self {
            Self::ExternalTool { log_file, .. } => log_file.as_deref(),
            _ => None,
        }
    }
}

fn render_tool_failure(
    command: &str,
    exit_code: &Option<i32>,
    summary: &str,
    log_file: Option<&Path>,
) -> String {
    let mut message = if summary.is_empty() {
        match exit_code {
            Some(code) => format!("Command \"{command}\" failed with exit code {code}"),
            None => format!("Command \"{command}\" failed"),
        }
    } else {
        summary.to_string()
    };

    if let Some(path) = log_file {
        message.push_str(&format!(
            "\n\nPlease check the logfile generated at {} for troubleshooting and try again.",
            path.display()
        ));
    }

    message
}
