use crate::pm::backend::Backend;
use crate::pm::error::PmError;
use crate::pm::logfile::DEFAULT_LOG_FILE;
use crate::pm::signatures::ErrorSignature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// CI detection variable.
pub const CI_ENV: &str = "CI";

/// Overrides the preserved log file name.
pub const LOG_FILE_ENV: &str = "NODEPM_LOG_FILE";

/// Optional per-project config file.
pub const CONFIG_FILE: &str = "nodepm.json";

/// Runtime configuration for nodepm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Working directory; fixed for the lifetime of a package manager.
    pub cwd: PathBuf,

    /// Running under CI: tool output is streamed instead of captured.
    pub ci: bool,

    /// Where failed install logs are preserved, relative to `cwd` unless absolute.
    pub log_file: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Force a backend instead of detecting one.
    pub package_manager: Option<Backend>,

    /// Failure signatures replacing the built-in ones, per backend.
    pub error_signatures: BTreeMap<Backend, ErrorSignature>,
}

/// Contents of `nodepm.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub package_manager: Option<Backend>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub error_signatures: BTreeMap<Backend, ErrorSignature>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            ci: false,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            json_logs: false,
            verbosity: 0,
            package_manager: None,
            error_signatures: BTreeMap::new(),
        }
    }
}

/// Interpret a `CI` value: set, non-empty and not `false`/`0`.
#[must_use]
pub fn is_ci_value(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !(v.eq_ignore_ascii_case("false") || v == "0"),
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Create a config for `cwd`, reading `CI` and `NODEPM_LOG_FILE`.
    #[must_use]
    pub fn from_env(cwd: PathBuf) -> Self {
        let mut config =
            Self::new(cwd).with_ci(is_ci_value(std::env::var(CI_ENV).ok().as_deref()));
        if let Some(log_file) = std::env::var_os(LOG_FILE_ENV).filter(|v| !v.is_empty()) {
            config.log_file = PathBuf::from(log_file);
        }
        config
    }

    /// `from_env`, then apply `nodepm.json` from `cwd` if it exists.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn discover(cwd: PathBuf) -> Result<Self, PmError> {
        let path = cwd.join(CONFIG_FILE);
        let config = Self::from_env(cwd);
        if path.is_file() {
            let file = Self::load_file(&path)?;
            Ok(config.with_file(file))
        } else {
            Ok(config)
        }
    }

    /// Read a config file.
    ///
    /// # Errors
    /// Returns `ConfigRead` or `ConfigParse`.
    pub fn load_file(path: &Path) -> Result<FileConfig, PmError> {
        let content = std::fs::read_to_string(path).map_err(|source| PmError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| PmError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply values from a config file. The environment's log file choice wins.
    #[must_use]
    pub fn with_file(mut self, file: FileConfig) -> Self {
        if let Some(backend) = file.package_manager {
            self.package_manager = Some(backend);
        }
        if let Some(log_file) = file.log_file {
            if self.log_file == Path::new(DEFAULT_LOG_FILE) {
                self.log_file = log_file;
            }
        }
        self.error_signatures.extend(file.error_signatures);
        self
    }

    /// Set CI mode.
    #[must_use]
    pub fn with_ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }

    /// Set the preserved log file path.
    #[must_use]
    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = log_file.into();
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Force a backend.
    #[must_use]
    pub fn with_package_manager(mut self, backend: Option<Backend>) -> Self {
        self.package_manager = backend;
        self
    }

    /// Replace a backend's failure signature.
    #[must_use]
    pub fn with_error_signature(mut self, backend: Backend, signature: ErrorSignature) -> Self {
        self.error_signatures.insert(backend, signature);
        self
    }

    /// Absolute path of the preserved log.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        if self.log_file.is_absolute() {
            self.log_file.clone()
        } else {
            self.cwd.join(&self.log_file)
        }
    }

    /// The failure signature in effect for `backend`.
    #[must_use]
    pub fn error_signature(&self, backend: Backend) -> Option<ErrorSignature> {
        self.error_signatures
            .get(&backend)
            .cloned()
            .or_else(|| backend.default_error_signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_ci_value() {
        assert!(is_ci_value(Some("true")));
        assert!(is_ci_value(Some("1")));
        assert!(is_ci_value(Some("github-actions")));
        assert!(!is_ci_value(None));
        assert!(!is_ci_value(Some("")));
        assert!(!is_ci_value(Some("false")));
        assert!(!is_ci_value(Some("FALSE")));
        assert!(!is_ci_value(Some("0")));
    }

    #[test]
    fn test_log_path_relative_and_absolute() {
        let config = Config::new(PathBuf::from("/work/app"));
        assert_eq!(config.log_path(), PathBuf::from("/work/app/nodepm.log"));

        let config = config.with_log_file("/var/log/install.log");
        assert_eq!(config.log_path(), PathBuf::from("/var/log/install.log"));
    }

    #[test]
    fn test_error_signature_override() {
        let config = Config::new(PathBuf::from("."));
        assert!(config.error_signature(Backend::Bun).is_none());
        assert_eq!(
            config.error_signature(Backend::Npm).unwrap().label,
            "NPM error"
        );

        let custom = ErrorSignature::new("BUN error", r"error: (\w+)", 1);
        let config = config.with_error_signature(Backend::Bun, custom.clone());
        assert_eq!(config.error_signature(Backend::Bun), Some(custom));
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{
                "packageManager": "pnpm",
                "logFile": "install-debug.log",
                "errorSignatures": {
                    "bun": { "label": "BUN error", "pattern": "error: (\\w+)" }
                }
            }"#,
        )
        .unwrap();

        let file = Config::load_file(&path).unwrap();
        assert_eq!(file.package_manager, Some(Backend::Pnpm));

        let config = Config::new(dir.path().to_path_buf()).with_file(file);
        assert_eq!(config.package_manager, Some(Backend::Pnpm));
        assert_eq!(config.log_path(), dir.path().join("install-debug.log"));
        assert_eq!(
            config
                .error_signature(Backend::Bun)
                .unwrap()
                .summarize("error: ENOENT"),
            "BUN error ENOENT"
        );
    }

    #[test]
    fn test_load_file_errors() {
        let dir = tempdir().unwrap();
        let missing = Config::load_file(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(missing, PmError::ConfigRead { .. }));

        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"packageManager":"cargo"}"#).unwrap();
        assert!(matches!(
            Config::load_file(&path).unwrap_err(),
            PmError::ConfigParse { .. }
        ));

        fs::write(&path, r#"{"unknownKey":true}"#).unwrap();
        assert!(matches!(
            Config::load_file(&path).unwrap_err(),
            PmError::ConfigParse { .. }
        ));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(CI_ENV, "true");
        std::env::set_var(LOG_FILE_ENV, "ci-install.log");
        let config = Config::from_env(PathBuf::from("/work"));
        std::env::remove_var(CI_ENV);
        std::env::remove_var(LOG_FILE_ENV);

        assert!(config.ci);
        assert_eq!(config.log_path(), PathBuf::from("/work/ci-install.log"));

        let config = Config::from_env(PathBuf::from("/work"));
        assert!(!config.ci);
        assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }
}
