//! The tool-agnostic package manager.
//!
//! [`PackageManager`] picks a [`Backend`] once, at construction, and runs every
//! operation through it. Shared behaviour lives here: log capture around
//! add/remove, failure classification, tree flattening and manifest access.

use super::backend::{Backend, Capabilities, Support, VersionLookup, VersionQuery};
use super::detect::{detect_backend, USER_AGENT_ENV};
use super::error::PmError;
use super::exec::{CommandExecutor, CommandOutput, Invocation, StdioMode, SystemExecutor};
use super::identity::PackageIdentity;
use super::logfile::LogCapture;
use super::manifest::{all_dependencies, find_installed_manifest, PackageJson, PACKAGE_JSON};
use super::metadata::{collect_installations, InstallationMetadata, NamePatterns};
use crate::config::Config;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Unified interface over npm, yarn, pnpm and bun.
#[derive(Debug)]
pub struct PackageManager<E = SystemExecutor> {
    backend: Backend,
    config: Config,
    executor: E,
}

impl PackageManager<SystemExecutor> {
    /// Detect the backend for `config.cwd` and spawn real processes.
    #[must_use]
    pub fn system(config: Config) -> Self {
        Self::detect(config, SystemExecutor::new())
    }
}

impl<E: CommandExecutor> PackageManager<E> {
    /// Create a package manager for a known backend.
    pub fn new(backend: Backend, config: Config, executor: E) -> Self {
        Self {
            backend,
            config,
            executor,
        }
    }

    /// Create a package manager, honouring `config.package_manager` before
    /// falling back to detection.
    pub fn detect(config: Config, executor: E) -> Self {
        let backend = match config.package_manager {
            Some(backend) => backend,
            None => {
                let user_agent = std::env::var(USER_AGENT_ENV).ok();
                detect_backend(&config.cwd, user_agent.as_deref(), &executor)
            }
        };
        tracing::debug!(%backend, cwd = %config.cwd.display(), "package manager selected");
        Self::new(backend, config, executor)
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The working directory every command runs in.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.config.cwd
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Which optional capabilities the backend implements.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = self.backend.capabilities();
        caps.error_parsing = self.config.error_signature(self.backend).is_some();
        caps
    }

    fn invocation(&self, args: Vec<String>) -> Invocation {
        Invocation::new(self.backend.binary(), args, self.cwd())
    }

    fn spawn_error(&self, source: io::Error) -> PmError {
        PmError::Spawn {
            program: self.backend.binary().to_string(),
            source,
        }
    }

    /// Classify a finished process: success passes through, anything else is
    /// an `ExternalTool` failure carrying the captured output.
    fn check(invocation: &Invocation, output: CommandOutput) -> Result<CommandOutput, PmError> {
        if output.success() {
            return Ok(output);
        }
        Err(PmError::ExternalTool {
            command: invocation.display(),
            exit_code: output.exit_code,
            summary: String::new(),
            output: output.combined(),
            log_file: None,
        })
    }

    /// Summarise a failure log with the backend's signature.
    ///
    /// Returns `""` when nothing matched or no signature is configured.
    #[must_use]
    pub fn parse_error_from_logs(&self, logs: &str) -> String {
        self.config
            .error_signature(self.backend)
            .map(|signature| signature.summarize(logs))
            .unwrap_or_default()
    }

    /// Bootstrap a `package.json` in the working directory.
    pub async fn init_project(&self) -> Result<(), PmError> {
        let invocation = self.invocation(self.backend.init_args());
        tracing::debug!(command = %invocation.display(), "initializing project");

        let output = self
            .executor
            .execute(&invocation)
            .await
            .map_err(|e| self.spawn_error(e))?;
        Self::check(&invocation, output).map(|_| ())
    }

    /// The command a user would type to run `script`.
    #[must_use]
    pub fn get_run_command(&self, script: &str) -> String {
        self.backend.run_command(script)
    }

    fn script_invocation(&self, script: &str, args: &[String], cwd: Option<&Path>) -> Invocation {
        let mut invocation = self.invocation(self.backend.run_args(script, args));
        if let Some(cwd) = cwd {
            invocation.cwd = cwd.to_path_buf();
        }
        invocation
    }

    /// Run a manifest script and return its stdout.
    pub async fn run_script(
        &self,
        script: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<String, PmError> {
        let invocation = self.script_invocation(script, args, cwd);
        tracing::debug!(command = %invocation.display(), "running script");

        let output = self
            .executor
            .execute(&invocation)
            .await
            .map_err(|e| self.spawn_error(e))?;
        Self::check(&invocation, output).map(|out| out.stdout)
    }

    /// Blocking variant of [`run_script`](Self::run_script).
    pub fn run_script_sync(
        &self,
        script: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<String, PmError> {
        let invocation = self.script_invocation(script, args, cwd);
        tracing::debug!(command = %invocation.display(), "running script");

        let output = self
            .executor
            .execute_sync(&invocation)
            .map_err(|e| self.spawn_error(e))?;
        Self::check(&invocation, output).map(|out| out.stdout)
    }

    /// Render identities as tool arguments, re-validating each one since the
    /// fields are public.
    fn specs(dependencies: &[PackageIdentity]) -> Result<Vec<String>, PmError> {
        dependencies
            .iter()
            .map(|dep| {
                let spec = dep.to_string();
                PackageIdentity::parse(&spec)?;
                Ok(spec)
            })
            .collect()
    }

    /// Add dependencies to the project.
    pub async fn add_dependencies(
        &self,
        dependencies: &[PackageIdentity],
        as_dev: bool,
    ) -> Result<(), PmError> {
        let specs = Self::specs(dependencies)?;
        let args = self.backend.add_args(&specs, as_dev, self.cwd());
        self.run_with_log(args).await
    }

    /// Remove dependencies from the project.
    pub async fn remove_dependencies(
        &self,
        dependencies: &[PackageIdentity],
    ) -> Result<(), PmError> {
        let specs = Self::specs(dependencies)?;
        let args = self.backend.remove_args(&specs, self.cwd());
        self.run_with_log(args).await
    }

    /// Install from the existing manifest and lockfile, streaming output.
    pub async fn run_install(&self) -> Result<(), PmError> {
        let invocation = self
            .invocation(self.backend.install_args())
            .with_stdio(StdioMode::Inherit);
        tracing::debug!(command = %invocation.display(), "installing");

        let output = self
            .executor
            .execute(&invocation)
            .await
            .map_err(|e| self.spawn_error(e))?;
        Self::check(&invocation, output).map(|_| ())
    }

    /// Run a mutating command with its output captured into a log.
    ///
    /// Under CI the output is streamed instead and nothing is captured.
    async fn run_with_log(&self, args: Vec<String>) -> Result<(), PmError> {
        let invocation = self.invocation(args);

        if self.config.ci {
            let invocation = invocation.with_stdio(StdioMode::Inherit);
            tracing::debug!(command = %invocation.display(), "running with inherited output");
            let output = self
                .executor
                .execute(&invocation)
                .await
                .map_err(|e| self.spawn_error(e))?;
            return Self::check(&invocation, output).map(|_| ());
        }

        // The temporary log sits next to the preserved one so the final move
        // stays on one filesystem
        let log_path = self.config.log_path();
        let dir = log_path.parent().unwrap_or(self.cwd());
        std::fs::create_dir_all(dir)?;
        let capture = LogCapture::acquire(dir, log_path.clone())?;
        let invocation = invocation.with_stdio(StdioMode::LogFile(capture.path().to_path_buf()));
        tracing::debug!(
            command = %invocation.display(),
            log = %capture.path().display(),
            destination = %capture.destination().display(),
            "running with captured output"
        );

        let output = self
            .executor
            .execute(&invocation)
            .await
            .map_err(|e| self.spawn_error(e))?;

        if output.success() {
            capture.discard()?;
            return Ok(());
        }

        let logs = capture.read()?;
        let summary = self.parse_error_from_logs(&logs);
        let destination = capture.destination().to_path_buf();

        // A failed move still reports the tool failure, just without a log path
        let log_file = match capture.preserve() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    log = %destination.display(),
                    "failed to preserve log file"
                );
                None
            }
        };
        tracing::debug!(
            exit_code = ?output.exit_code,
            summary = %summary,
            log = ?log_file,
            "command failed"
        );

        Err(PmError::ExternalTool {
            command: invocation.display(),
            exit_code: output.exit_code,
            summary,
            output: logs,
            log_file,
        })
    }

    /// Look up the latest or all published versions of `name`.
    ///
    /// Backends without version lookup return the neutral result without
    /// running anything.
    pub async fn get_installed_versions(
        &self,
        name: &str,
        query: VersionQuery,
    ) -> Result<VersionLookup, PmError> {
        let Support::Available(args) = self.backend.versions_args(name, query) else {
            tracing::debug!(backend = %self.backend, "version lookup not supported");
            return Ok(VersionLookup::neutral(query));
        };

        let invocation = self.invocation(args);
        tracing::debug!(command = %invocation.display(), "looking up versions");

        let output = self
            .executor
            .execute(&invocation)
            .await
            .map_err(|e| self.spawn_error(e))?;

        match self.backend.parse_versions(&output.stdout, query) {
            Ok(lookup) if output.success() => Ok(lookup),
            Ok(_) => {
                let stderr = output.stderr.trim();
                let reason = if stderr.is_empty() {
                    format!("{} exited with code {:?}", invocation.display(), output.exit_code)
                } else {
                    stderr.to_string()
                };
                Err(PmError::version_lookup(name, reason))
            }
            Err(reason) => Err(PmError::version_lookup(name, reason)),
        }
    }

    /// List installed packages whose names match `patterns` (`*` wildcards).
    ///
    /// `None` when the backend cannot list or its output is unusable.
    pub async fn find_installed_packages(
        &self,
        patterns: &[String],
    ) -> Option<InstallationMetadata> {
        let matcher = match NamePatterns::new(patterns) {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring package search");
                return None;
            }
        };

        let Support::Available(args) = self.backend.list_args(patterns) else {
            tracing::debug!(backend = %self.backend, "listing installed packages not supported");
            return None;
        };

        let invocation = self.invocation(args).with_env("FORCE_COLOR", "false");
        tracing::debug!(command = %invocation.display(), "listing installed packages");

        let output = match self.executor.execute(&invocation).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(error = %e, "failed to run list command");
                return None;
            }
        };

        let tree = match self.backend.parse_tree(&output) {
            Ok(tree) => tree,
            Err(reason) => {
                tracing::debug!(exit_code = ?output.exit_code, %reason, "unusable list output");
                return None;
            }
        };

        Some(collect_installations(
            &tree,
            &matcher,
            self.backend.info_command(),
            self.backend.dedupe_command(),
        ))
    }

    /// Find the installed `package.json` of `name`, searching upward from
    /// `base` (default: the working directory).
    pub fn get_package_manifest(
        &self,
        name: &str,
        base: Option<&Path>,
    ) -> Result<Option<PackageJson>, PmError> {
        let base = base.unwrap_or(self.cwd());
        let found = find_installed_manifest(name, base)?;
        Ok(found.map(|(_, doc)| doc))
    }

    fn project_manifest_path(&self) -> PathBuf {
        self.cwd().join(PACKAGE_JSON)
    }

    /// Read the project's `package.json`.
    pub fn read_package_json(&self) -> Result<PackageJson, PmError> {
        PackageJson::read(&self.project_manifest_path())
    }

    /// Write the project's `package.json`.
    pub fn write_package_json(&self, doc: &PackageJson) -> Result<(), PmError> {
        doc.write(&self.project_manifest_path())
    }

    /// Every declared dependency of the project, peer over dev over regular.
    pub fn get_all_dependencies(&self) -> Result<BTreeMap<String, String>, PmError> {
        let doc = self.read_package_json()?;
        Ok(all_dependencies(&doc))
    }

    /// The manifest patch pinning `versions` with the backend's override field.
    #[must_use]
    pub fn get_resolutions(
        &self,
        doc: &PackageJson,
        versions: &BTreeMap<String, String>,
    ) -> Map<String, Value> {
        self.backend.resolutions_patch(doc, versions)
    }

    /// Pin `versions` in the project manifest and write it back.
    pub fn add_package_resolutions(
        &self,
        versions: &BTreeMap<String, String>,
    ) -> Result<(), PmError> {
        let mut doc = self.read_package_json()?;
        let patch = self.get_resolutions(&doc, versions);
        doc.merge(patch);
        self.write_package_json(&doc)
    }
}
