//! External command execution.
//!
//! Backends describe what to run as an [`Invocation`]; a [`CommandExecutor`]
//! runs it. [`SystemExecutor`] spawns real processes, tests substitute a
//! scripted executor.

use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Where a child's stdout/stderr go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdioMode {
    /// Share the parent's terminal; nothing is captured.
    Inherit,
    /// Capture stdout and stderr into [`CommandOutput`].
    Pipe,
    /// Discard all output.
    Ignore,
    /// Append stdout and stderr to the given file; stdin is closed.
    LogFile(PathBuf),
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub stdio: StdioMode,
    /// Extra environment variables, applied on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Create an invocation with piped output and no extra environment.
    pub fn new<I, S>(program: impl Into<String>, args: I, cwd: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.to_path_buf(),
            stdio: StdioMode::Pipe,
            env: Vec::new(),
        }
    }

    /// Set the stdio mode.
    #[must_use]
    pub fn with_stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The command line as a user would type it.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout (empty unless the stdio mode was `Pipe`).
    pub stdout: String,
    /// Captured stderr (empty unless the stdio mode was `Pipe`).
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Capability to run external commands.
///
/// Implementations must not treat a non-zero exit as an error: the caller
/// classifies failures. `Err` is reserved for processes that could not be
/// started or waited on.
pub trait CommandExecutor {
    /// Run the command, blocking the current thread.
    fn execute_sync(&self, invocation: &Invocation) -> io::Result<CommandOutput>;

    /// Run the command, suspending until the process exits.
    fn execute(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = io::Result<CommandOutput>> + Send;
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Resolve a bare program name through `PATH` (picks up `npm.cmd` on Windows).
fn resolve_program(program: &str) -> PathBuf {
    which::which(program).unwrap_or_else(|_| PathBuf::from(program))
}

fn open_log(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// stdin, stdout and stderr handles for a mode.
fn stdio_triple(mode: &StdioMode) -> io::Result<(Stdio, Stdio, Stdio)> {
    Ok(match mode {
        StdioMode::Inherit => (Stdio::inherit(), Stdio::inherit(), Stdio::inherit()),
        StdioMode::Pipe => (Stdio::null(), Stdio::piped(), Stdio::piped()),
        StdioMode::Ignore => (Stdio::null(), Stdio::null(), Stdio::null()),
        StdioMode::LogFile(path) => {
            let out = open_log(path)?;
            let err = out.try_clone()?;
            (Stdio::null(), Stdio::from(out), Stdio::from(err))
        }
    })
}

fn to_output(output: &std::process::Output) -> CommandOutput {
    CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

impl CommandExecutor for SystemExecutor {
    fn execute_sync(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        let (stdin, stdout, stderr) = stdio_triple(&invocation.stdio)?;

        let output = Command::new(resolve_program(&invocation.program))
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(stdin)
            .stdout(stdout)
            .stderr(stderr)
            .output()?;

        Ok(to_output(&output))
    }

    fn execute(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = io::Result<CommandOutput>> + Send {
        async move {
            let (stdin, stdout, stderr) = stdio_triple(&invocation.stdio)?;

            // `output()` would force pipes over the configured handles.
            let child = tokio::process::Command::new(resolve_program(&invocation.program))
                .args(&invocation.args)
                .current_dir(&invocation.cwd)
                .envs(invocation.env.iter().map(|(k, v)| (k, v)))
                .stdin(stdin)
                .stdout(stdout)
                .stderr(stderr)
                .kill_on_drop(true)
                .spawn()?;
            let output = child.wait_with_output().await?;

            Ok(to_output(&output))
        }
    }
}
