//! Scoped capture of a tool's output into a log file.
//!
//! A [`LogCapture`] owns a temporary file next to the project. It ends in one
//! of two ways: [`LogCapture::discard`] deletes it, [`LogCapture::preserve`]
//! moves it to the well-known log path. Dropping the guard without either
//! (early return, panic) deletes the temporary file.

use nodepm_util::fs::read_to_string_lossy;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default name of the preserved log, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "nodepm.log";

/// A temporary output sink awaiting a verdict.
#[derive(Debug)]
pub struct LogCapture {
    file: NamedTempFile,
    destination: PathBuf,
}

impl LogCapture {
    /// Create the temporary sink inside `dir`.
    ///
    /// The file lives in the same directory as `destination` normally does, so
    /// preserving it is a rename, not a copy.
    ///
    /// # Errors
    /// Returns an error if the temporary file cannot be created.
    pub fn acquire(dir: &Path, destination: PathBuf) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(".nodepm-")
            .suffix(".log")
            .tempfile_in(dir)?;

        tracing::trace!(path = %file.path().display(), "acquired log capture");

        Ok(Self { file, destination })
    }

    /// Path of the temporary sink; hand this to the executor.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Where the log ends up if preserved.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Read everything captured so far.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn read(&self) -> io::Result<String> {
        read_to_string_lossy(self.file.path())
    }

    /// Delete the sink.
    ///
    /// # Errors
    /// Returns an error if the file cannot be removed.
    pub fn discard(self) -> io::Result<()> {
        self.file.close()
    }

    /// Move the sink to its destination, replacing any previous log.
    ///
    /// # Errors
    /// Returns an error if the file cannot be moved; the temporary file is
    /// removed in that case.
    pub fn preserve(self) -> io::Result<PathBuf> {
        let destination = self.destination;
        self.file
            .persist(&destination)
            .map_err(|e| e.error)?;

        tracing::debug!(path = %destination.display(), "preserved log file");
        Ok(destination)
    }
}
