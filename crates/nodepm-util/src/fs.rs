use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// Package manager logs regularly contain partial escape sequences and
/// truncated multibyte characters, so callers scanning them should use this
/// instead of `fs::read_to_string`.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// The file will either have the old contents or the new contents, never a
/// partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));

    // Same directory as the target so the rename never crosses filesystems
    let mut temp_path = parent.to_path_buf();
    temp_path.push(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // On Windows, rename can fail if target exists. Try copy + remove as fallback.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// Walk from `start` towards the filesystem root, returning the first path
/// produced by `probe`.
///
/// `probe` is called with each directory in turn (`start` first). The search
/// stops at the root; `None` means no ancestor matched.
pub fn find_up<F>(start: &Path, mut probe: F) -> Option<PathBuf>
where
    F: FnMut(&Path) -> Option<PathBuf>,
{
    let mut current = start.to_path_buf();

    loop {
        if let Some(found) = probe(&current) {
            return Some(found);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Find the nearest ancestor of `start` (inclusive) containing `relative`.
///
/// Returns the full path of the existing file or directory.
#[must_use]
pub fn find_up_file(start: &Path, relative: &Path) -> Option<PathBuf> {
    find_up(start, |dir| {
        let candidate = dir.join(relative);
        candidate.exists().then_some(candidate)
    })
}
