//! Package manager detection.
//!
//! Resolution order:
//! 1. The nearest directory (walking up) containing a known lockfile
//! 2. `npm_config_user_agent`, set by every package manager for the scripts it runs
//! 3. npm

use super::backend::Backend;
use super::exec::{CommandExecutor, Invocation};
use nodepm_util::fs::find_up;
use std::path::{Path, PathBuf};

/// Environment variable package managers set for child scripts.
pub const USER_AGENT_ENV: &str = "npm_config_user_agent";

/// Lockfiles, in priority order when several share a directory.
const LOCKFILES: &[(&str, Lockfile)] = &[
    ("bun.lockb", Lockfile::Bun),
    ("bun.lock", Lockfile::Bun),
    ("pnpm-lock.yaml", Lockfile::Pnpm),
    ("yarn.lock", Lockfile::Yarn),
    ("package-lock.json", Lockfile::Npm),
    ("npm-shrinkwrap.json", Lockfile::Npm),
];

/// Which tool a lockfile belongs to. Yarn needs a second look to tell the
/// generations apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lockfile {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

/// Find the nearest lockfile at or above `cwd`.
#[must_use]
pub fn find_lockfile(cwd: &Path) -> Option<(PathBuf, Lockfile)> {
    let mut kind = None;
    let path = find_up(cwd, |dir| {
        LOCKFILES.iter().find_map(|(name, lockfile)| {
            let candidate = dir.join(name);
            candidate.is_file().then(|| {
                kind = Some(*lockfile);
                candidate
            })
        })
    })?;
    kind.map(|kind| (path, kind))
}

/// Parse an `npm_config_user_agent` value such as
/// `pnpm/8.6.0 npm/? node/v18.16.0 darwin arm64`.
#[must_use]
pub fn backend_from_user_agent(user_agent: &str) -> Option<Backend> {
    let first = user_agent.split_whitespace().next()?;
    let (tool, version) = first.split_once('/')?;

    match tool {
        "npm" => Some(Backend::Npm),
        "pnpm" => Some(Backend::Pnpm),
        "bun" => Some(Backend::Bun),
        "yarn" => Some(yarn_generation(version)),
        _ => None,
    }
}

/// Yarn 1 for `1.x` (or anything unparsable), berry for 2 and later.
fn yarn_generation(version: &str) -> Backend {
    match version.trim().split('.').next().and_then(|m| m.parse::<u32>().ok()) {
        Some(major) if major >= 2 => Backend::Yarn2,
        _ => Backend::Yarn1,
    }
}

/// Decide between yarn generations for a project using `yarn.lock`.
///
/// `.yarnrc.yml` only exists for berry; otherwise ask the binary.
fn detect_yarn<E: CommandExecutor>(lock_dir: &Path, cwd: &Path, executor: &E) -> Backend {
    if lock_dir.join(".yarnrc.yml").is_file() {
        return Backend::Yarn2;
    }

    let inv = Invocation::new("yarn", ["--version"], cwd);
    match executor.execute_sync(&inv) {
        Ok(out) if out.success() => yarn_generation(&out.stdout),
        Ok(out) => {
            tracing::debug!(exit_code = ?out.exit_code, "yarn --version failed, assuming yarn 1");
            Backend::Yarn1
        }
        Err(e) => {
            tracing::debug!(error = %e, "yarn not runnable, assuming yarn 1");
            Backend::Yarn1
        }
    }
}

/// Detect the package manager for `cwd`.
///
/// `user_agent` is the value of [`USER_AGENT_ENV`], passed in so callers
/// control the environment.
pub fn detect_backend<E: CommandExecutor>(
    cwd: &Path,
    user_agent: Option<&str>,
    executor: &E,
) -> Backend {
    if let Some((path, lockfile)) = find_lockfile(cwd) {
        let backend = match lockfile {
            Lockfile::Npm => Backend::Npm,
            Lockfile::Pnpm => Backend::Pnpm,
            Lockfile::Bun => Backend::Bun,
            Lockfile::Yarn => {
                let lock_dir = path.parent().unwrap_or(cwd);
                detect_yarn(lock_dir, cwd, executor)
            }
        };
        tracing::debug!(lockfile = %path.display(), %backend, "detected package manager");
        return backend;
    }

    if let Some(backend) = user_agent.and_then(backend_from_user_agent) {
        tracing::debug!(%backend, "detected package manager from user agent");
        return backend;
    }

    Backend::Npm
}
