//! Package manager abstraction.
//!
//! Provides:
//! - A closed set of backends (npm, yarn classic, yarn berry, pnpm, bun), one
//!   module per CLI dialect
//! - Detection of the project's package manager from lockfiles
//! - An executor seam for spawning the external tools
//! - Scoped capture of tool output into a preserved log on failure
//! - Flattening of installed dependency trees and duplicate detection
//! - Reading and writing `package.json`
//! - The [`PackageManager`] facade tying these together

pub mod backend;
pub mod detect;
pub mod error;
pub mod exec;
pub mod facade;
pub mod identity;
pub mod logfile;
pub mod manifest;
pub mod metadata;
pub mod signatures;

pub use backend::{Backend, Capabilities, Support, VersionLookup, VersionQuery};
pub use detect::{backend_from_user_agent, detect_backend, find_lockfile, Lockfile, USER_AGENT_ENV};
pub use error::{codes as pm_codes, PmError};
pub use exec::{CommandExecutor, CommandOutput, Invocation, StdioMode, SystemExecutor};
pub use facade::PackageManager;
pub use identity::PackageIdentity;
pub use logfile::{LogCapture, DEFAULT_LOG_FILE};
pub use manifest::{all_dependencies, find_installed_manifest, PackageJson, NODE_MODULES, PACKAGE_JSON};
pub use metadata::{
    collect_installations, DependencyNode, DependencyTree, InstallationMetadata, NamePatterns,
    NodeId, PackageMetadata,
};
pub use signatures::ErrorSignature;
