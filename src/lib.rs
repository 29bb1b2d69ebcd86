//! Bootstrap launcher for `kirha-mcp-installer`
//!
//! Two halves share this library:
//! - [`install`] resolves the prebuilt binary for the host platform, fetches
//!   and verifies it, and places it at a deterministic path.
//! - [`launcher`] runs that binary, forwarding arguments, stdio, signals and
//!   the exit code.

pub mod cli;
pub mod config;
pub mod error;
pub mod install;
pub mod launcher;
pub mod logging;
pub mod platform;

pub use config::LauncherConfig;
pub use error::{DownloadFailure, LauncherError, Result};
pub use platform::{Arch, Os, PlatformKey};
