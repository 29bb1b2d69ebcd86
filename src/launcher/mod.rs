//! Transparent delegation to the installed binary
//!
//! The launcher never touches the network or the metadata cache: it resolves
//! the deterministic binary path, spawns it with inherited stdio and
//! environment, relays SIGINT/SIGTERM, and reports the child's exit code.

#[cfg(unix)]
mod signals;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use crossbeam_channel::tick;
use log::debug;

use crate::config::LauncherConfig;
use crate::error::{LauncherError, Result};
use crate::install::InstallLayout;
use crate::platform::PlatformKey;

#[cfg(unix)]
pub use signals::SignalForwarder;

/// How often pending signals are relayed to the child
const SIGNAL_POLL: Duration = Duration::from_millis(20);

/// Path of the installed binary for the running host
pub fn resolve_binary(cfg: &LauncherConfig) -> Result<PathBuf> {
    let platform = PlatformKey::detect()?;
    resolve_binary_for(cfg, &platform)
}

/// Path of the installed binary for `platform`; it must already exist
pub fn resolve_binary_for(cfg: &LauncherConfig, platform: &PlatformKey) -> Result<PathBuf> {
    let layout = InstallLayout::from_config(cfg, platform);
    if layout.binary.is_file() {
        Ok(layout.binary)
    } else {
        Err(LauncherError::BinaryNotFound {
            path: layout.binary,
            platform: platform.to_string(),
        })
    }
}

/// Resolve and run the installed binary; returns the exit code to exit with
pub fn run(cfg: &LauncherConfig, args: &[OsString]) -> Result<i32> {
    let binary = resolve_binary(cfg)?;
    run_binary(&binary, args)
}

/// Spawn `binary` with `args`, wait for it, and map its exit status to a code.
///
/// Signal forwarding is registered before the spawn, so a signal arriving
/// during startup is still relayed, and released once the child is reaped.
pub fn run_binary(binary: &Path, args: &[OsString]) -> Result<i32> {
    #[cfg(unix)]
    let mut forwarder = SignalForwarder::install()
        .map_err(|e| LauncherError::io("Failed to register signal forwarding", e.into()))?;

    debug!("Launching {} with {} args", binary.display(), args.len());
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| LauncherError::Spawn {
            path: binary.to_path_buf(),
            source,
        })?;
    let pid = child.id();

    let signal_tick = tick(SIGNAL_POLL);
    let status = loop {
        // Reaping happens on this thread, so `pid` is still ours here
        #[cfg(unix)]
        forwarder.forward_to(pid);

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                let _ = signal_tick.recv();
            }
            Err(e) => {
                return Err(LauncherError::io(
                    format!("Failed to wait for {}", binary.display()),
                    e,
                ));
            }
        }
    };

    #[cfg(unix)]
    drop(forwarder);
    #[cfg(not(unix))]
    let _ = pid;

    debug!("Child exited with {status}");
    Ok(exit_code(status))
}

/// Child exit code; on Unix a signal death maps to `128 + signal`
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    1
}
