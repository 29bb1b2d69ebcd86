//! `kirha-mcp-installer`: runs the installed platform binary.
//!
//! Every argument is forwarded untouched; this wrapper has no flags of its own.

use std::ffi::OsString;

use kirha_mcp_launcher::{LauncherConfig, LauncherError, launcher, logging};

fn main() {
    // Quiet by default: stdout/stderr belong to the delegated binary
    logging::init(log::LevelFilter::Warn);

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let code = match LauncherConfig::load(None).and_then(|cfg| launcher::run(&cfg, &args)) {
        Ok(code) => code,
        Err(e) => {
            let code = e.exit_code();
            report(e);
            code
        }
    };
    std::process::exit(code);
}

fn report(e: LauncherError) {
    let hint = match &e {
        LauncherError::BinaryNotFound { .. } => {
            Some("Make sure the binary is installed for your platform: run kirha-mcp-install.")
        }
        LauncherError::Spawn { .. } => Some(
            "The binary exists but could not be started; reinstall it with kirha-mcp-install.",
        ),
        _ => None,
    };
    eprintln!("Error: {:#}", anyhow::Error::new(e));
    if let Some(hint) = hint {
        eprintln!("{hint}");
    }
    eprintln!(
        "Platform: {}, Architecture: {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
