//! `kirha-mcp-install` binary
//!
//! Thin wrapper around the installer library; the pipeline lives in
//! `kirha_mcp_launcher::install`.

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, error};

use kirha_mcp_launcher::cli::{Args, Cmd};
use kirha_mcp_launcher::install::{
    self, InstallLayout, InstallManifest, InstallOutcome, InstallationState, MetadataCache,
    binary_staging, check_installation_state,
};
use kirha_mcp_launcher::{LauncherConfig, PlatformKey, logging};

fn main() {
    logging::init(LevelFilter::Info);
    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    let code = match rt.block_on(real_main(args)) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn real_main(args: Args) -> Result<i32> {
    let mut cfg =
        LauncherConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.no_verify {
        cfg.verify_checksum = false;
    }

    match args.command() {
        Cmd::Install => Ok(handle_install(&cfg).await),
        Cmd::Status => handle_status(&cfg),
        Cmd::CleanCache => handle_clean_cache(&cfg),
    }
}

fn host() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Handle install command - fetch and verify unless already present
async fn handle_install(cfg: &LauncherConfig) -> i32 {
    match install::ensure_installed(cfg).await {
        Ok(InstallOutcome::AlreadyInstalled { .. }) => {
            println!("✅ {} is ready for {}", cfg.binary_name, host());
            0
        }
        Ok(InstallOutcome::Installed { tag_name, .. }) => {
            println!("✅ {} {tag_name} is ready for {}", cfg.binary_name, host());
            0
        }
        Err(e) => {
            let binary_path = PlatformKey::detect()
                .map(|platform| InstallLayout::from_config(cfg, &platform).binary)
                .unwrap_or_else(|_| cfg.install_dir());
            let steps = e.troubleshooting(&cfg.repo, &binary_path);
            let code = e.exit_code();
            eprintln!("Installation failed: {:#}", anyhow::Error::new(e));
            if !steps.is_empty() {
                eprintln!("\nTroubleshooting:");
                for step in steps {
                    eprintln!("{step}");
                }
            }
            code
        }
    }
}

/// Handle status command - report what is installed where
fn handle_status(cfg: &LauncherConfig) -> Result<i32> {
    let platform = PlatformKey::detect()?;
    let layout = InstallLayout::from_config(cfg, &platform);
    let state = check_installation_state(&layout);
    let ready = state == InstallationState::Installed
        && binary_staging::is_executable(&layout.binary);

    println!("Platform: {platform}");
    println!("Binary:   {}", layout.binary.display());
    if state == InstallationState::Installed && !ready {
        println!("State:    {state:?} (not executable)");
    } else {
        println!("State:    {state:?}");
    }
    if let Some(manifest) = InstallManifest::read(&layout.manifest) {
        println!("Release:  {}", manifest.tag_name);
        let verified = if manifest.verified { " (verified)" } else { "" };
        println!("SHA-256:  {}{verified}", manifest.sha256);
        println!("Installed {}", manifest.installed_at.to_rfc3339());
    }

    Ok(if ready { 0 } else { 1 })
}

/// Handle clean-cache command - drop cached release metadata
fn handle_clean_cache(cfg: &LauncherConfig) -> Result<i32> {
    let path = cfg.cache_file();
    MetadataCache::at_path(&path, cfg.cache_ttl())
        .clear()
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    println!("Removed release cache {}", path.display());
    Ok(0)
}
