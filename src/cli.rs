use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kirha-mcp-install")]
#[command(version, about = "Download and verify the kirha-mcp-installer binary for this platform")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Skip SHA-256 verification (same as VERIFY_CHECKSUM=false)
    #[arg(long, global = true)]
    pub no_verify: bool,

    /// Sub‑commands (install if omitted)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
    /// Install the binary unless it is already present (default)
    Install,
    /// Show platform, binary path and install manifest (Exit 0 = installed, 1 = missing)
    Status,
    /// Remove cached release metadata
    CleanCache,
}

impl Args {
    pub fn command(&self) -> Cmd {
        self.sub.unwrap_or(Cmd::Install)
    }
}
