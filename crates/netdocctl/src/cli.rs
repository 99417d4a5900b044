//! Command-line surface

use clap::{Parser, Subcommand};
use netdoc_common::TestProfile;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netdocctl")]
#[command(about = "NetDoc - network health diagnostics and Auto-Fix", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: /etc/netdoc/config.toml, then ~/.config/netdoc/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a diagnostic test
    Run {
        /// Test profile: full or basic
        #[arg(long, default_value = "full")]
        profile: TestProfile,

        /// Domain for the DNS and web probes (default: google.com)
        #[arg(long)]
        domain: Option<String>,

        /// Run probes concurrently
        #[arg(long)]
        concurrent: bool,

        /// Apply Auto-Fix when probes fail
        #[arg(long)]
        fix: bool,

        /// Show remediation commands without running them
        #[arg(long)]
        dry_run: bool,

        /// Write an HTML report
        #[arg(long)]
        html: Option<PathBuf>,

        /// Write a JSON report
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Interactive menu (default)
    Menu,

    /// Print the effective configuration
    Config,
}
