//! NetDoc Control - network health diagnostics and Auto-Fix

use anyhow::{Context, Result};
use clap::Parser;
use netdoc_common::NetDocConfig;
use netdocctl::cli::{Cli, Commands};
use netdocctl::menu::run_menu;
use netdocctl::output::{display_fix, display_run, display_success};
use netdocctl::session::Session;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = NetDocConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Run {
            profile,
            domain,
            concurrent,
            fix,
            dry_run,
            html,
            json,
        } => {
            config.runner.concurrent |= concurrent;
            config.remediation.dry_run |= dry_run;
            let mut session = Session::new(config)?;

            let run = session.run_test(profile, domain.as_deref()).await?;
            display_run(run);
            let all_passed = run.results().iter().all(|r| r.success());

            if fix && !all_passed {
                let report = session.auto_fix().await;
                display_fix(&report.decision, &report.outcomes);
            }
            if let Some(path) = html {
                let path = session.export_html(Some(path.as_path()))?;
                display_success(&format!("HTML report written to {}", path.display()));
            }
            if let Some(path) = json {
                session.export_json(&path)?;
                display_success(&format!("JSON report written to {}", path.display()));
            }

            Ok(if all_passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Menu => {
            let mut session = Session::new(config)?;
            run_menu(&mut session).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            println!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
