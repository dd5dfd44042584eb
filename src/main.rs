use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use herd::cli::{Cli, Commands};
use herd::config::{self, AppConfig};
use herd::registry::Registry;
use herd::report;
use herd::supervisor::Supervisor;
use herd::supervisor::lifecycle::cancel_on_interrupt;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli)?;
    tracing::info!(root = %config.root.display(), services = config.services.len(), "Config loaded");

    let registry = Registry::from_config(&config)?;

    match cli.command {
        Commands::Up { .. } => run_up(&config, &registry).await,
        Commands::List { json, .. } => {
            if json {
                println!("{}", registry.to_json()?);
            } else {
                print!("{}", report::registry_table(&registry));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_up(config: &AppConfig, registry: &Registry) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());
    let supervisor = Supervisor::new(config, cancel)?;

    println!("Starting {} services...", registry.len());
    println!("{}", report::rule('='));

    let ready = match supervisor.start_all(registry).await {
        Ok(ready) => ready,
        Err(failure) => {
            println!("\n{}", report::rule('='));
            eprintln!("{}", report::startup_failure_summary(&failure));
            return Ok(ExitCode::from(report::startup_exit_code(&failure)));
        }
    };

    println!("\n{}", report::rule('='));
    println!("{}", report::ready_summary(&ready));

    let result = supervisor.supervise(ready).await;
    match &result {
        Ok(teardown) => {
            println!("\nStopping services...");
            println!("{}", report::teardown_summary(teardown));
            println!("Services stopped.");
        }
        Err(failure) => eprintln!("{}", report::shutdown_failure_summary(failure)),
    }
    Ok(ExitCode::from(report::shutdown_exit_code(&result)))
}
