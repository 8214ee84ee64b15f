//! entity-repository - Main entry point.
//!
//! Runs one employee operation against the configured database and prints
//! the result as JSON on stdout. Logs go to stderr.

use entity_repository::cli;
use entity_repository::config::Config;
use entity_repository::db::SqlxProvider;
use entity_repository::employees::EmployeeService;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();
    init_tracing(&config);

    let db_config = config.database_config()?;
    info!(
        db_type = %db_config.db_type,
        "Starting entity-repository v{}",
        env!("CARGO_PKG_VERSION")
    );

    let provider = SqlxProvider::connect(&db_config, config.query_timeout_duration()).await?;
    let pool = provider.pool().clone();
    let service = EmployeeService::from_provider(Arc::new(provider))?;

    let result = cli::run(&config.command, &service).await;
    pool.close().await;

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
            Err(e.into())
        }
    }
}
