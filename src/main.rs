use std::{io, sync::Arc};

use colored::Colorize;
use gala_collab::{DatabaseError, Gala};
use gala_core::Config;
use gala_server::{run_server, ConfigError, ServerConfig};
use log::{error, info};
use thiserror::Error;
use tokio::runtime;

mod logging;

#[derive(Debug, Error)]
enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not open the database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not build the async runtime: {0}")]
    Runtime(io::Error),

    #[error("Server stopped unexpectedly: {0}")]
    Server(io::Error),
}

impl StartupError {
    fn hint(&self) -> &'static str {
        match self {
            StartupError::Config(_) => "Check the GALA_SERVER_PORT, GALA_DATABASE_URL and GALA_ALLOWED_ORIGIN environment variables.",
            StartupError::Database(_) => "This is a database error. Make sure GALA_DATABASE_URL points to a writable SQLite file, then try again.",
            StartupError::Runtime(_) => "This error is fatal, and should not happen.",
            StartupError::Server(_) => "Make sure nothing else is listening on GALA_SERVER_PORT.",
        }
    }
}

fn start() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;

    info!("Building async runtime...");
    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("gala-async")
        .build()
        .map_err(StartupError::Runtime)?;

    runtime.block_on(async {
        info!("Opening database at {}...", config.database_url);
        let gala = Gala::connect(&config.database_url, Config::default()).await?;

        info!("Initialized successfully.");
        run_server(Arc::new(gala), &config)
            .await
            .map_err(StartupError::Server)
    })
}

fn main() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Logging is unavailable: {e}");
    }

    if let Err(error) = start() {
        error!(
            "{} Read the error below to troubleshoot the issue.",
            "gala failed to start!".bold().red()
        );
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());

        std::process::exit(1);
    }
}
