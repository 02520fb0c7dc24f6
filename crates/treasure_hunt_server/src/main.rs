//! Treasure hunt - game server and admin CLI.

#![warn(missing_docs)]

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;
use treasure_hunt_server::{
    AppState, HuntRepository, HuntService, ServerConfig, router, settings_overrides,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,treasure_hunt=debug,treasure_hunt_server=debug")
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(Some(cli.config.as_path()))?
        .apply_env(|key| std::env::var(key).ok())?
        .with_data_dir(cli.data_dir);

    match cli.command {
        Command::Serve { host, port } => serve(config.with_bind(host, port)).await,
        Command::Export { output } => export(&config, output.as_deref()),
        Command::Import { file } => import(&config, &file),
        Command::Reset => reset(&config),
    }
}

/// Opens the database under the configured data directory.
#[instrument(skip(config), fields(data_dir = %config.data_dir().display()))]
fn open_service(config: &ServerConfig) -> Result<HuntService> {
    std::fs::create_dir_all(config.data_dir()).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir().display()
        )
    })?;
    let repository = HuntRepository::new(config.database_path().to_string_lossy().into_owned())?;
    let service = HuntService::open(repository, settings_overrides(|key| std::env::var(key).ok()))?;
    Ok(service)
}

/// Runs the HTTP server until interrupted.
async fn serve(config: ServerConfig) -> Result<()> {
    let service = open_service(&config)?;
    info!(settings = ?service.settings(), "Game settings in force");
    let app = router(AppState::new(service, &config)?);

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port()))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host(), config.port()))?;
    info!(host = %config.host(), port = config.port(), "Server ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown requested");
        })
        .await?;
    Ok(())
}

/// Writes the export document to a file or stdout.
fn export(config: &ServerConfig, output: Option<&Path>) -> Result<()> {
    let json = open_service(config)?.export()?.to_json()?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Export written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Replaces clues and settings from a file.
fn import(config: &ServerConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let imported = open_service(config)?.import_json(&json)?;
    info!(imported, "Import applied");
    Ok(())
}

/// Deletes all team progress.
fn reset(config: &ServerConfig) -> Result<()> {
    let removed = open_service(config)?.reset()?;
    info!(removed, "Team progress cleared");
    Ok(())
}
