use std::path::{Path, PathBuf};
use std::sync::Arc;

use chat_relay::api;
use chat_relay::common::SystemClock;
use chat_relay::config::{self, AppConfig};
use chat_relay::presence::Janitor;
use chat_relay::service::ChatService;
use chat_relay::storage::ensure_data_dir;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "chat_relay",
    version,
    about = "Chat presence and message-relay server"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Address to listen on, overrides the config file
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,
    /// SQLite database file, overrides the config file
    #[arg(long, value_name = "FILE")]
    database: Option<String>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Write the effective configuration to the config file and exit
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = resolve_config(&cli);

    if cli.mode == Some(Mode::InitConfig) {
        app_config.save(Path::new(&cli.config))?;
        log::info!("Wrote configuration to {}", cli.config);
        return Ok(());
    }

    run_server(app_config).await
}

fn resolve_config(cli: &Cli) -> AppConfig {
    let mut app_config = AppConfig::load(Path::new(&cli.config));
    app_config.apply_env();
    if let Some(listen) = &cli.listen {
        app_config.listen_addr = listen.clone();
    }
    if let Some(database) = &cli.database {
        app_config.database_path = Some(database.clone());
    }
    app_config
}

async fn run_server(app_config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = app_config.database_path.as_ref().map(PathBuf::from);
    if let Some(path) = &db_path {
        ensure_data_dir(path)?;
    }

    let service = Arc::new(ChatService::open(db_path.as_deref(), Arc::new(SystemClock))?);
    let shutdown = CancellationToken::new();

    let janitor = Janitor::new(
        service.clone(),
        app_config.sweep_interval(),
        app_config.stale_after(),
    )
    .spawn(shutdown.child_token());

    let listener = TcpListener::bind(&app_config.listen_addr).await?;
    let server = tokio::spawn(api::serve(listener, service.clone(), shutdown.clone()));

    match signal::ctrl_c().await {
        Ok(()) => log::info!("Received shutdown signal, stopping chat server..."),
        Err(err) => log::error!("Unable to listen for shutdown signal: {err}"),
    }
    shutdown.cancel();

    if let Err(err) = janitor.await {
        log::error!("Janitor task ended abnormally: {err}");
    }
    match server.await {
        Ok(Err(err)) => log::error!("HTTP server error: {err}"),
        Err(err) => log::error!("HTTP server task ended abnormally: {err}"),
        Ok(Ok(())) => {}
    }

    log::info!(
        "Final statistics: {} participants online",
        service.participants().await.map(|p| p.len()).unwrap_or(0)
    );
    Ok(())
}
