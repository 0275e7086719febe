mod api;
mod cleaner;
mod clients;
mod config;
mod error;
mod models;
mod registry;
mod scheduler;
mod server;
mod store;
mod synchronizer;

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use clients::Clients;
use config::NotValidatedConfig;
use scheduler::Scheduler;
use server::state::ServerState;
use server::web::Server;
use store::Store;
use synchronizer::stream::StreamSynchronizer;
use synchronizer::Synchronizer;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Schedules and executes deferred broadcast operations.
#[derive(Debug, Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "SCHEDULER_CONFIG", default_value = "scheduler.toml")]
    config: PathBuf,
}

async fn load_config(path: &PathBuf) -> anyhow::Result<config::Config> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(contents) => toml::from_str::<NotValidatedConfig>(&contents)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => NotValidatedConfig::default(),
        Err(err) => return Err(err.into()),
    };
    raw.validate()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;
    tracing::info!(
        version = built_info::PKG_VERSION,
        profile = built_info::PROFILE,
        config = %cli.config.display(),
        "starting"
    );

    let clients = Clients::new(&config);

    let conditions = registry::conditions::build();
    let cleaning_strategies = registry::cleaning::build();
    let operations = registry::operations::build(&config, clients.clone());

    let store = Store::new(config.store.path.clone());
    let scheduler = Scheduler::restore(store, conditions, operations, cleaning_strategies).await?;

    let shutdown = CancellationToken::new();

    let cleaner_handle = tokio::spawn(cleaner::run(scheduler.clone(), config.cleaner.clone(), shutdown.child_token()));

    let synchronizers: Vec<Box<dyn Synchronizer>> = vec![Box::new(StreamSynchronizer::new(
        scheduler.clone(),
        clients.clone(),
        config.synchronizer.synchronizers.stream.window,
    ))];
    let synchronizer_handle =
        tokio::spawn(synchronizer::run(synchronizers, config.synchronizer.clone(), shutdown.child_token()));

    let state = ServerState { scheduler: scheduler.clone() };
    let server_result = Server::new(config.server.clone()).run(state, shutdown.child_token()).await;

    // The server only returns once a shutdown signal has fired (or it
    // failed to bind); either way, wind the rest of the process down.
    shutdown.cancel();
    scheduler.shutdown();
    let _ = tokio::join!(cleaner_handle, synchronizer_handle);

    server_result
}
