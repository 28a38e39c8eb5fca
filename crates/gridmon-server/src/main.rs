use anyhow::Result;
use chrono::Utc;
use gridmon_common::types::Connection;
use gridmon_server::app;
use gridmon_server::config::{ConnectionsSeedFile, ServerConfig};
use gridmon_server::state::{build_generator, build_predictor, AppState};
use gridmon_storage::engine::SqliteStorageEngine;
use gridmon_storage::StorageEngine;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  gridmon-server [config.toml]                                Start the server");
    eprintln!("  gridmon-server init-connections <config.toml> <seed.json>   Register grid connections from seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    gridmon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gridmon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-connections") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-connections requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-connections requires <seed.json> argument")
            })?;
            run_init_connections(config_path, seed_path)
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

fn load_config(config_path: &str) -> Result<ServerConfig> {
    if Path::new(config_path).exists() {
        ServerConfig::load(config_path)
    } else {
        tracing::warn!(
            path = %config_path,
            "Config file not found, using built-in defaults"
        );
        Ok(ServerConfig::default())
    }
}

/// Register grid connections from a JSON seed file, skipping names that
/// already exist.
fn run_init_connections(config_path: &str, seed_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let storage = SqliteStorageEngine::open(Path::new(&config.db_path))?;

    let seed_content = std::fs::read_to_string(seed_path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", seed_path, e))?;
    let seed: ConnectionsSeedFile = serde_json::from_str(&seed_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", seed_path, e))?;

    let existing_names: std::collections::HashSet<String> = storage
        .list_connections()?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let mut created = 0u32;
    let mut skipped = 0u32;

    for seed_connection in &seed.connections {
        if existing_names.contains(&seed_connection.name) {
            tracing::warn!(name = %seed_connection.name, "Connection already exists, skipping");
            skipped += 1;
            continue;
        }

        let now = Utc::now();
        let connection = Connection {
            id: gridmon_common::id::next_id(),
            name: seed_connection.name.clone(),
            connection_type: seed_connection.connection_type,
            nominal_voltage: seed_connection.nominal_voltage,
            status: seed_connection.status,
            created_at: now,
            updated_at: now,
        };

        match storage.insert_connection(&connection) {
            Ok(()) => {
                tracing::info!(
                    name = %connection.name,
                    id = %connection.id,
                    "Connection registered"
                );
                created += 1;
            }
            Err(e) => {
                tracing::error!(
                    name = %connection.name,
                    error = %e,
                    "Failed to register connection"
                );
            }
        }
    }

    tracing::info!(created, skipped, "init-connections completed");
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        db_path = %config.db_path,
        "gridmon-server starting"
    );

    let storage = Arc::new(SqliteStorageEngine::open(Path::new(&config.db_path))?);
    let predictor = build_predictor(&config)?;
    let generator = Arc::new(build_generator(&config));

    let state = AppState {
        storage,
        predictor,
        generator,
        config: Arc::new(config.clone()),
        start_time: Utc::now(),
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(http = %http_addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
