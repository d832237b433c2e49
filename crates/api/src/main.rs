// Tenancy API Server
// Resolves the tenant for every request from its hostname

mod config;
mod handlers;
mod middleware;
mod routes;

use clap::Parser;
use config::Config;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tenancy_database::{Database, HostnameRepository};
use tenancy_models::Hostname;
use tenancy_tenant::{BroadcastDispatcher, MemoryDirectory, Tenancy, TenantDirectory};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tower_http::trace::TraceLayer;

/// Hostname-based tenant resolution service
#[derive(Parser)]
#[command(name = "tenancy-api", about = "Resolves tenants from request hostnames")]
struct Cli {
    /// Path to the tenancy configuration file
    #[arg(short, long, env = "TENANCY_CONFIG", default_value = "tenancy.toml")]
    config: PathBuf,

    /// Serve from an in-memory hostname registry instead of Postgres
    #[arg(long, env = "TENANCY_IN_MEMORY")]
    in_memory: bool,

    /// Hostnames registered at startup in in-memory mode
    #[arg(long = "seed-hostname", requires = "in_memory")]
    seed_hostnames: Vec<String>,
}

pub struct AppState {
    pub tenancy: Tenancy,
}

/// Log every tenancy event until the dispatcher goes away
fn spawn_event_logger(dispatcher: &BroadcastDispatcher) {
    let mut events = dispatcher.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(event = event.name(), "{:?}", event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event logger lagged, {} events skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Keep cached hostnames in step with registry changes
fn spawn_cache_invalidation(repository: HostnameRepository) {
    tokio::spawn(async move {
        if let Err(e) = repository.watch_changes().await {
            tracing::error!(
                "Hostname change listener stopped, cache entries now expire by TTL only: {}",
                e
            );
        }
    });
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tenancy_api=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting Tenancy API Server");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&cli.config)?;
    tracing::info!("Server: {}", config.listen_addr());
    tracing::info!(
        "Identification: {:?} (auto: {})",
        config.tenancy.identification,
        config.tenancy.auto_identification
    );

    let mut database = None;
    let directory: Arc<dyn TenantDirectory> = if cli.in_memory {
        let memory = MemoryDirectory::new();
        for fqdn in &cli.seed_hostnames {
            memory.insert_hostname(Hostname::new(fqdn.as_str())).await;
        }
        tracing::info!("Using in-memory registry ({} hostnames)", cli.seed_hostnames.len());
        Arc::new(memory)
    } else {
        tracing::info!("Connecting to database...");
        let db = Database::new(config.database.clone()).await?;
        db.ping().await?;
        tracing::info!("Database connected");

        let repository = HostnameRepository::new(db.pool().clone(), config.hostname_cache.clone());
        if config.hostname_cache.enabled {
            spawn_cache_invalidation(repository.clone());
        }
        database = Some(db);
        Arc::new(repository)
    };

    let dispatcher = BroadcastDispatcher::default();
    spawn_event_logger(&dispatcher);

    let tenancy = Tenancy::new(config.tenancy.clone(), directory, Arc::new(dispatcher));
    if !tenancy.installed() {
        tracing::warn!(
            "Tenancy marker not found under {:?}, automatic identification is off",
            config.tenancy.base_path
        );
    }

    let state = Arc::new(AppState { tenancy });
    let app = routes::create_router(state).layer(TraceLayer::new_for_http());

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server ready at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(database) = database {
        database.close().await;
        tracing::info!("Database pool closed");
    }

    Ok(())
}
