//! Tradex - simulated trading ledger service
//! Serves the user, wallet, trade and admin API over the key-value store.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, time::interval};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradex_backend::{
    api::{create_router, AppState},
    auth::AdminToken,
    clock::{SharedClock, SystemClock},
    config::{AppConfig, StoreBackend},
    service::LedgerService,
    store::{MemoryKvStore, SharedStore, SqliteKvStore},
};

const KV_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser, Debug)]
#[command(name = "tradex")]
#[command(about = "Simulated trading ledger with approval workflow")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "TRADEX_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }

    info!("Tradex ledger starting");

    let clock: SharedClock = Arc::new(SystemClock);
    let store: SharedStore = match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store; all data is lost on restart");
            Arc::new(MemoryKvStore::new(clock.clone()))
        }
        StoreBackend::Sqlite => {
            let kv = Arc::new(
                SqliteKvStore::new(&config.store.sqlite_path, clock.clone())
                    .context("Failed to open SQLite store")?,
            );
            info!("KV store initialized at: {}", config.store.sqlite_path);
            tokio::spawn(kv_pruning_polling(kv.clone()));
            kv as SharedStore
        }
    };

    let admin_token = AdminToken::new(&config.admin.token);
    if !admin_token.is_configured() {
        warn!("TRADEX_ADMIN_TOKEN not set - admin routes will reject every request");
    }

    let service = Arc::new(LedgerService::new(store, clock, &config));
    let app = create_router(AppState { service }, admin_token, config.rate_limits.ip);

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("API server listening on {}", config.server.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Tradex ledger stopped");
    Ok(())
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradex_backend=info,tradex=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root .env when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

/// Periodically drop expired rate-limit counters from the SQLite store.
async fn kv_pruning_polling(store: Arc<SqliteKvStore>) {
    let mut ticker = interval(KV_PRUNE_INTERVAL);
    loop {
        ticker.tick().await;
        match store.purge_expired().await {
            Ok(0) => {}
            Ok(n) => info!(purged = n, "Pruned expired KV entries"),
            Err(e) => warn!(error = %e, "KV pruning failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
