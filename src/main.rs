use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod db;
mod models;
mod services;
mod utils;

use config::Config;

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["chartsync=debug", "sqlx=warn"] {
        match directive.parse::<Directive>() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring log directive {}: {}", directive, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, initiating shutdown."),
        _ = terminate => info!("SIGTERM received, initiating shutdown."),
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let config = Config::parse();

    info!("📈 Starting chartsync v{}...", env!("CARGO_PKG_VERSION"));
    info!("   database: {}", config.database_url());
    info!("   charts:   {}/{{chart}}", config.chart_prefix());
    info!("   socket:   {}", api::WS_PATH);

    info!("Initializing database...");
    let pool = match db::init_db(&config.database_url(), config.max_connections).await {
        Ok(p) => {
            info!("Database initialized successfully");
            p
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    let registry = match services::Registry::load(pool.clone()).await {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to load datasets: {}", e);
            pool.close().await;
            return;
        }
    };
    info!("Loaded {} dataset(s)", registry.names().await.len());

    let store = services::DatasetStore::new(registry);
    let engine = commands::SyncEngine::new(store, config.rpc_secret.as_str());
    let app = api::router(api::AppState::new(engine), &config.chart_prefix());

    let listener = match tokio::net::TcpListener::bind(config.bind_addr()).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_addr(), e);
            pool.close().await;
            return;
        }
    };
    info!("Listening on {}", config.bind_addr());

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    pool.close().await;
    info!("Shutdown complete.");
}
