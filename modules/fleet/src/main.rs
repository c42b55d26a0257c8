use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fleet_rs::{
    config::{Config, StoreType},
    db,
    fleet_router,
    metrics::Metrics,
    notify::Notifier,
    services::{FleetContext, LedgerSettings},
    start_maintenance_alert_scheduler,
    store::{FleetStore, InMemoryStore, PgStore},
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting fleet service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        host = %config.host,
        port = config.port,
        store_type = ?config.store_type,
        "Configuration loaded"
    );

    let store: Arc<dyn FleetStore> = match config.store_type {
        StoreType::InMemory => {
            tracing::info!("Using in-memory store");
            Arc::new(InMemoryStore::new())
        }
        StoreType::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL is required for the postgres store");
            tracing::info!("Connecting to database and running migrations...");
            let pool = db::connect_and_migrate(url)
                .await
                .expect("Failed to prepare database");
            Arc::new(PgStore::new(pool))
        }
    };

    let metrics = Arc::new(Metrics::new().expect("Failed to register metrics"));

    let ctx = FleetContext {
        store,
        notifier: Arc::new(Notifier::from_config(&config)),
        settings: LedgerSettings::from_config(&config),
        metrics,
    };

    start_maintenance_alert_scheduler(
        ctx.clone(),
        Duration::from_secs(config.maintenance_alert_interval_secs),
    );

    let app = fleet_router(ctx)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(%addr, "Fleet service listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
