use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_followup_api::app;
use rust_followup_api::config::{Config, StoreBackend};
use rust_followup_api::data::db::Database;
use rust_followup_api::data::db_storage::PgPipelineStore;
use rust_followup_api::data::memory_store::InMemoryPipelineStore;
use rust_followup_api::handlers::AppState;
use rust_followup_api::store::PipelineStore;
use rust_followup_api::sweep;

/// Main entry point for the application.
///
/// Initializes tracing, configuration and the store, schedules the daily
/// follow-up sweep, then serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_followup_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the store
    let store: Arc<dyn PipelineStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL required for postgres backend"))?;
            let db = Database::new(url, config.db_max_connections).await?;
            db.ensure_schema().await?;
            tracing::info!("Database connection pool established");
            Arc::new(PgPipelineStore::new(db.pool.clone()))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(InMemoryPipelineStore::new())
        }
    };

    // Daily sweep recalculating urgency for pending follow-ups
    let scheduler = if config.sweep_enabled {
        let sched = sweep::build_scheduler(store.clone(), &config.sweep_cron, config.sweep_repair)
            .await?;
        sched.start().await?;
        Some(sched)
    } else {
        tracing::info!("Follow-up sweep scheduler disabled");
        None
    };

    let app_state = Arc::new(AppState {
        store,
        config: config.clone(),
    });

    // Configure rate limiter: per-IP budget from config
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let api = app::api_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 1MB max payload
            .layer(RequestBodyLimitLayer::new(1024 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    let app = app::build_router(app_state, api);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    if let Some(mut sched) = scheduler {
        sched.shutdown().await?;
    }

    Ok(())
}
