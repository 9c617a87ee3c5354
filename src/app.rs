//! Router assembly shared by the server binary and the HTTP tests.

use axum::{
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::handlers::{self, AppState};

/// API routes, without state or outer layers.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Contacts
        .route(
            "/contacts",
            post(handlers::create_contact).get(handlers::list_contacts),
        )
        .route(
            "/contacts/:id",
            get(handlers::get_contact)
                .patch(handlers::update_contact)
                .delete(handlers::delete_contact),
        )
        .route("/contacts/:id/followups", get(handlers::contact_followups))
        .route("/dashboard", get(handlers::dashboard))
        // Follow-ups
        .route(
            "/followups",
            get(handlers::list_followups).post(handlers::create_followup),
        )
        .route("/followups/recompute", post(handlers::recompute_followups))
        .route("/followups/:id", axum::routing::delete(handlers::delete_followup))
        .route("/followups/:id/complete", patch(handlers::complete_followup))
        .route("/followups/:id/status", patch(handlers::update_followup_status))
        // Funnel metrics
        .route(
            "/metrics",
            get(handlers::list_metrics).post(handlers::create_metric),
        )
        .route(
            "/forecast",
            get(handlers::get_forecast).post(handlers::post_forecast),
        )
}

/// CORS for the configured frontend origin, or permissive when none is set.
pub fn cors_layer(config: &Config) -> CorsLayer {
    match config
        .cors_allowed_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request()),
        None => CorsLayer::permissive(),
    }
}

/// Final app: health routes (never rate limited) merged with `api`.
pub fn build_router(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
