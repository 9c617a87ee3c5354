use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::forecast::{FunnelCounts, FunnelForecast};
use crate::models::*;
use crate::reporting::{self, Dashboard, FunnelReport};
use crate::store::PipelineStore;
use crate::sweep::{self, SweepReport};
use crate::validation;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Contact/follow-up persistence.
    pub store: Arc<dyn PipelineStore>,
    /// Application configuration.
    pub config: Config,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-followup-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "running" }))
}

// ============ Contacts ============

/// POST /contacts
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<Contact>, AppError> {
    let new_contact = validation::validate_new_contact(&payload, sweep::today())?;
    let contact = state.store.create_contact(new_contact).await?;
    Ok(Json(contact))
}

/// GET /contacts
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Contact>>, AppError> {
    Ok(Json(state.store.list_contacts().await?))
}

/// GET /contacts/:id
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Contact>, AppError> {
    Ok(Json(state.store.get_contact(id).await?))
}

/// PATCH /contacts/:id
///
/// `next_followup` cannot be set here; it is derived from the follow-ups.
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<Contact>, AppError> {
    let update = validation::validate_contact_update(&payload)?;
    let contact = state
        .store
        .update_contact(id, update)
        .await
        .with_context(|| format!("updating contact {}", id))?;
    Ok(Json(contact))
}

/// DELETE /contacts/:id
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.delete_contact(id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// GET /contacts/:id/followups
pub async fn contact_followups(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Followup>>, AppError> {
    Ok(Json(state.store.followups_for_contact(id).await?))
}

// ============ Dashboard ============

/// GET /dashboard
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Dashboard>, AppError> {
    let contacts = state.store.list_contacts().await?;
    Ok(Json(reporting::build_dashboard(&contacts)))
}

// ============ Follow-ups ============

/// GET /followups?include_completed=bool
pub async fn list_followups(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FollowupListParams>,
) -> Result<Json<Vec<FollowupView>>, AppError> {
    let rows = state.store.list_followups(params.include_completed).await?;
    tracing::debug!(
        "GET /followups include_completed={} -> {} rows",
        params.include_completed,
        rows.len()
    );
    Ok(Json(rows))
}

/// POST /followups
pub async fn create_followup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FollowupPayload>,
) -> Result<Json<Followup>, AppError> {
    let followup_date = validation::parse_date("followup_date", &payload.followup_date)?;
    let followup = state
        .store
        .create_followup(payload.contact_id, followup_date, sweep::today())
        .await?;
    Ok(Json(followup))
}

/// PATCH /followups/:id/complete
pub async fn complete_followup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Followup>, AppError> {
    let followup = state
        .store
        .set_status(id, FollowupStatus::Completed, sweep::today())
        .await?;
    Ok(Json(followup))
}

/// PATCH /followups/:id/status
pub async fn update_followup_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Followup>, AppError> {
    let status = validation::parse_status(&payload.status)?;
    let followup = state.store.set_status(id, status, sweep::today()).await?;
    Ok(Json(followup))
}

/// DELETE /followups/:id
///
/// Succeeds even when the follow-up is already gone.
pub async fn delete_followup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.delete_followup(id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// POST /followups/recompute
///
/// Runs the daily sweep immediately.
pub async fn recompute_followups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepReport>, AppError> {
    let report = sweep::run_sweep(
        state.store.as_ref(),
        sweep::today(),
        state.config.sweep_repair,
    )
    .await?;
    Ok(Json(report))
}

// ============ Metrics & Forecast ============

/// GET /metrics
pub async fn list_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Metric>>, AppError> {
    Ok(Json(state.store.list_metrics().await?))
}

/// POST /metrics
pub async fn create_metric(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MetricPayload>,
) -> Result<Json<Metric>, AppError> {
    let metric = validation::validate_metric(&payload)?;
    Ok(Json(state.store.record_metric(metric).await?))
}

/// GET /forecast?week=YYYY-MM-DD
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastParams>,
) -> Result<Json<FunnelReport>, AppError> {
    let week = params
        .week
        .as_deref()
        .map(|raw| validation::parse_date("week", raw))
        .transpose()?;
    let metrics = state.store.list_metrics().await?;
    Ok(Json(reporting::funnel_report(&metrics, week)))
}

/// POST /forecast
pub async fn post_forecast(Json(counts): Json<FunnelCounts>) -> Result<Json<FunnelForecast>, AppError> {
    if counts.contacts_added < 0 || counts.responses < 0 || counts.interviews < 0 || counts.offers < 0
    {
        return Err(AppError::InvalidInput(
            "Funnel counters cannot be negative.".to_string(),
        ));
    }
    Ok(Json(counts.forecast()))
}
