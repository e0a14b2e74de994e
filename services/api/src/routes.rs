use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use campaign_desk::workflows::campaigns::{campaign_router, CampaignService, CampaignStore, Notifier};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_campaign_routes<S, N>(service: Arc<CampaignService<S, N>>) -> Router
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    campaign_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

/// Assembles the public HTTP surface around a campaign service.
pub fn build_app<S, N>(service: Arc<CampaignService<S, N>>, state: AppState) -> Router
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    with_campaign_routes(service).layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
