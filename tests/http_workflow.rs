//! HTTP-level walkthrough of the assembled application: a creator registers, an admin opens a
//! single-unit campaign, and the last unit goes to whoever is approved first.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use campaign_desk::workflows::campaigns::{CampaignService, MemoryStore};
use campaign_desk_api::{build_app, AppState, OutboxNotifier};
use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Router, OutboxNotifier) {
    let notifier = OutboxNotifier::default();
    let service = Arc::new(CampaignService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(notifier.clone()),
    ));
    let state = AppState {
        readiness: Arc::new(AtomicBool::new(true)),
        metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
    };
    (build_app(service, state), notifier)
}

async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    actor: (&str, &str),
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-actor-id", actor.0)
        .header("x-actor-role", actor.1);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn profile(handle: &str) -> Value {
    json!({
        "display_name": handle,
        "email": format!("{handle}@example.com"),
        "instagram_handle": format!("@{handle}"),
        "shipping_address": "12 Harbour Road, Bristol",
    })
}

const ADMIN: (&str, &str) = ("ops", "admin");

#[tokio::test]
async fn last_unit_goes_to_the_first_approval() {
    let (router, notifier) = app();

    for handle in ["ivy", "jun"] {
        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/creators",
            (handle, "creator"),
            Some(json!({ "creator_id": handle, "profile": profile(handle) })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["score"], 50);
        assert_eq!(body["tier"], "starting");
    }

    let (status, campaign) = call(
        &router,
        "POST",
        "/api/v1/campaigns",
        ADMIN,
        Some(json!({
            "title": "Night cream seeding",
            "campaign_type": "gifted",
            "inventory": 1,
            "application_deadline": (Utc::now() + Duration::days(5)).to_rfc3339(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(campaign["status"], "draft");
    let campaign_id = campaign["id"].as_str().expect("campaign id").to_string();

    let (status, _) = call(
        &router,
        "POST",
        &format!("/api/v1/campaigns/{campaign_id}/status"),
        ADMIN,
        Some(json!({ "status": "active" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut applications = Vec::new();
    for handle in ["ivy", "jun"] {
        let (status, application) = call(
            &router,
            "POST",
            &format!("/api/v1/campaigns/{campaign_id}/applications"),
            (handle, "creator"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(application["status"], "pending");
        applications.push(application["id"].as_str().expect("id").to_string());
    }

    let (status, approved) = call(
        &router,
        "POST",
        &format!("/api/v1/applications/{}/approve", applications[0]),
        ADMIN,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, _) = call(
        &router,
        "POST",
        &format!("/api/v1/applications/{}/approve", applications[1]),
        ADMIN,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, campaign) = call(
        &router,
        "GET",
        &format!("/api/v1/campaigns/{campaign_id}"),
        ("jun", "creator"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(campaign["approved_count"], 1);
    assert_eq!(campaign["status"], "full");

    let (status, _) = call(
        &router,
        "GET",
        &format!("/api/v1/applications/{}", applications[0]),
        ("jun", "creator"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &router,
        "DELETE",
        &format!("/api/v1/applications/{}", applications[1]),
        ("jun", "creator"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let queued = notifier.drain();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].recipient.as_str(), "ivy");
}

#[tokio::test]
async fn admin_penalties_restrict_and_unlock_over_http() {
    let (router, _) = app();
    call(
        &router,
        "POST",
        "/api/v1/creators",
        ADMIN,
        Some(json!({ "creator_id": "kai", "profile": profile("kai") })),
    )
    .await;

    let (status, creator) = call(
        &router,
        "POST",
        "/api/v1/creators/kai/penalty",
        ADMIN,
        Some(json!({ "delta": 5, "display_reason": "no-show at launch event" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(creator["restricted"], true);

    let (status, _) = call(
        &router,
        "POST",
        "/api/v1/creators/kai/unlock",
        ("kai", "creator"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, creator) = call(&router, "POST", "/api/v1/creators/kai/unlock", ADMIN, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(creator["restricted"], false);
    assert_eq!(creator["penalty"], 0);

    let (status, ledger) = call(&router, "GET", "/api/v1/creators/kai/ledger", ("kai", "creator"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger.as_array().map(Vec::len), Some(3));
}
