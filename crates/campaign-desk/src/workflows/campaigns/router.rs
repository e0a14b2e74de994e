use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::domain::{
    Actor, ActorRole, AdminId, ApplicationId, CampaignId, CampaignStatus, Creator, CreatorId,
    CreatorProfile, ShipmentDetails,
};
use super::repository::{CampaignStore, Notifier};
use super::service::{AccountFlags, CampaignError, CampaignService, ErrorClass, NewCampaign};
use super::tier::Tier;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

type SharedService<S, N> = Arc<CampaignService<S, N>>;

/// Router builder exposing the creator, campaign, and application endpoints.
pub fn campaign_router<S, N>(service: SharedService<S, N>) -> Router
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/creators", post(register_creator_handler::<S, N>))
        .route("/api/v1/creators/:creator_id", get(creator_handler::<S, N>))
        .route(
            "/api/v1/creators/:creator_id/ledger",
            get(ledger_handler::<S, N>),
        )
        .route(
            "/api/v1/creators/:creator_id/applications",
            get(creator_applications_handler::<S, N>),
        )
        .route(
            "/api/v1/creators/:creator_id/score",
            post(adjust_score_handler::<S, N>),
        )
        .route(
            "/api/v1/creators/:creator_id/penalty",
            post(add_penalty_handler::<S, N>),
        )
        .route(
            "/api/v1/creators/:creator_id/unlock",
            post(unlock_handler::<S, N>),
        )
        .route(
            "/api/v1/creators/:creator_id/account",
            post(account_flags_handler::<S, N>),
        )
        .route(
            "/api/v1/creators/:creator_id/tier-upgrade/ack",
            post(acknowledge_tier_handler::<S, N>),
        )
        .route("/api/v1/campaigns", post(create_campaign_handler::<S, N>))
        .route("/api/v1/campaigns/:campaign_id", get(campaign_handler::<S, N>))
        .route(
            "/api/v1/campaigns/:campaign_id/status",
            post(campaign_status_handler::<S, N>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/reconcile",
            post(reconcile_handler::<S, N>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/applications",
            post(apply_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<S, N>).delete(cancel_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/:action",
            post(application_action_handler::<S, N>),
        )
        .with_state(service)
}

/// Creator record plus the derived tier.
#[derive(Debug, Serialize)]
pub struct CreatorView {
    #[serde(flatten)]
    pub creator: Creator,
    pub tier: Tier,
}

impl From<Creator> for CreatorView {
    fn from(creator: Creator) -> Self {
        let tier = creator.tier();
        Self { creator, tier }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterCreatorRequest {
    pub creator_id: CreatorId,
    pub profile: CreatorProfile,
}

#[derive(Debug, Deserialize)]
pub struct LedgerAdjustmentRequest {
    pub delta: i32,
    #[serde(default)]
    pub display_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CampaignStatusRequest {
    pub status: CampaignStatus,
}

/// Optional body accepted by the application action endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ApplicationActionRequest {
    #[serde(default)]
    pub points: Option<i32>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// An empty body means "no options"; anything else must be a valid request object.
fn parse_action_body(body: &[u8]) -> Result<ApplicationActionRequest, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApplicationActionRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        error_payload(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("invalid action body: {err}"),
        )
    })
}

fn error_payload(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn error_response(err: CampaignError) -> Response {
    let class = err.class();
    if class == ErrorClass::Internal {
        error!(error = %err, "campaign operation failed");
    }
    error_payload(class.status_code(), err.to_string())
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, CampaignError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let role = headers
        .get(ACTOR_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase());

    let role = match role.as_deref() {
        Some("admin") => ActorRole::Admin,
        Some("creator") => ActorRole::Creator,
        _ => {
            return Err(error_payload(
                StatusCode::UNAUTHORIZED,
                "missing or unknown actor role".to_string(),
            ))
        }
    };

    match id {
        Some(id) => Ok(Actor {
            id: id.to_string(),
            role,
        }),
        None => Err(error_payload(
            StatusCode::UNAUTHORIZED,
            "missing actor id".to_string(),
        )),
    }
}

fn require_admin(headers: &HeaderMap) -> Result<AdminId, Response> {
    let actor = actor_from_headers(headers)?;
    actor
        .as_admin()
        .ok_or_else(|| error_response(CampaignError::Forbidden))
}

fn require_creator(headers: &HeaderMap) -> Result<CreatorId, Response> {
    let actor = actor_from_headers(headers)?;
    actor
        .as_creator()
        .ok_or_else(|| error_response(CampaignError::Forbidden))
}

/// Admins may act on any creator; creators only on themselves.
fn require_self_or_admin(headers: &HeaderMap, creator_id: &CreatorId) -> Result<Actor, Response> {
    let actor = actor_from_headers(headers)?;
    if actor.is_admin() || actor.id == creator_id.0 {
        Ok(actor)
    } else {
        Err(error_response(CampaignError::Forbidden))
    }
}

pub(crate) async fn register_creator_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Json(request): Json<RegisterCreatorRequest>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    if let Err(response) = require_self_or_admin(&headers, &request.creator_id) {
        return response;
    }
    let result = service
        .register_creator(request.creator_id, request.profile)
        .await
        .map(CreatorView::from);
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn creator_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(creator_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let creator_id = CreatorId(creator_id);
    if let Err(response) = require_self_or_admin(&headers, &creator_id) {
        return response;
    }
    let result = service.creator(&creator_id).await.map(CreatorView::from);
    respond(StatusCode::OK, result)
}

pub(crate) async fn ledger_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(creator_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let creator_id = CreatorId(creator_id);
    if let Err(response) = require_self_or_admin(&headers, &creator_id) {
        return response;
    }
    respond(StatusCode::OK, service.ledger_history(&creator_id).await)
}

pub(crate) async fn creator_applications_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(creator_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let creator_id = CreatorId(creator_id);
    let actor = match require_self_or_admin(&headers, &creator_id) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let result = service
        .applications_for_creator(&creator_id, actor.is_admin())
        .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn adjust_score_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(creator_id): Path<String>,
    Json(request): Json<LedgerAdjustmentRequest>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let admin = match require_admin(&headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let result = service
        .adjust_score(
            &admin,
            &CreatorId(creator_id),
            request.delta,
            request.display_reason,
        )
        .await
        .map(CreatorView::from);
    respond(StatusCode::OK, result)
}

pub(crate) async fn add_penalty_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(creator_id): Path<String>,
    Json(request): Json<LedgerAdjustmentRequest>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let admin = match require_admin(&headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let result = service
        .add_penalty(
            &admin,
            &CreatorId(creator_id),
            request.delta,
            request.display_reason,
        )
        .await
        .map(CreatorView::from);
    respond(StatusCode::OK, result)
}

pub(crate) async fn unlock_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(creator_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let admin = match require_admin(&headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let result = service
        .unlock(&admin, &CreatorId(creator_id))
        .await
        .map(CreatorView::from);
    respond(StatusCode::OK, result)
}

pub(crate) async fn account_flags_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(creator_id): Path<String>,
    Json(flags): Json<AccountFlags>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let admin = match require_admin(&headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let result = service
        .set_account_flags(&admin, &CreatorId(creator_id), flags)
        .await
        .map(CreatorView::from);
    respond(StatusCode::OK, result)
}

pub(crate) async fn acknowledge_tier_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(creator_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let actor = match require_creator(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let result = service
        .acknowledge_tier_upgrade(&actor, &CreatorId(creator_id))
        .await
        .map(CreatorView::from);
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_campaign_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Json(request): Json<NewCampaign>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let admin = match require_admin(&headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    respond(
        StatusCode::CREATED,
        service.create_campaign(&admin, request).await,
    )
}

pub(crate) async fn campaign_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    if let Err(response) = actor_from_headers(&headers) {
        return response;
    }
    respond(
        StatusCode::OK,
        service.campaign(&CampaignId(campaign_id)).await,
    )
}

pub(crate) async fn campaign_status_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(campaign_id): Path<String>,
    Json(request): Json<CampaignStatusRequest>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let admin = match require_admin(&headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let result = service
        .set_campaign_status(&admin, &CampaignId(campaign_id), request.status)
        .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn reconcile_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let admin = match require_admin(&headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let result = service
        .reconcile_inventory(&admin, &CampaignId(campaign_id))
        .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn apply_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let creator = match require_creator(&headers) {
        Ok(creator) => creator,
        Err(response) => return response,
    };
    let result = service.apply(&creator, &CampaignId(campaign_id)).await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn application_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let result = service
        .application(&ApplicationId(application_id))
        .await
        .and_then(|application| {
            if actor.is_admin() || application.creator_id.0 == actor.id {
                Ok(application)
            } else {
                Err(CampaignError::Forbidden)
            }
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn cancel_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let creator = match require_creator(&headers) {
        Ok(creator) => creator,
        Err(response) => return response,
    };
    match service
        .cancel(&creator, &ApplicationId(application_id))
        .await
    {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn application_action_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path((application_id, action)): Path<(String, String)>,
    body: Bytes,
) -> Response
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    let id = ApplicationId(application_id);

    if action == "dismiss" {
        let creator = match require_creator(&headers) {
            Ok(creator) => creator,
            Err(response) => return response,
        };
        return respond(StatusCode::OK, service.dismiss(&creator, &id).await);
    }

    let admin = match require_admin(&headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let request = match parse_action_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let result = match action.as_str() {
        "approve" => service.approve(&admin, &id).await,
        "reject" => service.reject(&admin, &id).await,
        "revoke" => service.revoke(&admin, &id).await,
        "ship" => {
            let details = ShipmentDetails {
                carrier: request.carrier,
                tracking_number: request.tracking_number,
            };
            service.ship(&admin, &id, details).await
        }
        "deliver" => service.deliver(&admin, &id).await,
        "undo-deliver" => service.undo_deliver(&admin, &id).await,
        "mark-uploaded" => service.mark_uploaded(&admin, &id, request.points).await,
        "mark-missed" => service.mark_missed(&admin, &id).await,
        "undo-missed" => service.undo_missed(&admin, &id).await,
        "complete" => service.complete(&admin, &id).await,
        other => {
            return error_payload(
                StatusCode::NOT_FOUND,
                format!("unknown application action '{other}'"),
            )
        }
    };
    respond(StatusCode::OK, result)
}
