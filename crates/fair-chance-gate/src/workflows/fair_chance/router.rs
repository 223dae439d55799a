use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::domain::{CheckRequest, TransitionRequest};
use super::legacy::{LegacyBackgroundCheckRequest, LegacyStageTransitionRequest};
use super::service::FairChanceGateService;
use super::sink::EvidenceSink;

/// Router exposing the gates over HTTP. Blocked decisions are ordinary 200
/// responses with `allowed: false`.
pub fn gate_router<S>(service: Arc<FairChanceGateService<S>>) -> Router
where
    S: EvidenceSink + 'static,
{
    Router::new()
        .route("/api/v1/gates/transition", post(transition_handler::<S>))
        .route("/api/v1/gates/check", post(check_handler::<S>))
        .route(
            "/api/v1/legacy/background-check",
            post(legacy_background_check_handler::<S>),
        )
        .route(
            "/api/v1/legacy/stage-transition",
            post(legacy_stage_transition_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn transition_handler<S>(
    State(service): State<Arc<FairChanceGateService<S>>>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    S: EvidenceSink + 'static,
{
    match service.transition(&request) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn check_handler<S>(
    State(service): State<Arc<FairChanceGateService<S>>>,
    axum::Json(request): axum::Json<CheckRequest>,
) -> Response
where
    S: EvidenceSink + 'static,
{
    let outcome = service.check(&request);
    (StatusCode::OK, axum::Json(outcome)).into_response()
}

pub(crate) async fn legacy_background_check_handler<S>(
    State(service): State<Arc<FairChanceGateService<S>>>,
    axum::Json(request): axum::Json<LegacyBackgroundCheckRequest>,
) -> Response
where
    S: EvidenceSink + 'static,
{
    let outcome = service.legacy_background_check(&request);
    (StatusCode::OK, axum::Json(outcome)).into_response()
}

pub(crate) async fn legacy_stage_transition_handler<S>(
    State(service): State<Arc<FairChanceGateService<S>>>,
    axum::Json(request): axum::Json<LegacyStageTransitionRequest>,
) -> Response
where
    S: EvidenceSink + 'static,
{
    let outcome = service.legacy_stage_transition(&request);
    (StatusCode::OK, axum::Json(outcome)).into_response()
}
