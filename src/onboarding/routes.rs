//! REST endpoints for the onboarding conversation.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{OnboardingData, Turn};
use super::registry::SessionRegistry;
use super::state::ConversationPhase;
use crate::auth::{Authenticator, authenticate};
use crate::callable::CallableError;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub registry: Arc<SessionRegistry>,
    pub authenticator: Arc<dyn Authenticator>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: ConversationPhase,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReply {
    pub reply: String,
    pub phase: ConversationPhase,
    pub concluded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_data: Option<OnboardingData>,
    /// Present when the concluded profile could not be saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

/// POST /api/onboarding/start
async fn start(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<SessionView>), CallableError> {
    let session = authenticate(state.authenticator.as_ref(), &headers).await?;
    let (handle, _opening) = state.registry.start(session).await?;
    let snapshot = handle.orchestrator.snapshot().await;
    Ok((
        StatusCode::CREATED,
        Json(SessionView {
            session_id: handle.id,
            phase: snapshot.phase,
            turns: snapshot.turns,
        }),
    ))
}

/// POST /api/onboarding/message
async fn message(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    body: Result<Json<MessageBody>, JsonRejection>,
) -> Result<Json<MessageReply>, CallableError> {
    let session = authenticate(state.authenticator.as_ref(), &headers).await?;
    let Json(body) = body?;
    let handle = state.registry.get(&session.uid).await?;
    let outcome = handle.orchestrator.submit_user_turn(&body.text).await?;

    Ok(Json(MessageReply {
        concluded: outcome.is_concluded(),
        reply: outcome.assistant_text,
        phase: outcome.phase,
        onboarding_data: outcome.extracted.map(|p| p.into_data()),
        persist_error: outcome.persist_error.map(|e| e.to_string()),
    }))
}

/// GET /api/onboarding/session
async fn get_session(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, CallableError> {
    let session = authenticate(state.authenticator.as_ref(), &headers).await?;
    let handle = state.registry.get(&session.uid).await?;
    let snapshot = handle.orchestrator.snapshot().await;
    Ok(Json(SessionView {
        session_id: handle.id,
        phase: snapshot.phase,
        turns: snapshot.turns,
    }))
}

/// DELETE /api/onboarding/session
async fn abandon_session(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
) -> Result<StatusCode, CallableError> {
    let session = authenticate(state.authenticator.as_ref(), &headers).await?;
    state.registry.abandon(&session.uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/start", post(start))
        .route("/api/onboarding/message", post(message))
        .route(
            "/api/onboarding/session",
            get(get_session).delete(abandon_session),
        )
        .with_state(state)
}
