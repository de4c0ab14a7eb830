//! REST endpoints for the caller's profile document.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use super::model::DocumentSubmission;
use crate::auth::{Authenticator, authenticate};
use crate::callable::CallableError;
use crate::error::ProfileError;
use crate::store::{ProfilePatch, ProfileStore, UserProfile};

/// Shared state for profile routes.
#[derive(Clone)]
pub struct ProfileRouteState {
    pub store: Arc<dyn ProfileStore>,
    pub authenticator: Arc<dyn Authenticator>,
}

async fn load(store: &dyn ProfileStore, uid: &str) -> Result<UserProfile, ProfileError> {
    store
        .get(uid)
        .await?
        .ok_or_else(|| ProfileError::NotFound { uid: uid.into() })
}

/// GET /api/profile
///
/// Returns the persisted profile, or 404 if none exists.
async fn get_profile(
    State(state): State<ProfileRouteState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, CallableError> {
    let session = authenticate(state.authenticator.as_ref(), &headers).await?;
    Ok(Json(load(state.store.as_ref(), &session.uid).await?))
}

/// POST /api/profile/documents
///
/// Records education board, grade, and uploaded document references.
async fn submit_documents(
    State(state): State<ProfileRouteState>,
    headers: HeaderMap,
    body: Result<Json<DocumentSubmission>, JsonRejection>,
) -> Result<Json<UserProfile>, CallableError> {
    let session = authenticate(state.authenticator.as_ref(), &headers).await?;
    let Json(body) = body?;
    let (education, documents) = body.validate()?;

    let mut patch = ProfilePatch::new()
        .with_education(education)
        .with_documents(documents);
    if let Some(ref name) = session.display_name {
        patch = patch.with_display_name(name.clone());
    }
    state
        .store
        .save(&session.uid, patch)
        .await
        .map_err(ProfileError::from)?;
    info!(uid = %session.uid, "Education and documents recorded");

    Ok(Json(load(state.store.as_ref(), &session.uid).await?))
}

/// Build the profile REST routes.
pub fn profile_routes(state: ProfileRouteState) -> Router {
    Router::new()
        .route("/api/profile", get(get_profile))
        .route("/api/profile/documents", post(submit_documents))
        .with_state(state)
}
