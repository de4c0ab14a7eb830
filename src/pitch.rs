//! Welcome-screen pitch: one short free-text paragraph from the model.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::callable::CallableError;
use crate::error::{ConfigError, LlmError};
use crate::llm::{ChatMessage, ConversationRequest, LlmProvider};

pub const PITCH_PROMPT: &str = "You are an expert career counselor. Write a short, encouraging, \
and compelling paragraph (around 50-60 words) for a student who has just landed on the welcome \
screen of 'Disha AI'. Explain why using a personalized, AI-powered career navigator is a \
game-changer for their future. Focus on clarity, confidence, and discovering their unique path.";

/// Ask the model for the welcome pitch.
pub async fn generate_pitch(llm: &dyn LlmProvider) -> Result<String, LlmError> {
    let request = ConversationRequest::new(vec![ChatMessage::user(PITCH_PROMPT)])
        .with_temperature(0.9)
        .with_max_tokens(256);
    let response = llm.complete(request).await?;
    debug!(output_tokens = response.output_tokens, "Pitch generated");
    Ok(response.content.trim().to_string())
}

#[derive(Clone)]
pub struct PitchRouteState {
    pub llm: Arc<dyn LlmProvider>,
}

#[derive(Debug, Serialize)]
pub struct PitchResponse {
    pub pitch: String,
}

/// GET /api/pitch
async fn get_pitch(
    State(state): State<PitchRouteState>,
) -> Result<Json<PitchResponse>, CallableError> {
    if !state.llm.has_credentials() {
        return Err(ConfigError::MissingCredential {
            provider: state.llm.model_name().to_string(),
        }
        .into());
    }
    let pitch = generate_pitch(state.llm.as_ref()).await?;
    Ok(Json(PitchResponse { pitch }))
}

pub fn pitch_routes(state: PitchRouteState) -> Router {
    Router::new()
        .route("/api/pitch", get(get_pitch))
        .with_state(state)
}
