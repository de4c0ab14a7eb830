//! HTTP surface: merges the feature routers behind one axum `Router`.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::auth::Authenticator;
use crate::config::AppConfig;
use crate::llm::LlmProvider;
use crate::onboarding::{OnboardingRouteState, SessionRegistry, onboarding_routes};
use crate::pitch::{PitchRouteState, pitch_routes};
use crate::profile::{ProfileRouteState, profile_routes};
use crate::report::{ReportGenerator, ReportRouteState, report_routes};
use crate::store::ProfileStore;

/// Everything the routes share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmProvider>,
    pub store: Arc<dyn ProfileStore>,
    pub authenticator: Arc<dyn Authenticator>,
    pub sessions: Arc<SessionRegistry>,
    pub reports: Arc<ReportGenerator>,
}

impl AppState {
    /// Wire the core services around the given collaborators.
    pub fn new(
        config: &AppConfig,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn ProfileStore>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(
            llm.clone(),
            store.clone(),
            config.onboarding.clone(),
        ));
        let reports = Arc::new(ReportGenerator::new(
            llm.clone(),
            store.clone(),
            config.report.clone(),
        ));
        Self {
            llm,
            store,
            authenticator,
            sessions,
            reports,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "disha",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(onboarding_routes(OnboardingRouteState {
            registry: state.sessions.clone(),
            authenticator: state.authenticator.clone(),
        }))
        .merge(report_routes(ReportRouteState {
            generator: state.reports.clone(),
            authenticator: state.authenticator.clone(),
        }))
        .merge(profile_routes(ProfileRouteState {
            store: state.store.clone(),
            authenticator: state.authenticator.clone(),
        }))
        .merge(pitch_routes(PitchRouteState { llm: state.llm }))
        .layer(CorsLayer::permissive())
}
