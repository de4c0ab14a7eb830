//! POST /api/report: the callable report endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use super::generator::ReportGenerator;
use crate::auth::{Authenticator, authenticate};
use crate::callable::CallableError;

/// Shared state for report routes.
#[derive(Clone)]
pub struct ReportRouteState {
    pub generator: Arc<ReportGenerator>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// POST /api/report
///
/// Returns the caller's report JSON, generating it on first use. The body is
/// the stored serialized text, so repeated calls are byte-identical.
async fn get_or_create_report(
    State(state): State<ReportRouteState>,
    headers: HeaderMap,
) -> Result<Response, CallableError> {
    let session = authenticate(state.authenticator.as_ref(), &headers).await?;
    let outcome = state.generator.get_or_create(&session).await?;

    let mut response = outcome.serialized.into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Build the report routes.
pub fn report_routes(state: ReportRouteState) -> Router {
    Router::new()
        .route("/api/report", post(get_or_create_report))
        .with_state(state)
}
