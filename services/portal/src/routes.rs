//! Portal service routes

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::Method,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::collections::HashMap;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::envelope::{ActionParams, into_body, render};
use crate::error::{PortalError, PortalResult};
use crate::handlers::{self, Endpoint};
use crate::state::AppState;

/// Create the router for the portal service
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/:endpoint/exec", get(exec))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = match state.workbook.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            error!("Store health check failed: {}", e);
            false
        }
    };

    Json(json!({
        "status": "ok",
        "service": "portal",
        "store": store,
    }))
}

/// Run one action and render the envelope, as JSONP when a callback is given
pub async fn exec(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let params = ActionParams::from(query);
    let action = params.str("action").to_string();
    let span = info_span!(
        "action",
        request_id = %Uuid::new_v4(),
        endpoint = %endpoint,
        action = %action,
    );

    let result = run(&state, &endpoint, &action, &params)
        .instrument(span)
        .await;
    if let Err(e) = &result {
        warn!("{} {} failed: {}", endpoint, action, e);
    }

    render(into_body(result), params.get("callback"))
}

async fn run(
    state: &AppState,
    endpoint: &str,
    action: &str,
    params: &ActionParams,
) -> PortalResult<serde_json::Value> {
    let endpoint: Endpoint = endpoint.parse()?;
    if action.is_empty() {
        return Err(PortalError::validation("Action is required"));
    }
    handlers::dispatch(state, endpoint, action, params).await
}
