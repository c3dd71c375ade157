//! REST endpoints for lead submission and captcha checks.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::error::LeadError;
use crate::pipeline::LeadDispatcher;
use crate::pipeline::types::{LeadPayload, LeadResponse};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<LeadDispatcher>,
}

/// Build the Axum router with the lead and captcha routes.
pub fn lead_routes(dispatcher: Arc<LeadDispatcher>) -> Router {
    let state = AppState { dispatcher };

    Router::new()
        .route("/health", get(health))
        .route("/api/lead", post(submit_lead))
        .route("/api/verify-captcha", post(verify_captcha))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "lead-intake",
        "channels": state.dispatcher.channels().active_names(),
    }))
}

// ── Leads ───────────────────────────────────────────────────────────────

/// POST /api/lead
///
/// 200 for probes and dispatched leads (channel failures are reported in
/// the body), 400 for a rejected captcha, 503 when the captcha service is
/// unreachable, 500 for input that cannot be classified.
async fn submit_lead(
    State(state): State<AppState>,
    Json(payload): Json<LeadPayload>,
) -> Response {
    match state.dispatcher.handle(payload).await {
        Ok(outcome) => (StatusCode::OK, Json(LeadResponse::from(outcome))).into_response(),
        Err(e) => lead_error_response(&e),
    }
}

fn lead_error_response(err: &LeadError) -> Response {
    let (status, message) = match err {
        LeadError::VerificationRejected(_) => (StatusCode::BAD_REQUEST, "Invalid captcha"),
        LeadError::VerificationUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "Captcha verification failed")
        }
        LeadError::ClassificationFault(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save lead")
        }
    };
    (status, Json(LeadResponse::failure(message))).into_response()
}

// ── Captcha ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VerifyCaptchaRequest {
    #[serde(default)]
    token: Option<String>,
}

/// POST /api/verify-captcha
///
/// Standalone gate check used by the form before submitting.
async fn verify_captcha(
    State(state): State<AppState>,
    Json(req): Json<VerifyCaptchaRequest>,
) -> Response {
    let token = req.token.unwrap_or_default();
    if token.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": "Token is required"})),
        )
            .into_response();
    }

    match state.dispatcher.gate().verify(&token).await {
        Ok(verdict) if verdict.accepted => Json(serde_json::json!({
            "success": true,
            "score": verdict.score,
            "action": verdict.action,
        }))
        .into_response(),
        Ok(verdict) => {
            if let Some(rejection) = &verdict.rejection {
                warn!(reason = %rejection, "Captcha check rejected");
            }
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"success": false, "error": "Invalid captcha"})),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Captcha verification failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Captcha verification failed"
                })),
            )
                .into_response()
        }
    }
}
