//! REST endpoints for mail ingest, listing and reply drafting.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::Error;
use crate::pipeline::drafting::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DraftOptions};
use crate::pipeline::TriageService;

/// Accepted sampling temperature range.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Shared state for mail routes.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TriageService>,
}

#[derive(Debug, Deserialize)]
struct AddMailRequest {
    sender: Option<String>,
    subject: Option<String>,
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiReplyRequest {
    sender: Option<String>,
    subject: Option<String>,
    body: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

/// Build the mail routes with permissive CORS.
pub fn mail_routes(service: Arc<TriageService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(health))
        .route("/get-mails", get(get_mails))
        .route("/add-mail", post(add_mail))
        .route("/ai-reply", post(ai_reply))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// ── Helpers ─────────────────────────────────────────────────────────

fn status_message(code: StatusCode, message: impl Into<String>) -> Response {
    (code, Json(json!({ "status": { "message": message.into() } }))).into_response()
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Names of required fields that are absent or empty, in request order.
fn missing_fields<'a>(fields: &[(&'a str, &Option<String>)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, value)| present(value).is_none())
        .map(|(name, _)| *name)
        .collect()
}

// ── Handlers ────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /get-mails
async fn get_mails(State(state): State<AppState>) -> Response {
    match state.service.fetch_all_mail() {
        Ok(mails) => {
            let count = mails.len();
            (
                StatusCode::OK,
                Json(json!({
                    "status": { "message": "mails retrieved successfully" },
                    "data": mails,
                    "metadata": { "count": count },
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list mails");
            status_message(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error retrieving mails: {e}"),
            )
        }
    }
}

/// POST /add-mail
async fn add_mail(State(state): State<AppState>, Json(req): Json<AddMailRequest>) -> Response {
    let missing = missing_fields(&[
        ("sender", &req.sender),
        ("subject", &req.subject),
        ("body", &req.body),
    ]);
    let (Some(sender), Some(subject), Some(body)) =
        (present(&req.sender), present(&req.subject), present(&req.body))
    else {
        return status_message(
            StatusCode::BAD_REQUEST,
            format!("Missing required fields: {}", missing.join(", ")),
        );
    };

    match state.service.ingest(sender, subject, body).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(json!({
                "status": {
                    "message": "Mail added successfully",
                    "important": outcome.important,
                    "snippet": outcome.snippet,
                }
            })),
        )
            .into_response(),
        Err(Error::Llm(e)) => {
            error!(error = %e, "Classification failed");
            status_message(
                StatusCode::BAD_GATEWAY,
                format!("Error classifying mail: {e}"),
            )
        }
        Err(e) => {
            error!(error = %e, "Failed to add mail");
            status_message(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error adding mail: {e}"),
            )
        }
    }
}

/// POST /ai-reply
async fn ai_reply(State(state): State<AppState>, Json(req): Json<AiReplyRequest>) -> Response {
    let (Some(sender), Some(subject), Some(body)) =
        (present(&req.sender), present(&req.subject), present(&req.body))
    else {
        return status_message(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    let temperature = req.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return status_message(
            StatusCode::BAD_REQUEST,
            format!("temperature must be between 0.0 and 2.0, got {temperature}"),
        );
    }
    let max_tokens = req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    if max_tokens == 0 {
        return status_message(StatusCode::BAD_REQUEST, "max_tokens must be positive");
    }

    let user_context = req.context.unwrap_or_default();
    let options = DraftOptions {
        user_context: user_context.clone(),
        temperature,
        max_tokens,
    };

    match state
        .service
        .draft_reply(sender, subject, body, &options)
        .await
    {
        Ok(reply) => (
            StatusCode::OK,
            Json(json!({
                "status": {
                    "message": "Reply generated successfully",
                    "user_context": user_context,
                },
                "data": { "reply": reply },
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Reply generation failed");
            status_message(
                StatusCode::BAD_GATEWAY,
                format!("Error generating reply: {e}"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_absent_and_empty_in_order() {
        let sender = None;
        let subject = Some(String::new());
        let body = Some("hello".to_string());
        let missing = missing_fields(&[
            ("sender", &sender),
            ("subject", &subject),
            ("body", &body),
        ]);
        assert_eq!(missing, vec!["sender", "subject"]);
    }

    #[test]
    fn whitespace_counts_as_present() {
        assert_eq!(present(&Some(" ".to_string())), Some(" "));
        assert_eq!(present(&Some(String::new())), None);
    }
}
