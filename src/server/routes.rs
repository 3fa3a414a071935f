use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::server::AppState;
use super::types::{ApiResponse, AskRequest, HealthResponse};
use crate::line::{signature, WebhookBody, SIGNATURE_HEADER};
use crate::rag::BotReply;

/// Returns a health check response
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    info!("Health check endpoint called");
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Coffee Corner RAG Bot is running! ☕".to_string(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Runs one message through the pipeline, bounded by the concurrency limit and the request timeout.
async fn answer(state: &AppState, text: &str) -> BotReply {
    let _permit = match state.limiter.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            error!("Request limiter closed: {}", e);
            return state.bot.error_reply();
        }
    };

    match tokio::time::timeout(state.request_timeout, state.bot.process_message(text)).await {
        Ok(reply) => reply,
        Err(_) => {
            warn!("Message processing timed out after {:?}", state.request_timeout);
            state.bot.error_reply()
        }
    }
}

/// Handles LINE Platform webhook calls.
///
/// The signature is checked against the raw body before anything is parsed.
/// Every text message is answered through the reply API; other events are ignored.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if !signature::verify(&state.channel_secret, &body, signature) {
        warn!("Rejected webhook call with invalid signature");
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid signature" })));
    }

    let payload: WebhookBody = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to parse webhook body: {}", e);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid payload" })));
        }
    };

    let handlers = payload.text_messages().map(|incoming| {
        let state = Arc::clone(&state);
        let reply_token = incoming.reply_token.to_string();
        let text = incoming.text.to_string();
        let span = info_span!("event", id = %Uuid::new_v4(), user = incoming.user_id.unwrap_or("-"));

        async move {
            info!("📱 Received: {}", text);
            let reply = answer(&state, &text).await;

            match state.line.reply(&reply_token, &reply.reply, &reply.quick_replies).await {
                Ok(()) => {
                    let preview: String = reply.reply.chars().take(50).collect();
                    info!("🤖 Replied: {}...", preview);
                }
                Err(e) => error!("Failed to send reply: {}", e),
            }
        }
        .instrument(span)
    });
    join_all(handlers).await;

    (StatusCode::OK, Json(json!({ "status": "OK" })))
}

/// Answers a question directly, without going through LINE.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    request: Result<Json<AskRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => {
            warn!("Rejected ask request: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<BotReply>::error(format!(
                    "invalid request body: {}",
                    rejection.body_text()
                ))),
            );
        }
    };

    let message = request.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<BotReply>::error("message must not be empty")),
        );
    }

    info!("Ask endpoint called");
    let reply = answer(&state, message).await;
    (StatusCode::OK, Json(ApiResponse::success(reply)))
}
