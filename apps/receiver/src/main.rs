//! WhatsApp webhook receiver: answers Meta's subscription handshake on GET
//! and feeds signed POST deliveries through the `wab-core` pipeline.
//!
//! ```text
//! Meta calls `/webhook/whatsapp`; verified events are handed to the
//! registered message/status handlers.
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use wab_core::webhook::{
    Content, Message, MessageHandler, Notification, Status, StatusHandler, WebhookHandler,
    verify_challenge,
};
use wab_core::{Client, Error};

#[derive(Clone)]
struct AppState {
    handler: Arc<WebhookHandler>,
    verify_token: String,
}

struct LogEvents;

#[async_trait]
impl MessageHandler for LogEvents {
    async fn on_message(&self, _client: &Client, _notification: &Notification, message: &Message) {
        match &message.content {
            Content::Text { body } => {
                tracing::info!(from = %message.from, msg_type = %message.msg_type, body = %body, "inbound message");
            }
            other => {
                tracing::info!(from = %message.from, msg_type = %message.msg_type, content = ?other, "inbound message");
            }
        }
    }
}

#[async_trait]
impl StatusHandler for LogEvents {
    async fn on_status(&self, _client: &Client, _notification: &Notification, status: &Status) {
        tracing::info!(id = %status.id, status = %status.status, recipient = %status.recipient_id, "delivery status");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let phone_number_id = std::env::var("WA_PHONE_NUMBER_ID").expect("WA_PHONE_NUMBER_ID required");
    let access_token = std::env::var("WA_ACCESS_TOKEN").expect("WA_ACCESS_TOKEN required");
    let app_secret = std::env::var("WA_APP_SECRET").expect("WA_APP_SECRET required");
    let verify_token = std::env::var("WA_VERIFY_TOKEN").expect("WA_VERIFY_TOKEN required");

    let mut client = Client::new(phone_number_id, access_token);
    if let Ok(base) = std::env::var("WA_API_BASE") {
        client = client.with_base_url(base);
    }

    let mut handler = WebhookHandler::new(app_secret, client);
    handler.on_message(LogEvents);
    handler.on_status(LogEvents);

    let state = AppState {
        handler: Arc::new(handler),
        verify_token,
    };

    let app = Router::new()
        .route("/webhook/whatsapp", get(verify).post(receive))
        .route("/healthz", get(healthz))
        .with_state(state);

    let addr: std::net::SocketAddr = std::env::var("BIND")
        .unwrap_or_else(|_| "0.0.0.0:8087".into())
        .parse()?;
    tracing::info!("wab-receiver listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Deserialize)]
struct VerifyQs {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    token: Option<String>,
}

async fn verify(State(state): State<AppState>, Query(q): Query<VerifyQs>) -> impl IntoResponse {
    let mode = q.mode.unwrap_or_default();
    let token = q.token.unwrap_or_default();
    let challenge = q.challenge.unwrap_or_default();
    match verify_challenge(&mode, &token, &challenge, &state.verify_token) {
        Ok(challenge) => (StatusCode::OK, challenge.to_string()),
        Err(err) => {
            tracing::warn!(error = %err, "challenge handshake rejected");
            (StatusCode::FORBIDDEN, "forbidden".to_string())
        }
    }
}

async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    match state.handler.handle(&body, signature).await {
        Ok(()) => StatusCode::OK,
        Err(Error::Verification(err)) => {
            tracing::warn!(error = %err, "invalid whatsapp signature");
            StatusCode::UNAUTHORIZED
        }
        Err(Error::Decode(err)) => {
            tracing::warn!(error = %err, "failed to decode payload");
            StatusCode::BAD_REQUEST
        }
        Err(Error::Parse(err)) => {
            tracing::warn!(error = %err, "payload violated the status contract");
            StatusCode::BAD_REQUEST
        }
        Err(err) => {
            tracing::error!(error = %err, "webhook handling failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn healthz() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
