//! Webhook ingestion pipeline: verify the signed body, decode it, parse it
//! into typed notifications, and fan events out to registered handlers.

mod parse;
mod types;
mod verify;

pub use parse::parse_notifications;
pub use types::{
    Contact, Content, Conversation, ConversationOrigin, Location, Media, Message, Metadata,
    Notification, Pricing, ReplyContext, Status, StatusError,
};
pub use verify::{verify_challenge, verify_signature};

use async_trait::async_trait;

use crate::client::Client;
use crate::error::Result;

/// Invoked once per inbound message, in payload order.
///
/// The outbound [`Client`] is passed along so handlers can reply without
/// constructing their own.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, client: &Client, notification: &Notification, message: &Message);
}

/// Invoked once per delivery status, in payload order.
#[async_trait]
pub trait StatusHandler: Send + Sync {
    async fn on_status(&self, client: &Client, notification: &Notification, status: &Status);
}

/// Owns the registered handlers and drives one webhook delivery at a time.
///
/// Each event category holds at most one handler; registering again
/// replaces the previous one. The dispatcher itself has no side effects
/// beyond invoking handlers, imposes no timeout, and performs no
/// cancellation: a hanging handler blocks [`handle`](Self::handle) for
/// that delivery.
pub struct WebhookHandler {
    app_secret: String,
    client: Client,
    on_message: Option<Box<dyn MessageHandler>>,
    on_status: Option<Box<dyn StatusHandler>>,
}

impl WebhookHandler {
    pub fn new(app_secret: impl Into<String>, client: Client) -> Self {
        Self {
            app_secret: app_secret.into(),
            client,
            on_message: None,
            on_status: None,
        }
    }

    /// Registers the message handler. Last write wins.
    pub fn on_message(&mut self, handler: impl MessageHandler + 'static) {
        self.on_message = Some(Box::new(handler));
    }

    /// Registers the status handler. Last write wins.
    pub fn on_status(&mut self, handler: impl StatusHandler + 'static) {
        self.on_status = Some(Box::new(handler));
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Processes one webhook delivery.
    ///
    /// Verification happens before any parsing; on a bad signature the
    /// caller must reject the request and nothing is decoded. A body that
    /// verifies but is not valid JSON fails with [`Error::Decode`],
    /// distinct from the verification failure.
    ///
    /// [`Error::Decode`]: crate::Error::Decode
    pub async fn handle(&self, body: &[u8], signature: &str) -> Result<()> {
        verify_signature(body, signature, &self.app_secret)?;
        let raw: serde_json::Value = serde_json::from_slice(body)?;
        let notifications = parse_notifications(&raw)?;
        for notification in &notifications {
            tracing::debug!(
                messages = notification.messages.len(),
                statuses = notification.statuses.len(),
                phone_number_id = %notification.metadata.phone_number_id,
                "dispatching notification"
            );
            if let Some(handler) = &self.on_message {
                for message in &notification.messages {
                    handler.on_message(&self.client, notification, message).await;
                }
            }
            if let Some(handler) = &self.on_status {
                for status in &notification.statuses {
                    handler.on_status(&self.client, notification, status).await;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, VerificationError};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        tag: &'static str,
        log: Log,
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        async fn on_message(&self, _: &Client, _: &Notification, message: &Message) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:msg:{}", self.tag, message.id));
        }
    }

    #[async_trait]
    impl StatusHandler for Recorder {
        async fn on_status(&self, _: &Client, _: &Notification, status: &Status) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:status:{}", self.tag, status.id));
        }
    }

    const SECRET: &str = "app-secret";

    fn handler() -> WebhookHandler {
        WebhookHandler::new(SECRET, Client::new("PHONE_ID", "TOKEN"))
    }

    fn signed(payload: &serde_json::Value) -> (Vec<u8>, String) {
        let body = serde_json::to_vec(payload).unwrap();
        let signature = super::verify::sign(&body, SECRET);
        (body, signature)
    }

    fn sample_payload() -> serde_json::Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "metadata": {"display_phone_number": "1555", "phone_number_id": "PHONE_ID"},
                        "messages": [
                            {"id": "m1", "from": "4411", "timestamp": "1", "type": "text", "text": {"body": "a"}},
                            {"id": "m2", "from": "4411", "timestamp": "2", "type": "text", "text": {"body": "b"}}
                        ],
                        "statuses": [
                            {"id": "s1", "status": "delivered", "timestamp": "3", "recipient_id": "4411"}
                        ]
                    }
                }]
            }]
        })
    }

    #[tokio::test]
    async fn dispatches_messages_then_statuses_in_payload_order() {
        let log: Log = Default::default();
        let mut handler = handler();
        handler.on_message(Recorder { tag: "h", log: log.clone() });
        handler.on_status(Recorder { tag: "h", log: log.clone() });

        let (body, signature) = signed(&sample_payload());
        handler.handle(&body, &signature).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["h:msg:m1", "h:msg:m2", "h:status:s1"]
        );
    }

    #[tokio::test]
    async fn notification_order_is_preserved_across_entries() {
        let payload = json!({
            "entry": [
                {"changes": [{"value": {"messages": [
                    {"id": "m1", "from": "x", "timestamp": "1", "type": "text", "text": {"body": "a"}}
                ]}}]},
                {"changes": [{"value": {"messages": [
                    {"id": "m2", "from": "x", "timestamp": "2", "type": "text", "text": {"body": "b"}}
                ]}}]}
            ]
        });
        let log: Log = Default::default();
        let mut handler = handler();
        handler.on_message(Recorder { tag: "h", log: log.clone() });

        let (body, signature) = signed(&payload);
        handler.handle(&body, &signature).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["h:msg:m1", "h:msg:m2"]);
    }

    #[tokio::test]
    async fn reassignment_replaces_the_previous_handler() {
        let log: Log = Default::default();
        let mut handler = handler();
        handler.on_message(Recorder { tag: "first", log: log.clone() });
        handler.on_message(Recorder { tag: "second", log: log.clone() });

        let (body, signature) = signed(&sample_payload());
        handler.handle(&body, &signature).await.unwrap();

        let log = log.lock().unwrap();
        assert!(log.iter().all(|line| line.starts_with("second:")));
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn unregistered_categories_are_silently_dropped() {
        let handler = handler();
        let (body, signature) = signed(&sample_payload());
        handler.handle(&body, &signature).await.unwrap();
    }

    #[tokio::test]
    async fn bad_signature_fails_before_any_dispatch() {
        let log: Log = Default::default();
        let mut handler = handler();
        handler.on_message(Recorder { tag: "h", log: log.clone() });

        let (body, _) = signed(&sample_payload());
        let err = handler
            .handle(&body, "sha256=0000000000000000000000000000000000000000000000000000000000000000")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Verification(VerificationError::SignatureMismatch)
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_body_with_valid_signature_is_a_decode_error() {
        let handler = handler();
        let body = b"not json";
        let signature = super::verify::sign(body, SECRET);
        let err = handler.handle(body, &signature).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
