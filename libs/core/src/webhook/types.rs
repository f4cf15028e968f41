//! Typed model of inbound webhook notifications.
//!
//! Everything here is an immutable value object built once per delivery by
//! [`parse_notifications`](super::parse_notifications); nothing is persisted.

use serde_json::Value;

/// One parsed unit per `(entry, change)` pair in a webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub metadata: Metadata,
    pub contacts: Vec<Contact>,
    pub messages: Vec<Message>,
    pub statuses: Vec<Status>,
}

/// The business phone number the delivery belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub display_phone_number: String,
    pub phone_number_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub wa_id: String,
    pub name: Option<String>,
}

/// Reply-to reference carried on messages that quote another message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    pub from: String,
    pub id: String,
}

/// An inbound user-originated message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub from: String,
    /// Provider-supplied epoch seconds, passed through verbatim.
    pub timestamp: String,
    /// The provider's `type` tag, preserved even when the content is
    /// [`Content::Unsupported`].
    pub msg_type: String,
    pub content: Content,
    pub context: Option<ReplyContext>,
}

/// Closed set of payloads a message can carry.
///
/// Legacy quick-reply buttons (`type == "button"`) and interactive button
/// replies both collapse into [`Content::ButtonReply`]; handler code relies
/// on that normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text {
        body: String,
    },
    /// Shared shape for image, video, audio, document and sticker messages.
    Media(Media),
    Location(Location),
    ButtonReply {
        id: String,
        title: String,
    },
    ListReply {
        id: String,
        title: String,
        description: Option<String>,
    },
    Reaction {
        message_id: String,
        emoji: String,
    },
    /// Lossless fallback: the whole message object, verbatim.
    Unsupported {
        raw: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub id: String,
    pub mime_type: String,
    pub sha256: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub address: Option<String>,
}

/// A delivery-lifecycle update for a previously sent outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: String,
    /// Lifecycle string (`sent`, `delivered`, `read`, `failed`, ...); left
    /// open rather than enumerated so new provider states pass through.
    pub status: String,
    pub timestamp: String,
    pub recipient_id: String,
    pub conversation: Option<Conversation>,
    pub pricing: Option<Pricing>,
    pub errors: Option<Vec<StatusError>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub origin: ConversationOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationOrigin {
    pub origin_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pricing {
    pub billable: bool,
    pub pricing_model: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    pub code: i64,
    pub title: String,
}
