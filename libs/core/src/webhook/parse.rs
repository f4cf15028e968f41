//! Decodes a raw webhook body into typed [`Notification`]s.
//!
//! Parsing is deliberately lenient: Meta's inbound schema evolves, and an
//! unknown or malformed shape must not crash the receiver. Unknown message
//! types degrade to [`Content::Unsupported`] with the original object kept
//! verbatim; missing scalar fields degrade to empty strings. The one hard
//! contract is the delivery-status path, where `id`, `status`, `timestamp`
//! and `recipient_id` are required.

use serde_json::Value;

use crate::error::ParseError;
use crate::webhook::types::{
    Contact, Content, Conversation, ConversationOrigin, Location, Media, Message, Metadata,
    Notification, Pricing, ReplyContext, Status, StatusError,
};

/// Walks `entry[*].changes[*].value` in array order, producing one
/// notification per change object. Missing collections yield empty
/// sequences, never an error.
pub fn parse_notifications(raw: &Value) -> Result<Vec<Notification>, ParseError> {
    let mut notifications = Vec::new();
    let Some(entries) = raw.get("entry").and_then(Value::as_array) else {
        return Ok(notifications);
    };
    for entry in entries {
        let Some(changes) = entry.get("changes").and_then(Value::as_array) else {
            continue;
        };
        for change in changes {
            let value = change.get("value").unwrap_or(&Value::Null);
            notifications.push(parse_change_value(value)?);
        }
    }
    Ok(notifications)
}

fn parse_change_value(value: &Value) -> Result<Notification, ParseError> {
    let meta = value.get("metadata").unwrap_or(&Value::Null);
    let metadata = Metadata {
        display_phone_number: str_field(meta, "display_phone_number"),
        phone_number_id: str_field(meta, "phone_number_id"),
    };

    let contacts = value
        .get("contacts")
        .and_then(Value::as_array)
        .map(|contacts| contacts.iter().map(parse_contact).collect())
        .unwrap_or_default();

    let messages = value
        .get("messages")
        .and_then(Value::as_array)
        .map(|messages| messages.iter().map(parse_message).collect())
        .unwrap_or_default();

    let statuses = value
        .get("statuses")
        .and_then(Value::as_array)
        .map(|statuses| statuses.iter().map(parse_status).collect::<Result<_, _>>())
        .transpose()?
        .unwrap_or_default();

    Ok(Notification {
        metadata,
        contacts,
        messages,
        statuses,
    })
}

fn parse_contact(contact: &Value) -> Contact {
    Contact {
        wa_id: str_field(contact, "wa_id"),
        name: contact
            .get("profile")
            .and_then(|profile| profile.get("name"))
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

fn parse_message(msg: &Value) -> Message {
    let msg_type = msg
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let context = msg.get("context").map(|ctx| ReplyContext {
        from: str_field(ctx, "from"),
        id: str_field(ctx, "id"),
    });
    Message {
        id: str_field(msg, "id"),
        from: str_field(msg, "from"),
        timestamp: str_field(msg, "timestamp"),
        content: parse_content(msg, &msg_type),
        msg_type,
        context,
    }
}

/// Dispatch on the provider `type` tag. Quick-reply buttons and interactive
/// button replies arrive in different envelopes but normalize to the same
/// [`Content::ButtonReply`] shape.
fn parse_content(msg: &Value, msg_type: &str) -> Content {
    match msg_type {
        "text" => match msg.get("text").and_then(|t| t.get("body")).and_then(Value::as_str) {
            Some(body) => Content::Text {
                body: body.to_owned(),
            },
            None => unsupported(msg),
        },
        "image" | "video" | "audio" | "document" | "sticker" => {
            let Some(media) = msg.get(msg_type) else {
                return unsupported(msg);
            };
            match (
                media.get("id").and_then(Value::as_str),
                media.get("mime_type").and_then(Value::as_str),
                media.get("sha256").and_then(Value::as_str),
            ) {
                (Some(id), Some(mime_type), Some(sha256)) => Content::Media(Media {
                    id: id.to_owned(),
                    mime_type: mime_type.to_owned(),
                    sha256: sha256.to_owned(),
                    caption: media
                        .get("caption")
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                }),
                _ => unsupported(msg),
            }
        }
        "location" => {
            let Some(loc) = msg.get("location") else {
                return unsupported(msg);
            };
            match (
                loc.get("latitude").and_then(Value::as_f64),
                loc.get("longitude").and_then(Value::as_f64),
            ) {
                (Some(latitude), Some(longitude)) => Content::Location(Location {
                    latitude,
                    longitude,
                    name: loc.get("name").and_then(Value::as_str).map(str::to_owned),
                    address: loc
                        .get("address")
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                }),
                _ => unsupported(msg),
            }
        }
        "button" => {
            let button = msg.get("button").unwrap_or(&Value::Null);
            match (
                button.get("payload").and_then(Value::as_str),
                button.get("text").and_then(Value::as_str),
            ) {
                (Some(payload), Some(text)) => Content::ButtonReply {
                    id: payload.to_owned(),
                    title: text.to_owned(),
                },
                _ => unsupported(msg),
            }
        }
        "interactive" => {
            let interactive = msg.get("interactive").unwrap_or(&Value::Null);
            match interactive.get("type").and_then(Value::as_str) {
                Some("button_reply") => {
                    let reply = interactive.get("button_reply").unwrap_or(&Value::Null);
                    match (
                        reply.get("id").and_then(Value::as_str),
                        reply.get("title").and_then(Value::as_str),
                    ) {
                        (Some(id), Some(title)) => Content::ButtonReply {
                            id: id.to_owned(),
                            title: title.to_owned(),
                        },
                        _ => unsupported(msg),
                    }
                }
                Some("list_reply") => {
                    let reply = interactive.get("list_reply").unwrap_or(&Value::Null);
                    match (
                        reply.get("id").and_then(Value::as_str),
                        reply.get("title").and_then(Value::as_str),
                    ) {
                        (Some(id), Some(title)) => Content::ListReply {
                            id: id.to_owned(),
                            title: title.to_owned(),
                            description: reply
                                .get("description")
                                .and_then(Value::as_str)
                                .map(str::to_owned),
                        },
                        _ => unsupported(msg),
                    }
                }
                _ => unsupported(msg),
            }
        }
        "reaction" => {
            let reaction = msg.get("reaction").unwrap_or(&Value::Null);
            match (
                reaction.get("message_id").and_then(Value::as_str),
                reaction.get("emoji").and_then(Value::as_str),
            ) {
                (Some(message_id), Some(emoji)) => Content::Reaction {
                    message_id: message_id.to_owned(),
                    emoji: emoji.to_owned(),
                },
                _ => unsupported(msg),
            }
        }
        _ => unsupported(msg),
    }
}

fn unsupported(msg: &Value) -> Content {
    Content::Unsupported { raw: msg.clone() }
}

fn parse_status(raw: &Value) -> Result<Status, ParseError> {
    let conversation = match raw.get("conversation") {
        Some(conv) => Some(Conversation {
            id: require_str(conv, "id", "conversation.id")?,
            origin: ConversationOrigin {
                origin_type: require_str(
                    conv.get("origin").unwrap_or(&Value::Null),
                    "type",
                    "conversation.origin.type",
                )?,
            },
        }),
        None => None,
    };
    let pricing = match raw.get("pricing") {
        Some(p) => Some(Pricing {
            billable: p
                .get("billable")
                .and_then(Value::as_bool)
                .ok_or(ParseError::missing("pricing.billable"))?,
            pricing_model: require_str(p, "pricing_model", "pricing.pricing_model")?,
            category: require_str(p, "category", "pricing.category")?,
        }),
        None => None,
    };
    let errors = match raw.get("errors").and_then(Value::as_array) {
        Some(entries) => Some(
            entries
                .iter()
                .map(|e| {
                    Ok(StatusError {
                        code: e
                            .get("code")
                            .and_then(Value::as_i64)
                            .ok_or(ParseError::missing("errors.code"))?,
                        title: require_str(e, "title", "errors.title")?,
                    })
                })
                .collect::<Result<Vec<_>, ParseError>>()?,
        ),
        None => None,
    };

    Ok(Status {
        id: require_str(raw, "id", "id")?,
        status: require_str(raw, "status", "status")?,
        timestamp: require_str(raw, "timestamp", "timestamp")?,
        recipient_id: require_str(raw, "recipient_id", "recipient_id")?,
        conversation,
        pricing,
        errors,
    })
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn require_str(value: &Value, key: &str, field: &'static str) -> Result<String, ParseError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(ParseError::missing(field))
}
