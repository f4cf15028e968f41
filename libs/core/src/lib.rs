//! Typed client and webhook receiver for the WhatsApp Business Cloud API.
//!
//! Outbound: [`Client`] builds the Graph `/messages` payloads (text, media,
//! template, interactive, contacts) plus the group-management calls, and
//! maps error envelopes into [`ApiError`].
//!
//! Inbound: [`webhook::WebhookHandler`] verifies the `X-Hub-Signature-256`
//! header against the raw body, answers the subscription challenge, parses
//! deliveries into typed [`webhook::Notification`]s and dispatches them to
//! registered handlers in payload order.
//!
//! ```no_run
//! use wab_core::{Client, webhook::WebhookHandler};
//!
//! let client = Client::new("PHONE_NUMBER_ID", "ACCESS_TOKEN");
//! let handler = WebhookHandler::new("APP_SECRET", client);
//! # let _ = handler;
//! ```

mod client;
mod error;
mod types;
pub mod webhook;

pub use client::Client;
pub use error::{ApiError, Error, ParseError, Result, VerificationError};
pub use types::{
    ContactAddress, ContactCard, ContactEmail, ContactName, ContactOrg, ContactPhone, ContactUrl,
    DocumentLink, GroupInfo, GroupInviteLink, GroupJoinRequest, GroupParticipant, GroupSummary,
    ListRow, ListSection, MediaLink, MessageId, MessageResponse, ReplyButton, SentContact,
    Template, TemplateComponent, TemplateLanguage, TemplateParameter,
};
