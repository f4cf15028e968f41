//! Typed request and response payloads for the outbound Graph API surface.

use serde::{Deserialize, Serialize};

// --- Send-call response ---

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SentContact {
    pub input: String,
    pub wa_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageId {
    pub id: String,
}

/// Response of `POST /{phone_number_id}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    pub messaging_product: String,
    pub contacts: Vec<SentContact>,
    pub messages: Vec<MessageId>,
}

// --- Contact cards ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactName {
    pub formatted_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl ContactName {
    pub fn new(formatted_name: impl Into<String>) -> Self {
        Self {
            formatted_name: formatted_name.into(),
            first_name: None,
            last_name: None,
            middle_name: None,
            suffix: None,
            prefix: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactPhone {
    pub phone: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wa_id: Option<String>,
}

impl ContactPhone {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            kind: "CELL".into(),
            wa_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactEmail {
    pub email: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ContactEmail {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            kind: "WORK".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for ContactAddress {
    fn default() -> Self {
        Self {
            street: None,
            city: None,
            state: None,
            zip: None,
            country: None,
            country_code: None,
            kind: "HOME".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactUrl {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ContactUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: "WORK".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactOrg {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A contact card sent with [`Client::send_contacts`](crate::Client::send_contacts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactCard {
    pub name: ContactName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<ContactPhone>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<ContactEmail>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<ContactAddress>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<ContactUrl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<ContactOrg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

impl ContactCard {
    pub fn new(name: ContactName) -> Self {
        Self {
            name,
            phones: None,
            emails: None,
            addresses: None,
            urls: None,
            org: None,
            birthday: None,
        }
    }
}

// --- Templates ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaLink {
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLink {
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// One parameter substituted into a template component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateParameter {
    Text { text: String },
    Image { image: MediaLink },
    Video { video: MediaLink },
    Document { document: DocumentLink },
}

impl TemplateParameter {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(link: impl Into<String>) -> Self {
        Self::Image {
            image: MediaLink { link: link.into() },
        }
    }

    pub fn video(link: impl Into<String>) -> Self {
        Self::Video {
            video: MediaLink { link: link.into() },
        }
    }

    pub fn document(link: impl Into<String>, filename: Option<String>) -> Self {
        Self::Document {
            document: DocumentLink {
                link: link.into(),
                filename,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateComponent {
    Header {
        parameters: Vec<TemplateParameter>,
    },
    Body {
        parameters: Vec<TemplateParameter>,
    },
    Button {
        sub_type: String,
        // Graph expects the button index as a string.
        index: String,
        parameters: Vec<TemplateParameter>,
    },
}

impl TemplateComponent {
    pub fn button(
        sub_type: impl Into<String>,
        index: usize,
        parameters: Vec<TemplateParameter>,
    ) -> Self {
        Self::Button {
            sub_type: sub_type.into(),
            index: index.to_string(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateLanguage {
    pub code: String,
}

/// A pre-approved message template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub name: String,
    pub language: TemplateLanguage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<TemplateComponent>>,
}

impl Template {
    pub fn new(name: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: TemplateLanguage {
                code: language_code.into(),
            },
            components: None,
        }
    }

    pub fn with_components(mut self, components: Vec<TemplateComponent>) -> Self {
        self.components = Some(components);
        self
    }
}

// --- Interactive sends ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

// --- Groups ---

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupParticipant {
    pub phone_number: String,
    pub admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupInfo {
    pub id: String,
    pub subject: String,
    pub owner: String,
    pub creation_timestamp: i64,
    pub participants: Vec<GroupParticipant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupInviteLink {
    #[serde(rename = "invite_link")]
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupJoinRequest {
    pub phone_number: String,
    pub timestamp: String,
}
