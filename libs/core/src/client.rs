//! Outbound client for the Graph `/messages` endpoint and the group
//! management surface.
//!
//! Every call is one-shot: no retry, no backoff. Provider errors (HTTP
//! >= 400) surface as [`ApiError`]; transport failures surface unchanged.
//! The owned `reqwest::Client` and its connection pool are released when
//! the `Client` is dropped.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{ApiError, Error, Result};
use crate::types::{
    ContactCard, GroupInfo, GroupInviteLink, GroupJoinRequest, GroupSummary, ListSection,
    MessageResponse, ReplyButton, Template,
};

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v22.0";

/// Recipient ids carrying this suffix address a group, not an individual.
const GROUP_SUFFIX: &str = "@g.us";

/// Typed client for the WhatsApp Business Cloud API.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    phone_number_id: String,
    access_token: String,
}

impl Client {
    pub fn new(phone_number_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            phone_number_id: phone_number_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Overrides the Graph API base, e.g. to pin a version or point at a
    /// mock server in tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn phone_number_id(&self) -> &str {
        &self.phone_number_id
    }

    // --- Send methods ---

    pub async fn send_text(&self, to: &str, body: &str, preview_url: bool) -> Result<MessageResponse> {
        self.send(json!({
            "to": to,
            "type": "text",
            "text": {"body": body, "preview_url": preview_url},
        }))
        .await
    }

    pub async fn send_image(
        &self,
        to: &str,
        link: &str,
        caption: Option<&str>,
    ) -> Result<MessageResponse> {
        self.send(json!({"to": to, "type": "image", "image": media_object(link, caption, None)}))
            .await
    }

    pub async fn send_audio(&self, to: &str, link: &str) -> Result<MessageResponse> {
        self.send(json!({"to": to, "type": "audio", "audio": {"link": link}}))
            .await
    }

    pub async fn send_video(
        &self,
        to: &str,
        link: &str,
        caption: Option<&str>,
    ) -> Result<MessageResponse> {
        self.send(json!({"to": to, "type": "video", "video": media_object(link, caption, None)}))
            .await
    }

    pub async fn send_document(
        &self,
        to: &str,
        link: &str,
        caption: Option<&str>,
        filename: Option<&str>,
    ) -> Result<MessageResponse> {
        self.send(json!({
            "to": to,
            "type": "document",
            "document": media_object(link, caption, filename),
        }))
        .await
    }

    pub async fn send_sticker(&self, to: &str, link: &str) -> Result<MessageResponse> {
        self.send(json!({"to": to, "type": "sticker", "sticker": {"link": link}}))
            .await
    }

    pub async fn send_location(
        &self,
        to: &str,
        latitude: f64,
        longitude: f64,
        name: Option<&str>,
        address: Option<&str>,
    ) -> Result<MessageResponse> {
        let mut location = json!({"latitude": latitude, "longitude": longitude});
        if let Some(name) = name {
            location["name"] = name.into();
        }
        if let Some(address) = address {
            location["address"] = address.into();
        }
        self.send(json!({"to": to, "type": "location", "location": location}))
            .await
    }

    pub async fn send_contacts(&self, to: &str, contacts: &[ContactCard]) -> Result<MessageResponse> {
        self.send(json!({"to": to, "type": "contacts", "contacts": contacts}))
            .await
    }

    pub async fn send_template(&self, to: &str, template: &Template) -> Result<MessageResponse> {
        self.send(json!({"to": to, "type": "template", "template": template}))
            .await
    }

    pub async fn send_buttons(
        &self,
        to: &str,
        body: &str,
        buttons: &[ReplyButton],
        header: Option<&str>,
        footer: Option<&str>,
    ) -> Result<MessageResponse> {
        self.send(json!({
            "to": to,
            "type": "interactive",
            "interactive": buttons_object(body, buttons, header, footer),
        }))
        .await
    }

    pub async fn send_list(
        &self,
        to: &str,
        body: &str,
        button_text: &str,
        sections: &[ListSection],
        header: Option<&str>,
        footer: Option<&str>,
    ) -> Result<MessageResponse> {
        self.send(json!({
            "to": to,
            "type": "interactive",
            "interactive": list_object(body, button_text, sections, header, footer),
        }))
        .await
    }

    // --- Group management ---

    pub async fn create_group(&self, subject: &str, participants: &[String]) -> Result<GroupInfo> {
        let path = format!("{}/groups", self.phone_number_id);
        self.api(
            reqwest::Method::POST,
            &path,
            Some(json!({
                "subject": subject,
                "participants": participants,
                "messaging_product": "whatsapp",
            })),
        )
        .await
    }

    pub async fn get_groups(&self) -> Result<Vec<GroupSummary>> {
        #[derive(serde::Deserialize)]
        struct Page {
            #[serde(default)]
            data: Vec<GroupSummary>,
        }
        let path = format!("{}/groups", self.phone_number_id);
        let page: Page = self.api(reqwest::Method::GET, &path, None).await?;
        Ok(page.data)
    }

    pub async fn get_group(&self, group_id: &str) -> Result<GroupInfo> {
        self.api(reqwest::Method::GET, group_id, None).await
    }

    pub async fn update_group(
        &self,
        group_id: &str,
        subject: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({});
        if let Some(subject) = subject {
            payload["subject"] = subject.into();
        }
        if let Some(description) = description {
            payload["description"] = description.into();
        }
        let _: Value = self.api(reqwest::Method::POST, group_id, Some(payload)).await?;
        Ok(())
    }

    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        let _: Value = self.api(reqwest::Method::DELETE, group_id, None).await?;
        Ok(())
    }

    pub async fn get_invite_link(&self, group_id: &str) -> Result<GroupInviteLink> {
        let path = format!("{group_id}/invite_link");
        self.api(reqwest::Method::GET, &path, None).await
    }

    pub async fn reset_invite_link(&self, group_id: &str) -> Result<GroupInviteLink> {
        let path = format!("{group_id}/invite_link");
        self.api(reqwest::Method::POST, &path, None).await
    }

    pub async fn remove_participants(&self, group_id: &str, participants: &[String]) -> Result<()> {
        let path = format!("{group_id}/participants");
        let _: Value = self
            .api(
                reqwest::Method::DELETE,
                &path,
                Some(json!({"participants": participants})),
            )
            .await?;
        Ok(())
    }

    pub async fn get_join_requests(&self, group_id: &str) -> Result<Vec<GroupJoinRequest>> {
        #[derive(serde::Deserialize)]
        struct Page {
            #[serde(default)]
            data: Vec<GroupJoinRequest>,
        }
        let path = format!("{group_id}/join_requests");
        let page: Page = self.api(reqwest::Method::GET, &path, None).await?;
        Ok(page.data)
    }

    pub async fn approve_join_requests(
        &self,
        group_id: &str,
        participants: &[String],
    ) -> Result<()> {
        let path = format!("{group_id}/join_requests");
        let _: Value = self
            .api(
                reqwest::Method::POST,
                &path,
                Some(json!({"participants": participants})),
            )
            .await?;
        Ok(())
    }

    pub async fn reject_join_requests(
        &self,
        group_id: &str,
        participants: &[String],
    ) -> Result<()> {
        let path = format!("{group_id}/join_requests");
        let _: Value = self
            .api(
                reqwest::Method::DELETE,
                &path,
                Some(json!({"participants": participants})),
            )
            .await?;
        Ok(())
    }

    // --- Wire plumbing ---

    async fn send(&self, payload: Value) -> Result<MessageResponse> {
        let payload = finalize_envelope(payload);
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        tracing::debug!(to = payload.get("to").and_then(serde_json::Value::as_str), "sending message");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn api<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.access_token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.as_u16() >= 400 {
            // The error path must never itself fail: an unreadable body
            // still produces an ApiError with the documented defaults.
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(Error::Api(ApiError::from_response(status.as_u16(), &body)));
        }
        Ok(response.json().await?)
    }
}

/// Stamps the common envelope fields onto a `/messages` payload.
/// Group recipients (`@g.us` suffix) are tagged with `recipient_type`.
fn finalize_envelope(mut payload: Value) -> Value {
    payload["messaging_product"] = "whatsapp".into();
    let is_group = payload
        .get("to")
        .and_then(Value::as_str)
        .is_some_and(|to| to.contains(GROUP_SUFFIX));
    if is_group {
        payload["recipient_type"] = "group".into();
    }
    payload
}

fn media_object(link: &str, caption: Option<&str>, filename: Option<&str>) -> Value {
    let mut media = json!({"link": link});
    if let Some(caption) = caption {
        media["caption"] = caption.into();
    }
    if let Some(filename) = filename {
        media["filename"] = filename.into();
    }
    media
}

fn buttons_object(
    body: &str,
    buttons: &[ReplyButton],
    header: Option<&str>,
    footer: Option<&str>,
) -> Value {
    let buttons: Vec<Value> = buttons
        .iter()
        .map(|b| json!({"type": "reply", "reply": {"id": b.id, "title": b.title}}))
        .collect();
    let mut interactive = json!({
        "type": "button",
        "body": {"text": body},
        "action": {"buttons": buttons},
    });
    apply_header_footer(&mut interactive, header, footer);
    interactive
}

fn list_object(
    body: &str,
    button_text: &str,
    sections: &[ListSection],
    header: Option<&str>,
    footer: Option<&str>,
) -> Value {
    let sections: Vec<Value> = sections
        .iter()
        .map(|section| {
            let rows: Vec<Value> = section
                .rows
                .iter()
                .map(|row| {
                    let mut r = json!({"id": row.id, "title": row.title});
                    if let Some(description) = &row.description {
                        r["description"] = description.as_str().into();
                    }
                    r
                })
                .collect();
            json!({"title": section.title, "rows": rows})
        })
        .collect();
    let mut interactive = json!({
        "type": "list",
        "body": {"text": body},
        "action": {"button": button_text, "sections": sections},
    });
    apply_header_footer(&mut interactive, header, footer);
    interactive
}

fn apply_header_footer(interactive: &mut Value, header: Option<&str>, footer: Option<&str>) {
    if let Some(header) = header {
        interactive["header"] = json!({"type": "text", "text": header});
    }
    if let Some(footer) = footer {
        interactive["footer"] = json!({"text": footer});
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ListRow, TemplateComponent, TemplateParameter};

    #[test]
    fn envelope_gets_messaging_product() {
        let payload = finalize_envelope(json!({"to": "441100111222", "type": "text"}));
        assert_eq!(payload["messaging_product"], "whatsapp");
        assert_eq!(payload.get("recipient_type"), None);
    }

    #[test]
    fn group_recipients_are_tagged() {
        let payload = finalize_envelope(json!({"to": "1234567890-1631234567@g.us", "type": "text"}));
        assert_eq!(payload["recipient_type"], "group");
    }

    #[test]
    fn buttons_payload_matches_graph_schema() {
        let buttons = vec![
            ReplyButton { id: "yes".into(), title: "Yes".into() },
            ReplyButton { id: "no".into(), title: "No".into() },
        ];
        let interactive = buttons_object("Proceed?", &buttons, Some("Order"), None);
        assert_eq!(
            interactive,
            json!({
                "type": "button",
                "body": {"text": "Proceed?"},
                "action": {"buttons": [
                    {"type": "reply", "reply": {"id": "yes", "title": "Yes"}},
                    {"type": "reply", "reply": {"id": "no", "title": "No"}}
                ]},
                "header": {"type": "text", "text": "Order"},
            })
        );
    }

    #[test]
    fn list_payload_omits_missing_descriptions() {
        let sections = vec![ListSection {
            title: "Sizes".into(),
            rows: vec![
                ListRow { id: "s".into(), title: "Small".into(), description: Some("250ml".into()) },
                ListRow { id: "l".into(), title: "Large".into(), description: None },
            ],
        }];
        let interactive = list_object("Pick one", "Menu", &sections, None, Some("Thanks"));
        assert_eq!(
            interactive,
            json!({
                "type": "list",
                "body": {"text": "Pick one"},
                "action": {"button": "Menu", "sections": [{
                    "title": "Sizes",
                    "rows": [
                        {"id": "s", "title": "Small", "description": "250ml"},
                        {"id": "l", "title": "Large"}
                    ]
                }]},
                "footer": {"text": "Thanks"},
            })
        );
    }

    #[test]
    fn template_send_payload_serializes_components() {
        let template = Template::new("order_update", "en_US").with_components(vec![
            TemplateComponent::Body {
                parameters: vec![TemplateParameter::text("42")],
            },
        ]);
        let payload = finalize_envelope(json!({
            "to": "441100111222",
            "type": "template",
            "template": template,
        }));
        assert_eq!(
            payload["template"],
            json!({
                "name": "order_update",
                "language": {"code": "en_US"},
                "components": [{"type": "body", "parameters": [{"type": "text", "text": "42"}]}]
            })
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = Client::new("PHONE", "TOKEN").with_base_url("https://graph.test/v22.0/");
        assert_eq!(client.base_url, "https://graph.test/v22.0");
        assert_eq!(client.phone_number_id(), "PHONE");
    }
}
