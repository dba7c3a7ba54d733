use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LabelsResponse {
    pub labels: Option<Vec<Label>>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
    #[serde(rename = "threadId", default)]
    pub thread_id: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Message {
    pub id: Option<String>,
    pub payload: Option<MessagePart>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MessagePart {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Header {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessagePartBody {
    pub data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub raw: &'a str,
    #[serde(rename = "threadId")]
    pub thread_id: &'a str,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
    #[serde(rename = "threadId", default)]
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    #[serde(rename = "emailAddress")]
    pub email_address: Option<String>,
}

/// A fetched message normalized to what the reply step needs.
///
/// Header keys are lower-case (`from`, `to`, `subject`, `message-id`,
/// `references`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMessage {
    pub id: String,
    pub thread_id: String,
    pub headers: BTreeMap<String, String>,
    pub body_available: bool,
}

impl ParsedMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A reply ready for `messages.send`: base64url raw content plus the thread it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub raw: String,
    pub thread_id: String,
}
