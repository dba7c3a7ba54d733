use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use tracing::{debug, warn};

use crate::error::{AuthFailure, Error, Result};
use crate::gmail_api::auth::Token;
use crate::types::{
    Label, LabelsResponse, Message, MessageRef, MessagesResponse, ModifyRequest, Profile,
    SendRequest, SentMessage,
};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// The mailbox operations a run needs, all scoped to the signed-in user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailboxApi: Send + Sync {
    async fn list_labels(&self) -> Result<Vec<Label>>;
    async fn list_messages(&self, query: &str, label_ids: &[String]) -> Result<Vec<MessageRef>>;
    async fn get_message(&self, id: &str) -> Result<Message>;
    async fn send_message(&self, raw: &str, thread_id: &str) -> Result<SentMessage>;
    async fn modify_message(
        &self,
        id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()>;
}

/// Gmail REST client bound to an access token.
///
/// Only [`AuthSession`](crate::gmail_api::auth::AuthSession) builds these, so
/// the token has already been checked or freshly issued.
#[derive(Debug, Clone)]
pub struct GmailClient {
    client: reqwest::Client,
    base_url: String,
    token: Token,
}

impl GmailClient {
    pub(crate) fn new(client: reqwest::Client, token: Token) -> Self {
        Self {
            client,
            base_url: GMAIL_API_BASE.to_string(),
            token,
        }
    }

    pub(crate) fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Cheap authenticated call; `false` when the provider rejects the token.
    pub async fn accepts_token(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.url("profile"))
            .bearer_auth(&self.token.access_token)
            .send()
            .await
            .map_err(|e| Error::auth(AuthFailure::Network, e))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            status if status.is_success() => {
                let profile: Profile = response
                    .json()
                    .await
                    .map_err(|e| Error::auth(AuthFailure::Network, e))?;
                debug!(email = ?profile.email_address, "Token accepted");
                Ok(true)
            }
            // Provider trouble during validation is still an auth failure
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(Error::auth(
                    AuthFailure::Network,
                    format!("{}: {}", status, error_text),
                ))
            }
        }
    }
}

// Turn a non-2xx response into a transport error carrying the body text
async fn check(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(Error::transport(operation, format!("{}: {}", status, error_text)))
}

#[async_trait]
impl MailboxApi for GmailClient {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        let response = self
            .client
            .get(self.url("labels"))
            .bearer_auth(&self.token.access_token)
            .send()
            .await
            .map_err(|e| Error::transport("labels.list", e))?;

        let labels: LabelsResponse = check(response, "labels.list")
            .await?
            .json()
            .await
            .map_err(|e| Error::transport("labels.list", e))?;
        Ok(labels.labels.unwrap_or_default())
    }

    async fn list_messages(&self, query: &str, label_ids: &[String]) -> Result<Vec<MessageRef>> {
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params: Vec<(&str, &str)> = vec![("q", query)];
            params.extend(label_ids.iter().map(|id| ("labelIds", id.as_str())));
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .client
                .get(self.url("messages"))
                .query(&params)
                .bearer_auth(&self.token.access_token)
                .send()
                .await
                .map_err(|e| Error::transport("messages.list", e))?;

            let page: MessagesResponse = check(response, "messages.list")
                .await?
                .json()
                .await
                .map_err(|e| Error::transport("messages.list", e))?;

            refs.extend(page.messages.unwrap_or_default());
            debug!(total = refs.len(), "Fetched message page");

            match page.next_page_token {
                Some(next) if !next.is_empty() && page_token.as_deref() != Some(next.as_str()) => {
                    page_token = Some(next)
                }
                Some(next) if !next.is_empty() => {
                    warn!(page_token = %next, "Provider repeated a page token, stopping");
                    break;
                }
                _ => break,
            }
        }

        Ok(refs)
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        let response = self
            .client
            .get(self.url(&format!("messages/{}", id)))
            .query(&[("format", "full")])
            .bearer_auth(&self.token.access_token)
            .send()
            .await
            .map_err(|e| Error::transport("messages.get", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::MessageNotFound(id.to_string()));
        }

        check(response, "messages.get")
            .await?
            .json()
            .await
            .map_err(|e| Error::transport("messages.get", e))
    }

    async fn send_message(&self, raw: &str, thread_id: &str) -> Result<SentMessage> {
        let request_body = SendRequest { raw, thread_id };

        let response = self
            .client
            .post(self.url("messages/send"))
            .bearer_auth(&self.token.access_token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::transport("messages.send", e))?;

        check(response, "messages.send")
            .await?
            .json()
            .await
            .map_err(|e| Error::transport("messages.send", e))
    }

    async fn modify_message(
        &self,
        id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()> {
        let request_body = ModifyRequest {
            add_label_ids: add_label_ids.to_vec(),
            remove_label_ids: remove_label_ids.to_vec(),
        };

        let response = self
            .client
            .post(self.url(&format!("messages/{}/modify", id)))
            .bearer_auth(&self.token.access_token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::transport("messages.modify", e))?;

        check(response, "messages.modify").await?;
        Ok(())
    }
}
