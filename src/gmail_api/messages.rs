use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::email_content::has_readable_body;
use crate::error::Result;
use crate::gmail_api::client::MailboxApi;
use crate::types::{Message, MessageRef, ParsedMessage};

pub const UNREAD_QUERY: &str = "is:unread";

/// Unread messages carrying `label_id`, in provider order.
pub async fn list_unread<A: MailboxApi + ?Sized>(api: &A, label_id: &str) -> Result<Vec<MessageRef>> {
    let refs = api
        .list_messages(UNREAD_QUERY, &[label_id.to_string()])
        .await?;
    info!(count = refs.len(), label_id, "Discovered unread messages");
    Ok(refs)
}

/// Fetches the full message and flattens it into a [`ParsedMessage`].
pub async fn fetch_message<A: MailboxApi + ?Sized>(
    api: &A,
    message_ref: &MessageRef,
) -> Result<ParsedMessage> {
    let message = api.get_message(&message_ref.id).await?;
    let parsed = parse_message(message, message_ref);
    debug!(id = %parsed.id, thread_id = %parsed.thread_id, headers = parsed.headers.len(), "Fetched message");
    Ok(parsed)
}

/// Header names are lower-cased; the first occurrence of a name wins.
pub fn parse_message(message: Message, message_ref: &MessageRef) -> ParsedMessage {
    let mut headers = BTreeMap::new();
    let mut body_available = false;

    if let Some(payload) = &message.payload {
        for header in payload.headers.iter().flatten() {
            if let (Some(name), Some(value)) = (&header.name, &header.value) {
                headers
                    .entry(name.to_ascii_lowercase())
                    .or_insert_with(|| value.clone());
            }
        }
        body_available = has_readable_body(payload);
    }

    ParsedMessage {
        id: message.id.unwrap_or_else(|| message_ref.id.clone()),
        thread_id: message
            .thread_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| message_ref.thread_id.clone()),
        headers,
        body_available,
    }
}
