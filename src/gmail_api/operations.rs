use tracing::{info, warn};

use crate::error::Result;
use crate::gmail_api::client::MailboxApi;
use crate::types::{OutboundReply, ParsedMessage, SentMessage};

pub const UNREAD_LABEL: &str = "UNREAD";

/// What happened to a message once its reply went out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub sent: SentMessage,
    /// `false` means the message is still unread and the next run replies again.
    pub marked_read: bool,
}

// Send the reply into the source thread
pub async fn send_reply<A: MailboxApi + ?Sized>(api: &A, reply: &OutboundReply) -> Result<SentMessage> {
    api.send_message(&reply.raw, &reply.thread_id).await
}

// Mark a message as read by removing the UNREAD label
pub async fn mark_read<A: MailboxApi + ?Sized>(api: &A, message_id: &str) -> Result<()> {
    api.modify_message(message_id, &[], &[UNREAD_LABEL.to_string()])
        .await
}

/// Sends `reply`, then marks the source read.
///
/// Send comes first: a failure between the two leaves the message unread and
/// it gets a second reply later, instead of being marked read with no reply.
/// A failed send returns the error without touching the source message.
pub async fn process<A: MailboxApi + ?Sized>(
    api: &A,
    parsed: &ParsedMessage,
    reply: &OutboundReply,
) -> Result<Delivery> {
    let sent = send_reply(api, reply).await?;
    info!(id = %parsed.id, reply_id = %sent.id, thread_id = %reply.thread_id, "Reply sent");

    let marked_read = match mark_read(api, &parsed.id).await {
        Ok(()) => true,
        Err(e) => {
            warn!(id = %parsed.id, error = %e, "Reply sent but message is still unread; it will be answered again on the next run");
            false
        }
    };

    Ok(Delivery { sent, marked_read })
}
