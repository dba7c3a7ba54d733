//! One pass over the label: discover, reply, mark read.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::gmail_api::client::MailboxApi;
use crate::gmail_api::{fetch_message, list_unread, process, resolve_label};
use crate::reply::compose_reply;
use crate::types::MessageRef;

pub const DEFAULT_LABEL: &str = "Recruiters";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub label: String,
    /// Compose replies but do not send them or touch the source messages.
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMessage {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub discovered: usize,
    pub replied: Vec<String>,
    /// Replied to, but the read-mark failed.
    pub left_unread: Vec<String>,
    /// Composed during a dry run; nothing was sent.
    pub previewed: Vec<String>,
    pub skipped: Vec<SkippedMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The label does not exist; nothing was looked at.
    LabelMissing,
    NothingToDo,
    Processed(RunReport),
}

/// Runs a single triage pass.
///
/// Failures that concern a single message are logged and recorded in the
/// report; the remaining messages are still processed. Label lookup and
/// discovery failures other than a missing label end the run.
pub async fn run<A: MailboxApi + ?Sized>(
    api: &A,
    config: &RunConfig,
    template: &[u8],
) -> Result<RunOutcome> {
    let label = match resolve_label(api, &config.label).await {
        Ok(label) => label,
        Err(Error::LabelNotFound(name)) => {
            info!(label = %name, "Label missing, nothing to process");
            return Ok(RunOutcome::LabelMissing);
        }
        Err(e) => return Err(e),
    };

    let unread = list_unread(api, &label.id).await?;
    if unread.is_empty() {
        info!("No new messages found.");
        return Ok(RunOutcome::NothingToDo);
    }

    let mut report = RunReport {
        discovered: unread.len(),
        ..RunReport::default()
    };

    for message_ref in &unread {
        match handle_message(api, message_ref, config, template).await {
            Ok(Handled::Previewed) => report.previewed.push(message_ref.id.clone()),
            Ok(Handled::Replied { marked_read }) => {
                report.replied.push(message_ref.id.clone());
                if !marked_read {
                    report.left_unread.push(message_ref.id.clone());
                }
            }
            Err(e) => {
                warn!(id = %message_ref.id, error = %e, "Skipping message");
                report.skipped.push(SkippedMessage {
                    id: message_ref.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        discovered = report.discovered,
        replied = report.replied.len(),
        skipped = report.skipped.len(),
        left_unread = report.left_unread.len(),
        previewed = report.previewed.len(),
        "Run complete"
    );
    Ok(RunOutcome::Processed(report))
}

enum Handled {
    Replied { marked_read: bool },
    Previewed,
}

async fn handle_message<A: MailboxApi + ?Sized>(
    api: &A,
    message_ref: &MessageRef,
    config: &RunConfig,
    template: &[u8],
) -> Result<Handled> {
    let parsed = fetch_message(api, message_ref).await?;
    if !parsed.body_available {
        info!(id = %parsed.id, "Source message has no readable body");
    }
    let reply = compose_reply(&parsed, template)?;

    if config.dry_run {
        info!(
            id = %parsed.id,
            thread_id = %reply.thread_id,
            to = parsed.header("from").unwrap_or_default(),
            "Dry run, reply not sent"
        );
        return Ok(Handled::Previewed);
    }

    let delivery = process(api, &parsed, &reply).await?;
    Ok(Handled::Replied {
        marked_read: delivery.marked_read,
    })
}
