use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::gmail_api::client::MailboxApi;
use crate::types::Label;

/// Finds a label by exact, case-sensitive display name.
pub async fn resolve_label<A: MailboxApi + ?Sized>(api: &A, name: &str) -> Result<Label> {
    let labels = api.list_labels().await?;

    if labels.is_empty() {
        warn!("No labels found.");
        return Err(Error::LabelNotFound(name.to_string()));
    }

    match labels.into_iter().find(|label| label.name == name) {
        Some(label) => {
            info!(label = %label.name, id = %label.id, "Resolved label");
            Ok(label)
        }
        None => {
            warn!("No {} label", name);
            Err(Error::LabelNotFound(name.to_string()))
        }
    }
}
