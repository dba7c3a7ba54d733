//! Gmail API module split into logical submodules
//!
//! This module provides all Gmail API functionality organized into:
//! - auth: OAuth token validation, refresh and interactive grant
//! - client: The REST client and the `MailboxApi` seam
//! - labels: Label lookup by name
//! - messages: Unread discovery and full-message fetch
//! - operations: Sending replies and marking messages read

pub mod auth;
pub mod client;
pub mod labels;
pub mod messages;
pub mod operations;

pub use auth::{AuthSession, CodePrompt, NoPrompt, StdinPrompt, Token};
pub use client::{GmailClient, MailboxApi};
pub use labels::resolve_label;
pub use messages::{fetch_message, list_unread};
pub use operations::{mark_read, process, send_reply, Delivery};
