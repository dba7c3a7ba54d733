//! Builds the threaded acknowledgement for a parsed message.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::Engine;

use crate::error::{Error, Result};
use crate::types::{OutboundReply, ParsedMessage};

pub const REPLY_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Blank line between the header block and the body.
pub const HEADER_BODY_SEPARATOR: &[u8] = b"\r\n\r\n";

// Header values are copied from the source message; a stray line break would
// start a new header
fn flatten(value: Option<&str>) -> String {
    value.unwrap_or_default().replace(['\r', '\n'], " ")
}

fn header_value(value: Option<&str>) -> String {
    flatten(value).trim().to_string()
}

fn references(parsed: &ParsedMessage) -> String {
    let original = header_value(parsed.header("references"));
    let message_id = header_value(parsed.header("message-id"));
    [original, message_id]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The unencoded RFC 5322 reply: From/To swapped, `Re:` subject, threading
/// headers, then `template` verbatim.
pub fn render_reply(parsed: &ParsedMessage, template: &[u8]) -> Result<Vec<u8>> {
    let from = parsed
        .header("to")
        .ok_or_else(|| Error::Compose(format!("message {} has no To header", parsed.id)))?;
    let to = parsed
        .header("from")
        .ok_or_else(|| Error::Compose(format!("message {} has no From header", parsed.id)))?;

    // Repeated replies stack prefixes ("Re:Re:...")
    let header_lines = [
        format!("From: {}", header_value(Some(from))),
        format!("To: {}", header_value(Some(to))),
        format!("Subject: Re:{}", flatten(parsed.header("subject"))),
        format!("In-Reply-To: {}", header_value(parsed.header("message-id"))),
        format!("References: {}", references(parsed)),
        format!("Content-Type: {}", REPLY_CONTENT_TYPE),
        "MIME-Version: 1.0".to_string(),
    ];

    let mut message = header_lines.join("\r\n").into_bytes();
    message.extend_from_slice(HEADER_BODY_SEPARATOR);
    message.extend_from_slice(template);
    Ok(message)
}

/// Renders the reply and encodes it the way `messages.send` expects raw
/// content: base64url without padding.
pub fn compose_reply(parsed: &ParsedMessage, template: &[u8]) -> Result<OutboundReply> {
    let message = render_reply(parsed, template)?;
    Ok(OutboundReply {
        raw: URL_SAFE_NO_PAD.encode(message),
        thread_id: parsed.thread_id.clone(),
    })
}
