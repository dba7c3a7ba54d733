use crate::types::MessagePart;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::Engine;

// Gmail sends part data as base64url, sometimes padded and sometimes not
fn decode_part_data(data: &str) -> Option<String> {
    let decoded = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    String::from_utf8(decoded).ok()
}

/// Depth-first search for the first non-empty part of `mime_type`.
pub fn extract_body(payload: &MessagePart, mime_type: &str) -> Option<String> {
    if payload.mime_type.as_deref() == Some(mime_type) {
        if let Some(text) = payload
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .and_then(decode_part_data)
        {
            return Some(text);
        }
    }

    payload
        .parts
        .iter()
        .flatten()
        .filter_map(|part| extract_body(part, mime_type))
        .find(|text| !text.trim().is_empty())
}

pub fn extract_plain_text_body(payload: &MessagePart) -> Option<String> {
    extract_body(payload, "text/plain")
}

pub fn extract_html_body(payload: &MessagePart) -> Option<String> {
    extract_body(payload, "text/html")
}

/// True when the payload carries a readable text or HTML body.
pub fn has_readable_body(payload: &MessagePart) -> bool {
    [extract_plain_text_body(payload), extract_html_body(payload)]
        .iter()
        .flatten()
        .any(|text| !text.trim().is_empty())
}
