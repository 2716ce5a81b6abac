//! Pulls the fenced JSON payload out of a free-text model reply.

use serde_json::Value;

use crate::error::{Result, StylerError};

const FENCE: &str = "```";
const PAYLOAD_TAG: &str = "json";

/// Locate the body of the first ```` ```json ```` block.
///
/// The language tag is matched case-insensitively. If the reply carries more
/// than one block the first wins.
pub fn extract_fenced_payload(text: &str) -> Result<&str> {
    let mut blocks = fenced_blocks(text);
    let first = blocks
        .next()
        .ok_or_else(|| StylerError::MalformedResponse("no ```json block in reply".to_string()))?;

    let extra = blocks.count();
    if extra > 0 {
        log::warn!("Reply contains {} additional ```json blocks, using the first", extra);
    }
    Ok(first)
}

/// Extract and parse the fenced payload.
pub fn extract_payload(text: &str) -> Result<Value> {
    let body = extract_fenced_payload(text)?;
    serde_json::from_str(body.trim()).map_err(|e| StylerError::InvalidPayload(format!("payload is not valid JSON: {}", e)))
}

/// Wrap a payload the way the reasoning service is asked to reply.
pub fn fence_payload(payload: &Value) -> String {
    let body = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    format!("{}{}\n{}\n{}", FENCE, PAYLOAD_TAG, body, FENCE)
}

fn fenced_blocks(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        loop {
            let open = rest.find(FENCE)?;
            let after_fence = &rest[open + FENCE.len()..];
            let tagged = after_fence
                .get(..PAYLOAD_TAG.len())
                .is_some_and(|tag| tag.eq_ignore_ascii_case(PAYLOAD_TAG));

            if !tagged {
                // Skip an untagged or differently tagged block entirely.
                let close = after_fence.find(FENCE)?;
                rest = &after_fence[close + FENCE.len()..];
                continue;
            }

            let body_start = &after_fence[PAYLOAD_TAG.len()..];
            let close = body_start.find(FENCE)?;
            let body = &body_start[..close];
            rest = &body_start[close + FENCE.len()..];
            return Some(body);
        }
    })
}
