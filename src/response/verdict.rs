//! Review-turn verdict parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StylerError};
use crate::style::EditStructure;
use crate::style::edit::REVISION_WRAPPER;

/// Field carrying the verdict.
pub const ACTION_FIELD: &str = "Action";

/// Literal tag that ends the loop.
pub const ACCEPT_TAG: &str = "Accept";

/// Verdict kind recorded in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Revision,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Accept => write!(f, "Accept"),
            Verdict::Revision => write!(f, "Revision"),
        }
    }
}

/// Parsed review reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewVerdict {
    Accept,
    Revision(EditStructure),
}

impl ReviewVerdict {
    pub fn kind(&self) -> Verdict {
        match self {
            ReviewVerdict::Accept => Verdict::Accept,
            ReviewVerdict::Revision(_) => Verdict::Revision,
        }
    }
}

/// Validate a review payload.
///
/// Anything other than the exact acceptance tag is a revision, and a revision
/// must carry a modification mapping.
pub fn parse_verdict(payload: &Value) -> Result<ReviewVerdict> {
    let action = payload
        .get(ACTION_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StylerError::InvalidPayload(format!("review payload has no '{}' field", ACTION_FIELD)))?;

    if action == ACCEPT_TAG {
        return Ok(ReviewVerdict::Accept);
    }

    let modification = payload
        .get(REVISION_WRAPPER)
        .ok_or_else(|| StylerError::InvalidPayload(format!("revision without '{}'", REVISION_WRAPPER)))?;
    let mut edits = EditStructure::from_payload(modification)?;
    if edits.reasoning.is_none() {
        edits.reasoning = payload.get("reasoning").and_then(Value::as_str).map(str::to_string);
    }
    Ok(ReviewVerdict::Revision(edits))
}
