//! Iteration records: one per review turn, appended to the session transcript.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::response::Verdict;
use crate::style::EditStructure;

/// Rendered image a review consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// `origin`, `R1`, `R2`, ...
    pub tag: String,
    pub path: PathBuf,
    /// Hex SHA-256 of the image bytes.
    pub sha256: String,
}

impl ArtifactRef {
    pub fn new(tag: impl Into<String>, path: PathBuf, sha256: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            path,
            sha256: sha256.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Starts at 1.
    pub iteration: u32,
    pub artifact: ArtifactRef,
    pub verdict: Verdict,
    /// Edits applied as a result of this review, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edits: Option<EditStructure>,
    pub recorded_at: DateTime<Utc>,
}

impl IterationRecord {
    pub fn new(iteration: u32, artifact: ArtifactRef, verdict: Verdict, edits: Option<EditStructure>) -> Self {
        Self {
            iteration,
            artifact,
            verdict,
            edits,
            recorded_at: Utc::now(),
        }
    }
}
