//! Loop states and the reasoning stages that drive them.

use serde::{Deserialize, Serialize};

/// State machine positions of a refinement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    Captioned,
    StyleDesigned,
    Rendered,
    AwaitingReview,
    Revising,
    Accepted,
}

/// A step of the run that talks to an external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Caption,
    Design,
    Review,
    Publish,
    Render,
}

impl Stage {
    /// Section label used in the transcript and console.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Caption => "image appreciation",
            Stage::Design => "stylesheet design",
            Stage::Review => "map evaluation",
            Stage::Publish => "style publish",
            Stage::Render => "map render",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Review).unwrap(), "\"review\"");
        assert_eq!(Stage::Design.to_string(), "stylesheet design");
    }
}
