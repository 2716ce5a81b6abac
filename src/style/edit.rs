//! Structured edits produced by the design and review turns.
//!
//! The reasoning service returns loosely shaped JSON. It is validated here,
//! once, into a tagged union so that shape errors surface at the boundary and
//! the applier only ever sees well-formed edits.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::ICON_CATEGORY;
use crate::error::{Result, StylerError};

/// Wrapper key used by the design turn.
pub const DESIGN_WRAPPER: &str = "stylesheet";

/// Wrapper key used by the review turn.
pub const REVISION_WRAPPER: &str = "Modified style sheet";

/// A validated, non-empty layer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(StylerError::InvalidPayload("empty layer identifier".to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Property changes requested for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEdit {
    pub layer: LayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// New values keyed by paint property, in the order the service gave them.
    pub properties: Map<String, Value>,
}

/// Descriptive icon requirements for a human or downstream icon designer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconBrief {
    pub layer: LayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation: Option<String>,
}

/// Edits for one layer-kind category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryEdits {
    Paint { category: String, layers: Vec<LayerEdit> },
    IconDesign { briefs: Vec<IconBrief> },
}

/// Parsed output of a design or review turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditStructure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub categories: Vec<CategoryEdits>,
}

impl EditStructure {
    /// Validate a payload into an edit structure.
    ///
    /// Accepts either the bare category mapping or one wrapped under
    /// `stylesheet` / `Modified style sheet`.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let root = payload
            .as_object()
            .ok_or_else(|| StylerError::InvalidPayload("edit payload is not an object".to_string()))?;

        let reasoning = root.get("reasoning").and_then(text_of);
        let body = match root.get(DESIGN_WRAPPER).or_else(|| root.get(REVISION_WRAPPER)) {
            Some(inner) => inner
                .as_object()
                .ok_or_else(|| StylerError::InvalidPayload("wrapped style sheet is not an object".to_string()))?,
            None => root,
        };

        let mut categories = Vec::new();
        for (category, entries) in body {
            // Free-text siblings of the categories are logged, never applied.
            if matches!(category.as_str(), "reasoning" | "explanation" | "Action") {
                continue;
            }
            let Some(entries) = entries.as_object() else {
                log::debug!("Skipping non-object entry '{}' beside the categories", category);
                continue;
            };
            categories.push(parse_category(category, entries)?);
        }

        Ok(Self { reasoning, categories })
    }

    /// Number of property assignments that would be attempted.
    pub fn assignment_count(&self) -> usize {
        self.categories
            .iter()
            .map(|c| match c {
                CategoryEdits::Paint { layers, .. } => layers.iter().map(|l| l.properties.len()).sum(),
                CategoryEdits::IconDesign { .. } => 0,
            })
            .sum()
    }

    pub fn icon_briefs(&self) -> impl Iterator<Item = &IconBrief> {
        self.categories.iter().flat_map(|c| match c {
            CategoryEdits::IconDesign { briefs } => briefs.as_slice(),
            CategoryEdits::Paint { .. } => &[][..],
        })
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn parse_category(category: &str, entries: &Map<String, Value>) -> Result<CategoryEdits> {
    if category == ICON_CATEGORY {
        let mut briefs = Vec::new();
        for (layer, entry) in entries {
            let Some(entry) = layer_entry(category, layer, entry) else {
                continue;
            };
            briefs.push(IconBrief {
                layer: LayerId::parse(layer)?,
                explanation: entry.get("explanation").and_then(text_of),
                expectation: entry.get("expectation").and_then(text_of),
            });
        }
        return Ok(CategoryEdits::IconDesign { briefs });
    }

    let mut layers = Vec::new();
    for (layer, entry) in entries {
        let Some(entry) = layer_entry(category, layer, entry) else {
            continue;
        };
        let explanation = entry.get("explanation").and_then(text_of);
        let properties: Map<String, Value> = entry
            .iter()
            .filter(|(key, _)| key.as_str() != "explanation")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        layers.push(LayerEdit {
            layer: LayerId::parse(layer)?,
            explanation,
            properties,
        });
    }
    Ok(CategoryEdits::Paint {
        category: category.to_string(),
        layers,
    })
}

/// Layer entries are objects; anything else in a category is commentary.
fn layer_entry<'a>(category: &str, layer: &str, entry: &'a Value) -> Option<&'a Map<String, Value>> {
    let object = entry.as_object();
    if object.is_none() {
        log::debug!("Skipping non-object entry '{}' in category '{}'", layer, category);
    }
    object
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_mapping() {
        let edits = EditStructure::from_payload(&json!({"fill": {"water": {"fill-color": "#3399ff"}}})).unwrap();
        assert_eq!(edits.categories.len(), 1);
        match &edits.categories[0] {
            CategoryEdits::Paint { category, layers } => {
                assert_eq!(category, "fill");
                assert_eq!(layers[0].layer.as_str(), "water");
                assert_eq!(layers[0].properties["fill-color"], "#3399ff");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(edits.assignment_count(), 1);
    }

    #[test]
    fn test_design_wrapper_with_reasoning_and_explanations() {
        let payload = json!({
            "reasoning": "muted palette",
            "stylesheet": {
                "line": {"road": {"explanation": "thin grey roads", "line-color": "#999", "line-width": 1}},
                "symbol_icon": {"poi": {"explanation": "pins", "expectation": "a small red pin"}}
            }
        });
        let edits = EditStructure::from_payload(&payload).unwrap();
        assert_eq!(edits.reasoning.as_deref(), Some("muted palette"));
        assert_eq!(edits.assignment_count(), 2);

        let briefs: Vec<&IconBrief> = edits.icon_briefs().collect();
        assert_eq!(briefs.len(), 1);
        assert_eq!(briefs[0].expectation.as_deref(), Some("a small red pin"));

        match &edits.categories[0] {
            CategoryEdits::Paint { layers, .. } => {
                assert_eq!(layers[0].explanation.as_deref(), Some("thin grey roads"));
                assert!(!layers[0].properties.contains_key("explanation"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_revision_wrapper() {
        let payload = json!({"Action": "Revision", "Modified style sheet": {"fill": {"water": {"fill-opacity": 0.5}}}});
        let edits = EditStructure::from_payload(&payload).unwrap();
        assert_eq!(edits.assignment_count(), 1);
    }

    #[test]
    fn test_shape_errors_rejected() {
        assert!(matches!(
            EditStructure::from_payload(&json!(["not", "an", "object"])),
            Err(StylerError::InvalidPayload(_))
        ));
        assert!(matches!(
            EditStructure::from_payload(&json!({"stylesheet": "make it blue"})),
            Err(StylerError::InvalidPayload(_))
        ));
        assert!(matches!(
            EditStructure::from_payload(&json!({"fill": {" ": {"fill-color": "#fff"}}})),
            Err(StylerError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_commentary_inside_category_is_skipped() {
        let payload = json!({"fill": {"water": {"fill-color": "#3399ff"}, "explanation": "lighter water"}});
        let edits = EditStructure::from_payload(&payload).unwrap();
        assert_eq!(edits.assignment_count(), 1);
        match &edits.categories[0] {
            CategoryEdits::Paint { layers, .. } => {
                assert_eq!(layers.len(), 1);
                assert_eq!(layers[0].layer.as_str(), "water");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_commentary_beside_categories_is_skipped() {
        let payload = json!({
            "Action": "Revision",
            "Modified style sheet": {"fill": {"water": {"fill-color": "#3399ff"}}, "note": "only water"}
        });
        let edits = EditStructure::from_payload(&payload).unwrap();
        assert_eq!(edits.categories.len(), 1);
        assert_eq!(edits.assignment_count(), 1);

        let bare = EditStructure::from_payload(&json!({"fill": "water", "line": {"road": "#fff"}})).unwrap();
        assert_eq!(bare.assignment_count(), 0);
    }

    #[test]
    fn test_preserves_category_order() {
        let payload = json!({"line": {"a": {"line-color": "#1"}}, "fill": {"b": {"fill-color": "#2"}}});
        let edits = EditStructure::from_payload(&payload).unwrap();
        let names: Vec<&str> = edits
            .categories
            .iter()
            .map(|c| match c {
                CategoryEdits::Paint { category, .. } => category.as_str(),
                CategoryEdits::IconDesign { .. } => ICON_CATEGORY,
            })
            .collect();
        assert_eq!(names, vec!["line", "fill"]);
    }
}
