//! Applies validated edits to a style document.
//!
//! Merging is lenient: edits that name a layer or paint property the document
//! does not have are dropped. Every assignment is a direct replace, so applying
//! the same edits twice yields the same document.

use serde_json::Value;

use super::document::{PropertyValue, StyleDocument};
use super::edit::{CategoryEdits, EditStructure};

/// Counts from one application, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
    pub icon_briefs: usize,
}

/// Return a new document with `edits` applied.
pub fn apply_edits(document: StyleDocument, edits: &EditStructure) -> StyleDocument {
    apply_edits_with_report(document, edits).0
}

/// Same as [`apply_edits`], also reporting what was applied and skipped.
pub fn apply_edits_with_report(mut document: StyleDocument, edits: &EditStructure) -> (StyleDocument, ApplyReport) {
    let mut report = ApplyReport::default();

    for category in &edits.categories {
        let layers = match category {
            CategoryEdits::Paint { layers, .. } => layers,
            CategoryEdits::IconDesign { briefs } => {
                report.icon_briefs += briefs.len();
                continue;
            }
        };

        for edit in layers {
            let Some(layer) = document.layer_mut(edit.layer.as_str()) else {
                log::debug!("Ignoring edit for unknown layer '{}'", edit.layer);
                report.skipped += edit.properties.len();
                continue;
            };

            for (property, new_value) in &edit.properties {
                match layer.paint.get_mut(property) {
                    Some(slot) => {
                        let current = std::mem::replace(slot, Value::Null);
                        *slot = PropertyValue::from_value(current)
                            .overwritten(new_value.clone())
                            .into_value();
                        report.applied += 1;
                    }
                    None => {
                        log::debug!("Ignoring unknown paint property '{}' on layer '{}'", property, layer.id);
                        report.skipped += 1;
                    }
                }
            }
        }
    }

    (document, report)
}
