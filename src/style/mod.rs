//! Style document model and edit application
//!
//! This module provides:
//! - `StyleDocument` / `Layer` / `PropertyValue`: the document being refined
//! - `EditStructure`: validated edits parsed from model replies
//! - `apply_edits`: the lenient, idempotent merge of edits into a document
//! - `LayerInventory`: per-category listing of layers used to build prompts

pub mod apply;
pub mod document;
pub mod edit;
pub mod inventory;

pub use apply::{ApplyReport, apply_edits, apply_edits_with_report};
pub use document::{ICON_CATEGORY, Layer, LayerKind, LayerRole, PropertyValue, StyleDocument, Viewport};
pub use edit::{CategoryEdits, EditStructure, IconBrief, LayerEdit, LayerId};
pub use inventory::{CategoryGroup, InventoryEntry, LayerInventory};
