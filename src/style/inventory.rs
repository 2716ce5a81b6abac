//! Per-category listing of a document's layers.
//!
//! Prompts tell the reasoning service which elements exist and which paint
//! properties it may set; this is the data they are rendered from.

use serde::Serialize;

use super::document::{ICON_CATEGORY, LayerRole, StyleDocument};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryEntry {
    pub name: String,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub is_icon: bool,
    pub layers: Vec<InventoryEntry>,
    /// Union of the members' paint properties, first-seen order.
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerInventory {
    pub groups: Vec<CategoryGroup>,
}

impl LayerInventory {
    /// Inventory for the design turn: every layer, icons included.
    pub fn for_design(document: &StyleDocument) -> Self {
        Self::build(document, true)
    }

    /// Inventory for the review turn: icon layers are not reviewable.
    pub fn for_review(document: &StyleDocument) -> Self {
        Self::build(document, false)
    }

    fn build(document: &StyleDocument, include_icons: bool) -> Self {
        let mut groups: Vec<CategoryGroup> = Vec::new();

        for layer in &document.layers {
            if !include_icons && layer.role() == LayerRole::Icon {
                continue;
            }
            let category = layer.category();
            let properties: Vec<String> = layer.paint_properties().into_iter().map(str::to_string).collect();

            let index = match groups.iter().position(|g| g.category == category) {
                Some(index) => index,
                None => {
                    groups.push(CategoryGroup {
                        is_icon: category == ICON_CATEGORY,
                        category,
                        layers: Vec::new(),
                        properties: Vec::new(),
                    });
                    groups.len() - 1
                }
            };

            let group = &mut groups[index];
            for property in &properties {
                if !group.properties.contains(property) {
                    group.properties.push(property.clone());
                }
            }
            group.layers.push(InventoryEntry {
                name: layer.id.clone(),
                properties,
            });
        }

        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn layer_count(&self) -> usize {
        self.groups.iter().map(|g| g.layers.len()).sum()
    }
}
