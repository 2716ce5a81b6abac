//! Stage conversations.
//!
//! Each stage opens with the rendered instruction, an assistant "OK", then
//! alternates image turns with short acknowledgments before the final ask.

use serde::Serialize;

use super::render::PromptRenderer;
use super::templates::{CAPTION, DESIGN, REVIEW};
use crate::error::Result;
use crate::llm::{Conversation, Message};
use crate::response::verdict::ACTION_FIELD;
use crate::style::edit::{DESIGN_WRAPPER, REVISION_WRAPPER};
use crate::style::{CategoryGroup, LayerInventory};

const ACK: &str = "OK";
const ACK_REFERENCE_FOR_DESCRIPTION: &str = "I have received the reference image, please upload the description.";
const ACK_REFERENCE_FOR_MAP: &str = "I have received the reference image, please upload the map.";
const ACK_MAP: &str = "I have received the map.";
const REVIEW_FINAL_ASK: &str = "Please provide your answer. Since maps also need to convey information effectively, \
it is not necessary for two images to have exactly the same style. Remember just return the JSON file, \
and note that you do not need to modify all map elements.";

#[derive(Serialize)]
struct StageContext<'a> {
    groups: &'a [CategoryGroup],
    format: String,
}

pub struct PromptBuilder {
    renderer: PromptRenderer,
}

impl PromptBuilder {
    pub fn new(renderer: PromptRenderer) -> Self {
        Self { renderer }
    }

    /// Builder over the built-in templates
    pub fn with_builtins() -> Result<Self> {
        Ok(Self::new(PromptRenderer::with_builtins()?))
    }

    /// Instruction, acknowledgment, reference image.
    pub fn caption(&self, reference_url: &str) -> Result<Conversation> {
        let instruction = self.renderer.render_named(CAPTION, &serde_json::json!({}))?;
        Ok(Conversation::new(vec![
            Message::user(instruction),
            Message::assistant(ACK),
            Message::user_image(reference_url),
        ]))
    }

    /// Instruction with the full inventory, reference image, then the caption.
    pub fn design(&self, reference_url: &str, caption: &str, inventory: &LayerInventory) -> Result<Conversation> {
        let context = StageContext {
            groups: &inventory.groups,
            format: design_format(inventory),
        };
        let instruction = self.renderer.render_named(DESIGN, &context)?;
        Ok(Conversation::new(vec![
            Message::user(instruction),
            Message::assistant(ACK),
            Message::user_image(reference_url),
            Message::assistant(ACK_REFERENCE_FOR_DESCRIPTION),
            Message::user(format!(
                "[Description]:\n{}\nRemember just return the JSON file.",
                caption
            )),
        ]))
    }

    /// Instruction with the reviewable inventory, reference and map images,
    /// then the verdict request.
    pub fn review(
        &self,
        reference_url: &str,
        map_url: &str,
        inventory: &LayerInventory,
        iteration: u32,
    ) -> Result<Conversation> {
        let context = StageContext {
            groups: &inventory.groups,
            format: review_format(inventory),
        };
        let instruction = self.renderer.render_named(REVIEW, &context)?;
        Ok(Conversation::new(vec![
            Message::user(instruction),
            Message::assistant(ACK),
            Message::user_image(reference_url),
            Message::assistant(ACK_REFERENCE_FOR_MAP),
            Message::user_image(map_url),
            Message::assistant(ACK_MAP),
            Message::user(REVIEW_FINAL_ASK),
        ])
        .for_iteration(iteration))
    }
}

fn quoted_fields(fields: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    fields
        .into_iter()
        .map(|f| format!("\"{}\": ...", f.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn category_blocks(inventory: &LayerInventory, with_explanations: bool) -> String {
    let mut out = String::new();
    for (i, group) in inventory.groups.iter().enumerate() {
        out.push_str(&format!("        \"{}\": {{\n", group.category));
        for (j, layer) in group.layers.iter().enumerate() {
            let fields = if group.is_icon {
                quoted_fields(["explanation", "expectation"])
            } else if with_explanations {
                quoted_fields(std::iter::once("explanation").chain(layer.properties.iter().map(String::as_str)))
            } else {
                quoted_fields(&layer.properties)
            };
            let comma = if j + 1 < group.layers.len() { "," } else { "" };
            out.push_str(&format!("            \"{}\": {{{}}}{}\n", layer.name, fields, comma));
        }
        let comma = if i + 1 < inventory.groups.len() { "," } else { "" };
        out.push_str(&format!("        }}{}\n", comma));
    }
    out
}

/// Skeleton of the design reply.
pub fn design_format(inventory: &LayerInventory) -> String {
    format!(
        "{{\n    \"reasoning\": ...,\n    \"{}\": {{\n{}    }}\n}}",
        DESIGN_WRAPPER,
        category_blocks(inventory, true)
    )
}

/// Skeleton of the review reply.
pub fn review_format(inventory: &LayerInventory) -> String {
    format!(
        "{{\n    \"{}\": \"Revision\",\n    \"{}\": {{\n{}    }}\n}}",
        ACTION_FIELD,
        REVISION_WRAPPER,
        category_blocks(inventory, false)
    )
}
