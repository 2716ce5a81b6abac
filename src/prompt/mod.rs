//! Prompt System - Stage templates and conversation building
//!
//! Built-in Handlebars templates for the caption, design and review stages,
//! optional overrides from a directory, and the builders that wrap rendered
//! instructions into multi-turn conversations.

mod builder;
mod loader;
mod render;
mod templates;

pub use builder::{PromptBuilder, design_format, review_format};
pub use loader::PromptLoader;
pub use render::PromptRenderer;
pub use templates::{CAPTION, DESIGN, REVIEW};
