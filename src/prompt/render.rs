//! Prompt Renderer - Render templates with context variables using Handlebars

use handlebars::Handlebars;
use serde::Serialize;

use super::loader::PromptLoader;
use super::templates::BUILTIN_TEMPLATES;
use crate::error::{Result, StylerError};

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create an empty renderer
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Renderer with the built-in stage templates registered
    pub fn with_builtins() -> Result<Self> {
        let mut renderer = Self::new();
        for (name, template) in BUILTIN_TEMPLATES {
            renderer.register_template(name, template)?;
        }
        Ok(renderer)
    }

    /// Replace built-in templates with any the loader's directory provides
    pub fn apply_overrides(&mut self, loader: &PromptLoader) -> Result<usize> {
        let mut replaced = 0;
        for (name, _) in BUILTIN_TEMPLATES {
            if let Some(template) = loader.load(name)? {
                log::info!("Using prompt override {:?} for {}", loader.templates_dir(), name);
                self.register_template(name, &template)?;
                replaced += 1;
            }
        }
        Ok(replaced)
    }

    /// Render a template string with any serializable context
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| StylerError::Config(format!("Failed to render template: {}", e)))
    }

    /// Register a named template for later use
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| StylerError::Config(format!("Failed to register template '{}': {}", name, e)))
    }

    /// Render a previously registered template
    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| StylerError::Config(format!("Failed to render template '{}': {}", name, e)))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.get_template(name).is_some()
    }
}
