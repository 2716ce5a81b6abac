//! Prompt Loader - Read template overrides from a directory
//!
//! A directory may hold `caption.hbs`, `design.hbs` or `review.hbs`; any file
//! found replaces the built-in template of the same name.

use std::path::{Path, PathBuf};

use crate::error::{Result, StylerError};

/// Template file extension
const TEMPLATE_EXT: &str = "hbs";

pub struct PromptLoader {
    templates_dir: PathBuf,
}

impl PromptLoader {
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        Self {
            templates_dir: templates_dir.as_ref().to_path_buf(),
        }
    }

    /// Load one template, `None` if the directory has no file for it.
    ///
    /// A configured directory that does not exist is a configuration error.
    pub fn load(&self, name: &str) -> Result<Option<String>> {
        if !self.templates_dir.is_dir() {
            return Err(StylerError::Config(format!(
                "Templates directory {:?} does not exist",
                self.templates_dir
            )));
        }
        let path = self.template_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            StylerError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to load template '{}' from {:?}: {}", name, path, e),
            ))
        })?;
        Ok(Some(content))
    }

    fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.{}", name, TEMPLATE_EXT))
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_present_and_missing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("caption.hbs"), "Describe {{thing}}").unwrap();
        let loader = PromptLoader::new(temp.path());

        assert_eq!(loader.load("caption").unwrap().as_deref(), Some("Describe {{thing}}"));
        assert!(loader.load("review").unwrap().is_none());
    }

    #[test]
    fn test_missing_dir_is_config_error() {
        let loader = PromptLoader::new("/nonexistent/prompts");
        assert!(matches!(loader.load("caption"), Err(StylerError::Config(_))));
    }
}
