//! Rendered images and the final style on disk.
//!
//! Renders are saved as `{name}_{tag}.png` in the output directory and handed
//! to the reasoning service as inline `data:` URLs.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::session::ArtifactRef;
use crate::style::StyleDocument;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    name: String,
}

impl ArtifactStore {
    /// Store for the document `name` under `dir`; the directory is created.
    pub fn new(dir: impl AsRef<Path>, name: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            name: file_stem_for(&name.into()),
        })
    }

    pub fn image_path(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.png", self.name, tag))
    }

    pub fn final_style_path(&self) -> PathBuf {
        self.dir.join(format!("{}_final.json", self.name))
    }

    /// Write a render and return its reference.
    pub fn save_image(&self, tag: &str, bytes: &[u8]) -> Result<ArtifactRef> {
        let path = self.image_path(tag);
        fs::write(&path, bytes)?;
        log::debug!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(ArtifactRef::new(tag, path, sha256_hex(bytes)))
    }

    /// Write the accepted style document.
    pub fn save_final_style(&self, document: &StyleDocument) -> Result<PathBuf> {
        let path = self.final_style_path();
        fs::write(&path, document.to_json_pretty()?)?;
        Ok(path)
    }
}

/// Document names become file name prefixes; separators and parent references are flattened.
fn file_stem_for(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
        .collect();
    let stem = stem.trim().trim_start_matches('.');
    if stem.is_empty() { "style".to_string() } else { stem.to_string() }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Inline `data:` URL for an image file.
pub fn path_to_data_url(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mime = mime_for_path(path).unwrap_or("image/png");
    Ok(bytes_to_data_url(&bytes, mime))
}

pub fn bytes_to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_follow_name_and_tag() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("out"), "harbor").unwrap();
        assert!(temp.path().join("out").is_dir());
        assert_eq!(store.image_path("origin"), temp.path().join("out/harbor_origin.png"));
        assert_eq!(store.image_path("R2"), temp.path().join("out/harbor_R2.png"));
        assert_eq!(store.final_style_path(), temp.path().join("out/harbor_final.json"));
    }

    #[test]
    fn test_name_with_separators_stays_in_dir() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path(), "../../etc/harbor").unwrap();
        let path = store.image_path("R1");
        assert_eq!(path.parent(), Some(temp.path()));
        assert_eq!(path, temp.path().join("_.._etc_harbor_R1.png"));

        let blank = ArtifactStore::new(temp.path(), "  ").unwrap();
        assert_eq!(blank.final_style_path(), temp.path().join("style_final.json"));
    }

    #[test]
    fn test_save_image_digest() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path(), "m").unwrap();
        let artifact = store.save_image("R1", b"abc").unwrap();
        assert_eq!(artifact.tag, "R1");
        assert_eq!(fs::read(&artifact.path).unwrap(), b"abc");
        assert_eq!(
            artifact.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_data_url_mime() {
        let temp = TempDir::new().unwrap();
        let jpg = temp.path().join("ref.JPG");
        fs::write(&jpg, b"hi").unwrap();
        assert_eq!(path_to_data_url(&jpg).unwrap(), "data:image/jpeg;base64,aGk=");

        let unknown = temp.path().join("ref.bin");
        fs::write(&unknown, b"hi").unwrap();
        assert!(path_to_data_url(&unknown).unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_missing_image_is_io_error() {
        let result = path_to_data_url(Path::new("/nonexistent/ref.png"));
        assert!(matches!(result, Err(crate::error::StylerError::Io(_))));
    }
}
