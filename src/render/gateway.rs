//! Render gateway trait, errors, and a counting mock

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::style::{StyleDocument, Viewport};

/// Identifier the style service assigns to a published document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleId(String);

impl StyleId {
    /// Wrap a service-assigned id; blank ids are rejected.
    pub fn parse(raw: impl Into<String>) -> Result<Self, RenderError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(RenderError::Publish("style service returned an empty id".to_string()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StyleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Publish succeeded at the transport level but yielded no usable id
    #[error("{0}")]
    Publish(String),

    #[error("style service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("missing credential: environment variable {env_var} not set")]
    MissingCredential { env_var: String },

    /// Scripted failure from the mock gateway
    #[error("{0}")]
    Scripted(String),
}

#[async_trait]
pub trait RenderGateway: Send + Sync {
    /// Upload a style document and return its id.
    async fn publish(&self, document: &StyleDocument) -> Result<StyleId, RenderError>;

    /// Render a published style as PNG bytes.
    async fn render(&self, style_id: &StyleId, viewport: &Viewport) -> Result<Vec<u8>, RenderError>;
}

/// Gateway stub that records what it is asked to do.
///
/// Published styles get ids `style-1`, `style-2`, ...; renders return a small
/// byte string naming the style. Failures can be queued per operation.
#[derive(Default)]
pub struct MockRenderGateway {
    published: Mutex<Vec<StyleDocument>>,
    rendered: Mutex<Vec<StyleId>>,
    publish_failures: Mutex<VecDeque<RenderError>>,
    render_failures: Mutex<VecDeque<RenderError>>,
}

impl MockRenderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next publish call with `error`.
    pub fn fail_next_publish(&self, error: RenderError) {
        if let Ok(mut queue) = self.publish_failures.lock() {
            queue.push_back(error);
        }
    }

    /// Fail the next render call with `error`.
    pub fn fail_next_render(&self, error: RenderError) {
        if let Ok(mut queue) = self.render_failures.lock() {
            queue.push_back(error);
        }
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn render_count(&self) -> usize {
        self.rendered.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every document published so far, in order.
    pub fn published(&self) -> Vec<StyleDocument> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Every style id rendered so far, in order.
    pub fn rendered(&self) -> Vec<StyleId> {
        self.rendered.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RenderGateway for MockRenderGateway {
    async fn publish(&self, document: &StyleDocument) -> Result<StyleId, RenderError> {
        if let Some(error) = self.publish_failures.lock().ok().and_then(|mut q| q.pop_front()) {
            return Err(error);
        }
        let mut published = self
            .published
            .lock()
            .map_err(|e| RenderError::Scripted(e.to_string()))?;
        published.push(document.clone());
        StyleId::parse(format!("style-{}", published.len()))
    }

    async fn render(&self, style_id: &StyleId, _viewport: &Viewport) -> Result<Vec<u8>, RenderError> {
        if let Some(error) = self.render_failures.lock().ok().and_then(|mut q| q.pop_front()) {
            return Err(error);
        }
        let mut rendered = self.rendered.lock().map_err(|e| RenderError::Scripted(e.to_string()))?;
        rendered.push(style_id.clone());
        Ok(format!("png:{}", style_id).into_bytes())
    }
}
