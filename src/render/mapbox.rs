//! Mapbox Styles API gateway
//!
//! Publishes a style with `POST styles/v1/{user}` and renders it through the
//! Static Images endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::gateway::{RenderError, RenderGateway, StyleId};
use crate::style::{StyleDocument, Viewport};

pub const DEFAULT_API_BASE: &str = "https://api.mapbox.com";

/// Environment variable holding the access token
pub const TOKEN_ENV: &str = "MAPBOX_TOKEN";

/// Environment variable holding the account name
pub const USERNAME_ENV: &str = "MAPBOX_USERNAME";

#[derive(Debug, Clone)]
pub struct MapboxConfig {
    pub api_base: String,
    pub username: String,
    pub timeout: Duration,
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            username: String::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct MapboxGateway {
    client: Client,
    token: String,
    config: MapboxConfig,
}

impl MapboxGateway {
    /// Create a gateway, reading MAPBOX_TOKEN from the environment
    pub fn new(config: MapboxConfig) -> Result<Self, RenderError> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| RenderError::MissingCredential {
            env_var: TOKEN_ENV.to_string(),
        })?;
        Self::with_token(token, config)
    }

    pub fn with_token(token: String, config: MapboxConfig) -> Result<Self, RenderError> {
        if config.username.trim().is_empty() {
            return Err(RenderError::MissingCredential {
                env_var: USERNAME_ENV.to_string(),
            });
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, token, config })
    }

    fn base(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }

    fn publish_url(&self) -> String {
        format!("{}/styles/v1/{}", self.base(), self.config.username)
    }

    fn static_url(&self, style_id: &StyleId, viewport: &Viewport) -> String {
        format!(
            "{}/styles/v1/{}/{}/static/{},{},{}/{}x{}",
            self.base(),
            self.config.username,
            style_id,
            viewport.longitude,
            viewport.latitude,
            viewport.zoom,
            viewport.width,
            viewport.height
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RenderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        Err(RenderError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull the style id out of a publish response body.
fn style_id_from_body(body: &Value) -> Result<StyleId, RenderError> {
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| RenderError::Publish(format!("publish response has no id: {}", body)))?;
    StyleId::parse(id)
}

#[async_trait]
impl RenderGateway for MapboxGateway {
    async fn publish(&self, document: &StyleDocument) -> Result<StyleId, RenderError> {
        log::debug!("Publishing style {} to {}", document.name, self.publish_url());
        let response = self
            .client
            .post(self.publish_url())
            .query(&[("access_token", &self.token)])
            .json(document)
            .send()
            .await?;
        let body: Value = Self::check(response).await?.json().await?;
        let style_id = style_id_from_body(&body)?;
        log::info!("Published style {}", style_id);
        Ok(style_id)
    }

    async fn render(&self, style_id: &StyleId, viewport: &Viewport) -> Result<Vec<u8>, RenderError> {
        let url = self.static_url(style_id, viewport);
        log::debug!("Rendering {}", url);
        let response = self
            .client
            .get(url)
            .query(&[("access_token", &self.token)])
            .send()
            .await?;
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

impl std::fmt::Debug for MapboxGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapboxGateway")
            .field("api_base", &self.config.api_base)
            .field("username", &self.config.username)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway() -> MapboxGateway {
        let config = MapboxConfig {
            username: "cartographer".to_string(),
            ..Default::default()
        };
        MapboxGateway::with_token("pk.secret".to_string(), config).unwrap()
    }

    #[test]
    fn test_urls() {
        let gateway = gateway();
        assert_eq!(gateway.publish_url(), "https://api.mapbox.com/styles/v1/cartographer");

        let viewport = Viewport {
            longitude: -122.4,
            latitude: 37.8,
            zoom: 12.5,
            width: 600,
            height: 400,
            resolution: None,
        };
        let id = StyleId::parse("ck42").unwrap();
        assert_eq!(
            gateway.static_url(&id, &viewport),
            "https://api.mapbox.com/styles/v1/cartographer/ck42/static/-122.4,37.8,12.5/600x400"
        );
    }

    #[test]
    fn test_style_id_from_body() {
        assert_eq!(style_id_from_body(&json!({"id": "ck42", "name": "x"})).unwrap().as_str(), "ck42");
        assert!(matches!(
            style_id_from_body(&json!({"message": "Unauthorized"})),
            Err(RenderError::Publish(_))
        ));
        assert!(style_id_from_body(&json!({"id": ""})).is_err());
    }

    #[test]
    fn test_username_required() {
        let result = MapboxGateway::with_token("pk".to_string(), MapboxConfig::default());
        assert!(matches!(result, Err(RenderError::MissingCredential { .. })));
    }

    #[test]
    fn test_debug_hides_token() {
        let debug_str = format!("{:?}", gateway());
        assert!(debug_str.contains("cartographer"));
        assert!(!debug_str.contains("pk.secret"));
    }
}
