//! In-memory model of a cartographic style document.
//!
//! Only the parts the refinement loop reads or edits are typed; every other
//! field of the style file is carried through untouched so the document can
//! be republished as-is.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StylerError};

/// Category key used for icon layers; its edits are descriptive only.
pub const ICON_CATEGORY: &str = "symbol_icon";

/// A complete style document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDocument {
    pub name: String,
    pub layers: Vec<Layer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Visual layer kinds understood by the style service.
///
/// Newer kinds (`slot`, `model`, `clip`, ...) load as `Other` and keep their type string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    Fill,
    Line,
    Symbol,
    Circle,
    FillExtrusion,
    Raster,
    Background,
    Heatmap,
    Hillshade,
    Sky,
    #[serde(untagged)]
    Other(String),
}

impl LayerKind {
    pub fn as_str(&self) -> &str {
        match self {
            LayerKind::Fill => "fill",
            LayerKind::Line => "line",
            LayerKind::Symbol => "symbol",
            LayerKind::Circle => "circle",
            LayerKind::FillExtrusion => "fill-extrusion",
            LayerKind::Raster => "raster",
            LayerKind::Background => "background",
            LayerKind::Heatmap => "heatmap",
            LayerKind::Hillshade => "hillshade",
            LayerKind::Sky => "sky",
            LayerKind::Other(kind) => kind,
        }
    }
}

/// Whether a layer draws text, an icon, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Plain,
    Label,
    Icon,
}

/// One layer of the style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub paint: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Layer {
    /// Icon if the layout names an icon image, label for any other layout.
    pub fn role(&self) -> LayerRole {
        match &self.layout {
            Some(layout) if layout.contains_key("icon-image") => LayerRole::Icon,
            Some(_) => LayerRole::Label,
            None => LayerRole::Plain,
        }
    }

    /// Category key the reasoning service groups this layer under.
    pub fn category(&self) -> String {
        match self.role() {
            LayerRole::Plain => self.kind.as_str().to_string(),
            LayerRole::Label => format!("{}_label", self.kind.as_str()),
            LayerRole::Icon => format!("{}_icon", self.kind.as_str()),
        }
    }

    /// Paint property names in document order.
    pub fn paint_properties(&self) -> Vec<&str> {
        self.paint.keys().map(String::as_str).collect()
    }
}

/// A paint property value as the edit rules see it.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Number, color, string, bool or object literal.
    Scalar(Value),
    /// Five-slot zoom-dependent expression; slot 3 is the current value.
    ZoomExpression([Value; 5]),
    /// Any other array expression.
    Expression(Vec<Value>),
}

impl PropertyValue {
    /// Index of the slot an edit overwrites inside a zoom expression.
    pub const CURRENT_SLOT: usize = 3;

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => match <[Value; 5]>::try_from(items) {
                Ok(slots) => PropertyValue::ZoomExpression(slots),
                Err(items) => PropertyValue::Expression(items),
            },
            other => PropertyValue::Scalar(other),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            PropertyValue::Scalar(value) => value,
            PropertyValue::ZoomExpression(slots) => Value::Array(slots.into()),
            PropertyValue::Expression(items) => Value::Array(items),
        }
    }

    /// Apply an edit: zoom expressions keep their metadata, anything else is replaced.
    pub fn overwritten(self, new_value: Value) -> Self {
        match self {
            PropertyValue::ZoomExpression(mut slots) => {
                slots[Self::CURRENT_SLOT] = new_value;
                PropertyValue::ZoomExpression(slots)
            }
            _ => PropertyValue::from_value(new_value),
        }
    }
}

/// Camera and output size for a static render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub width: u32,
    pub height: u32,
    pub resolution: Option<f64>,
}

impl StyleDocument {
    /// Load and validate a style document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| StylerError::InvalidStyle(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse and validate a style document from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let document: Self =
            serde_json::from_str(content).map_err(|e| StylerError::InvalidStyle(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Layer ids must be unique and non-empty.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for layer in &self.layers {
            if layer.id.trim().is_empty() {
                return Err(StylerError::InvalidStyle("layer with empty id".to_string()));
            }
            if !seen.insert(layer.id.as_str()) {
                return Err(StylerError::InvalidStyle(format!("duplicate layer id: {}", layer.id)));
            }
        }
        Ok(())
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub(crate) fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    /// Read the render viewport from `center`, `zoom` and the print metadata.
    pub fn viewport(&self) -> Result<Viewport> {
        let center = self
            .extra
            .get("center")
            .and_then(Value::as_array)
            .filter(|c| c.len() == 2)
            .ok_or_else(|| StylerError::InvalidStyle("missing center [lon, lat]".to_string()))?;
        let longitude = center[0]
            .as_f64()
            .ok_or_else(|| StylerError::InvalidStyle("center longitude is not a number".to_string()))?;
        let latitude = center[1]
            .as_f64()
            .ok_or_else(|| StylerError::InvalidStyle("center latitude is not a number".to_string()))?;
        let zoom = self
            .extra
            .get("zoom")
            .and_then(Value::as_f64)
            .ok_or_else(|| StylerError::InvalidStyle("missing zoom".to_string()))?;

        let print = self
            .extra
            .get("metadata")
            .and_then(|m| m.get("mapbox:print"))
            .ok_or_else(|| StylerError::InvalidStyle("missing metadata.mapbox:print".to_string()))?;
        let dimension = |key: &str| -> Result<u32> {
            print
                .get(key)
                .and_then(Value::as_f64)
                .filter(|v| *v > 0.0)
                .map(|v| v.round() as u32)
                .ok_or_else(|| StylerError::InvalidStyle(format!("missing print {}", key)))
        };

        Ok(Viewport {
            longitude,
            latitude,
            zoom,
            width: dimension("width")?,
            height: dimension("height")?,
            resolution: print.get("resolution").and_then(Value::as_f64),
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
