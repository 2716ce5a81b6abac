//! Style publishing and static map rendering.
//!
//! `RenderGateway` is the seam to the style service: publish a document, get
//! a style id back, render that id at a viewport. `MapboxGateway` talks to the
//! real service; `MockRenderGateway` serves tests.

pub mod gateway;
pub mod mapbox;

pub use gateway::{MockRenderGateway, RenderError, RenderGateway, StyleId};
pub use mapbox::{MapboxConfig, MapboxGateway};
