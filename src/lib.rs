//! mapstyle - map style transfer with a vision model in the loop
//!
//! A base style document is restyled after a reference image: the model
//! captions the image, designs a first set of paint edits, then reviews each
//! render against the reference and asks for revisions until it accepts.

pub mod artifact;
pub mod error;
pub mod id;
pub mod llm;
pub mod prompt;
pub mod render;
pub mod response;
pub mod retry;
pub mod runner;
pub mod session;
pub mod style;
pub mod transcript;

pub use error::{Result, StylerError};
