//! PPTX (Office Open XML) template renderer.
//!
//! A .pptx file is a ZIP archive of XML parts. Rendering rewrites the text of
//! every slide part and copies every other part through untouched.

pub mod slide;
pub mod template;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use slide::{FrameKind, PlaceholderSubstitution, TextVisitor};
pub use template::{render_bytes, TemplateRenderer, RENDERED_FILE_NAME};
