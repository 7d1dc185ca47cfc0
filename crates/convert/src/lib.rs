//! Conversion of rendered presentations to PDF, and the generation
//! pipeline tying the template renderer and the converter together.

pub mod pipeline;
pub mod soffice;

pub use pipeline::{ScratchDir, StudyGenerator};
pub use soffice::{DocumentConverter, SofficeConverter};
