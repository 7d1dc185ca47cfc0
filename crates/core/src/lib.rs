//! Core domain types, lookup table loading and configuration
//! for feasibility study generation.

pub mod config;
pub mod error;
pub mod lookup;
pub mod types;

pub use config::Settings;
pub use error::{ConversionError, Error, LoadError, Result, TemplateError};
pub use lookup::{LookupTable, TableCache};
pub use types::{LookupRecord, RenderedArtifact, Selection, PLACEHOLDER_CARGO, PLACEHOLDER_CLIENT};
