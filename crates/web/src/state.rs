//! Shared state for the web form.

use estudo_convert::StudyGenerator;
use estudo_core::{Settings, TableCache};
use std::sync::Arc;

/// State passed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Memoised lookup table.
    pub tables: Arc<TableCache>,

    /// Render → convert pipeline.
    pub generator: Arc<StudyGenerator>,
}

impl AppState {
    pub fn new(tables: TableCache, generator: StudyGenerator) -> Self {
        Self {
            tables: Arc::new(tables),
            generator: Arc::new(generator),
        }
    }

    /// Build the state described by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            TableCache::new(&settings.table_path),
            StudyGenerator::from_settings(settings),
        )
    }
}
