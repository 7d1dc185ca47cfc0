//! Runtime settings shared by the command-line and web shells.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the client/cargo lookup table.
pub const DEFAULT_TABLE_PATH: &str = "relacao_empresas_cargas.csv";

/// Default location of the presentation template.
pub const DEFAULT_TEMPLATE_PATH: &str = "template_propostas.pptx";

/// Default conversion executable.
pub const DEFAULT_CONVERTER: &str = "soffice";

/// Paths and tools used to generate a study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// CSV lookup table (entity, cargo, cargo tax id, cargo code).
    pub table_path: PathBuf,

    /// PPTX template containing the placeholders.
    pub template_path: PathBuf,

    /// Conversion executable, looked up on `PATH` unless it is a path.
    pub converter: String,

    /// Arguments placed before the conversion arguments,
    /// e.g. `run org.libreoffice.LibreOffice` when `converter` is `flatpak`.
    pub launcher_args: Vec<String>,

    /// Parent directory for per-request scratch directories (system temp dir if unset).
    pub scratch_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from(DEFAULT_TABLE_PATH),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            converter: DEFAULT_CONVERTER.to_string(),
            launcher_args: Vec::new(),
            scratch_root: None,
        }
    }
}

impl Settings {
    /// Create settings with the default paths.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.table_path = path.into();
        self
    }

    pub fn with_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = path.into();
        self
    }

    /// Use a different conversion executable.
    pub fn with_converter(mut self, program: impl Into<String>) -> Self {
        self.converter = program.into();
        self
    }

    pub fn with_launcher_args(mut self, args: Vec<String>) -> Self {
        self.launcher_args = args;
        self
    }

    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }
}
