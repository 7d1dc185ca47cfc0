//! Domain types for the lookup table, user selections and generated documents.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Placeholder replaced with the client (entity) name.
pub const PLACEHOLDER_CLIENT: &str = "{{NOME_CLIENTE}}";

/// Placeholder replaced with the cargo name.
pub const PLACEHOLDER_CARGO: &str = "{{NOME_CARGA}}";

/// MIME type of the generated study.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Any whitespace character, replaced with `_` in download filenames.
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s").unwrap());

/// One row of the client/cargo lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRecord {
    /// Corporate name of the client.
    pub entity_name: String,

    /// Name of the cargo (load) associated with the client.
    pub cargo_name: String,

    /// Tax identifier of the cargo.
    pub cargo_tax_id: String,

    /// Internal cargo code.
    pub cargo_code: String,
}

/// A client/cargo pair chosen by the user for one generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub entity_name: String,
    pub cargo_name: String,
}

impl Selection {
    /// Create a new selection.
    pub fn new(entity_name: impl Into<String>, cargo_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            cargo_name: cargo_name.into(),
        }
    }

    /// Whether both the entity and the cargo have been chosen.
    pub fn is_complete(&self) -> bool {
        !self.entity_name.is_empty() && !self.cargo_name.is_empty()
    }

    /// Placeholder substitutions for this selection, in application order.
    pub fn substitutions(&self) -> [(&'static str, &str); 2] {
        [
            (PLACEHOLDER_CLIENT, self.entity_name.as_str()),
            (PLACEHOLDER_CARGO, self.cargo_name.as_str()),
        ]
    }

    /// Suggested download name: `estudo<Entity>_<Cargo>.pdf`.
    ///
    /// Whitespace inside each component becomes `_`.
    pub fn download_filename(&self) -> String {
        format!(
            "estudo{}_{}.pdf",
            WHITESPACE_REGEX.replace_all(&self.entity_name, "_"),
            WHITESPACE_REGEX.replace_all(&self.cargo_name, "_")
        )
    }
}

/// A generated study, ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// Suggested filename for the download.
    pub filename: String,

    /// PDF bytes.
    pub bytes: Vec<u8>,
}

impl RenderedArtifact {
    /// Wrap converted bytes for a selection.
    pub fn for_selection(selection: &Selection, bytes: Vec<u8>) -> Self {
        Self {
            filename: selection.download_filename(),
            bytes,
        }
    }

    /// MIME type of the artifact.
    pub fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_filename() {
        let selection = Selection::new("Acme Ltd", "LFP 48V");
        assert_eq!(selection.download_filename(), "estudoAcme_Ltd_LFP_48V.pdf");
    }

    #[test]
    fn test_download_filename_other_whitespace() {
        let selection = Selection::new("Companhia\tEnergética  Sul", "Carga A");
        assert_eq!(
            selection.download_filename(),
            "estudoCompanhia_Energética__Sul_Carga_A.pdf"
        );
    }

    #[test]
    fn test_is_complete() {
        assert!(!Selection::default().is_complete());
        assert!(!Selection::new("Acme Ltd", "").is_complete());
        assert!(!Selection::new("", "LFP 48V").is_complete());
        assert!(Selection::new("Acme Ltd", "LFP 48V").is_complete());
    }

    #[test]
    fn test_substitutions_order() {
        let selection = Selection::new("Acme Ltd", "Lithium-Ion Pack");
        assert_eq!(
            selection.substitutions(),
            [
                ("{{NOME_CLIENTE}}", "Acme Ltd"),
                ("{{NOME_CARGA}}", "Lithium-Ion Pack")
            ]
        );
    }

    #[test]
    fn test_artifact_for_selection() {
        let artifact = RenderedArtifact::for_selection(
            &Selection::new("Acme Ltd", "LFP 48V"),
            b"%PDF-1.7".to_vec(),
        );
        assert_eq!(artifact.filename, "estudoAcme_Ltd_LFP_48V.pdf");
        assert_eq!(artifact.content_type(), "application/pdf");
        assert_eq!(artifact.len(), 8);
    }
}
