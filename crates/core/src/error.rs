//! Error types for study generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the select → render → convert flow.
#[derive(Error, Debug)]
pub enum Error {
    /// The lookup table could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The rendered template could not be converted to PDF.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The selection is incomplete or not present in the lookup table.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Scratch directory or other filesystem failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure to load the client/cargo lookup table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The record source does not exist.
    #[error("Lookup table not found: {}", .path.display())]
    Missing { path: PathBuf },

    /// The record source exists but could not be read as a four-column CSV.
    #[error("Lookup table {} is malformed: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// Failure to render the presentation template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template file does not exist.
    #[error("Template not found: {}", .0.display())]
    MissingTemplate(PathBuf),

    /// ZIP archive error.
    #[error("Template archive error: {0}")]
    Archive(String),

    /// XML parsing or writing error in a slide part.
    #[error("Template XML error: {0}")]
    Xml(String),

    /// Failed to read the template or write the rendered copy.
    #[error("Template I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to convert the rendered presentation with the external tool.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The conversion executable is not on the search path.
    #[error("Conversion tool '{0}' not found; install LibreOffice to continue")]
    ToolMissing(String),

    /// The tool ran and reported failure.
    #[error("Conversion tool exited with {}: {stderr}", describe_code(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    /// The tool reported success but the expected PDF is not there.
    #[error(
        "Conversion produced no output at {}; directory contains: [{}]",
        .expected.display(),
        .listing.join(", ")
    )]
    OutputMissing {
        expected: PathBuf,
        listing: Vec<String>,
    },

    /// The tool could not be started, or its output could not be read.
    #[error("Conversion failed: {0}")]
    InvocationFailed(String),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_message_keeps_stderr() {
        let err = ConversionError::NonZeroExit {
            code: Some(77),
            stderr: "Error: source file could not be loaded\n".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("code 77"));
        assert!(message.contains("Error: source file could not be loaded\n"));
    }

    #[test]
    fn test_signal_exit_message() {
        let err = ConversionError::NonZeroExit {
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_output_missing_lists_directory() {
        let err = ConversionError::OutputMissing {
            expected: PathBuf::from("/tmp/x/proposta_temp.pdf"),
            listing: vec!["proposta_temp.pptx".to_string(), "core".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("proposta_temp.pptx, core"));
    }

    #[test]
    fn test_wrapped_errors_are_transparent() {
        let err: Error = LoadError::Missing {
            path: PathBuf::from("relacao.csv"),
        }
        .into();
        assert_eq!(err.to_string(), "Lookup table not found: relacao.csv");
    }
}
