//! Render → convert pipeline for one generation request.

use crate::soffice::{DocumentConverter, SofficeConverter};
use estudo_core::{Error, RenderedArtifact, Result, Selection, Settings};
use estudo_pptx::TemplateRenderer;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Request-scoped scratch directory, removed with everything in it when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh directory under `root`, or under the system temp dir.
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("estudo-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        log::debug!("Created scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

// Removal itself is done by the inner `TempDir` when it drops.
impl Drop for ScratchDir {
    fn drop(&mut self) {
        log::debug!("Removing scratch directory {}", self.dir.path().display());
    }
}

/// Generates a study PDF for a selection.
#[derive(Debug, Clone)]
pub struct StudyGenerator<C = SofficeConverter> {
    renderer: TemplateRenderer,
    converter: C,
    scratch_root: Option<PathBuf>,
}

impl StudyGenerator<SofficeConverter> {
    /// Build the LibreOffice-backed generator described by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            TemplateRenderer::new(&settings.template_path),
            SofficeConverter::from_settings(settings),
        )
        .with_scratch_root(settings.scratch_root.clone())
    }
}

impl<C: DocumentConverter> StudyGenerator<C> {
    pub fn new(renderer: TemplateRenderer, converter: C) -> Self {
        Self {
            renderer,
            converter,
            scratch_root: None,
        }
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    /// Render the template for `selection` and convert it to PDF.
    ///
    /// The scratch directory lives only for the duration of this call and is
    /// removed whether generation succeeds or fails.
    pub fn generate(&self, selection: &Selection) -> Result<RenderedArtifact> {
        if !selection.is_complete() {
            return Err(Error::InvalidSelection(
                "both a client and a cargo must be selected".to_string(),
            ));
        }

        let scratch = ScratchDir::create(self.scratch_root.as_deref())?;
        let rendered = self.renderer.render(selection, scratch.path())?;
        let bytes = self.converter.convert(&rendered)?;

        let artifact = RenderedArtifact::for_selection(selection, bytes);
        log::info!("Generated {} ({} bytes)", artifact.filename, artifact.len());
        Ok(artifact)
    }
}
