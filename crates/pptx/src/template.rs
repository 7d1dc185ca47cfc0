//! PPTX template rendering.

use crate::slide::{rewrite_slide_xml, PlaceholderSubstitution};
use estudo_core::{Selection, TemplateError};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the rendered presentation inside the scratch directory.
pub const RENDERED_FILE_NAME: &str = "proposta_temp.pptx";

/// Relationships part listing the slides of a presentation.
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Renders the study template for a selection.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template_path: PathBuf,
}

impl TemplateRenderer {
    /// Create a renderer for the template at `template_path`.
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }

    /// Substitute the selection into the template and write the result to
    /// [`RENDERED_FILE_NAME`] inside `scratch_dir`.
    pub fn render(&self, selection: &Selection, scratch_dir: &Path) -> Result<PathBuf, TemplateError> {
        if !self.template_path.is_file() {
            return Err(TemplateError::MissingTemplate(self.template_path.clone()));
        }

        let file = File::open(&self.template_path)?;
        let rendered = render_bytes(BufReader::new(file), &selection.substitutions())?;

        let output = scratch_dir.join(RENDERED_FILE_NAME);
        let mut out = File::create(&output)?;
        out.write_all(&rendered)?;
        out.sync_all()?;

        log::debug!(
            "Rendered {} for '{}' / '{}' to {}",
            self.template_path.display(),
            selection.entity_name,
            selection.cargo_name,
            output.display()
        );
        Ok(output)
    }
}

/// Render a PPTX template held in any seekable reader.
///
/// Slide parts are rewritten with the substitutions; every other part is
/// copied raw. Rewritten parts keep their original timestamps so the same
/// input always yields the same bytes.
pub fn render_bytes<R: Read + Seek>(
    reader: R,
    substitutions: &[(&str, &str)],
) -> Result<Vec<u8>, TemplateError> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| TemplateError::Archive(format!("Failed to open ZIP: {}", e)))?;

    let slide_order = get_slide_order(&mut archive)?;
    let slides: HashSet<&str> = slide_order.iter().map(String::as_str).collect();
    let mut seen = 0;
    let mut total_replaced = 0;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for idx in 0..archive.len() {
        let name = archive
            .by_index_raw(idx)
            .map_err(|e| TemplateError::Archive(format!("Failed to read entry {}: {}", idx, e)))?
            .name()
            .to_string();

        if !slides.contains(name.as_str()) {
            let entry = archive
                .by_index_raw(idx)
                .map_err(|e| TemplateError::Archive(format!("Failed to read '{}': {}", name, e)))?;
            writer
                .raw_copy_file(entry)
                .map_err(|e| TemplateError::Archive(format!("Failed to copy '{}': {}", name, e)))?;
            continue;
        }

        let (content, options) = {
            let mut entry = archive
                .by_index(idx)
                .map_err(|e| TemplateError::Archive(format!("Failed to read '{}': {}", name, e)))?;
            let method = match entry.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = FileOptions::default()
                .compression_method(method)
                .last_modified_time(entry.last_modified());
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            (content, options)
        };

        let mut visitor = PlaceholderSubstitution::new(substitutions);
        let rewritten = rewrite_slide_xml(&content, &mut visitor)
            .map_err(|e| match e {
                TemplateError::Xml(reason) => TemplateError::Xml(format!("{}: {}", name, reason)),
                other => other,
            })?;
        log::debug!("{}: {} placeholder(s) replaced", name, visitor.replaced());
        total_replaced += visitor.replaced();
        seen += 1;

        writer
            .start_file(name.as_str(), options)
            .map_err(|e| TemplateError::Archive(format!("Failed to write '{}': {}", name, e)))?;
        writer.write_all(rewritten.as_bytes())?;
    }

    if seen < slide_order.len() {
        log::warn!(
            "{} slide(s) listed in {} are missing from the archive",
            slide_order.len() - seen,
            PRESENTATION_RELS
        );
    }
    if total_replaced == 0 {
        log::warn!("Template contains no placeholders; output matches the template text");
    }

    let cursor = writer
        .finish()
        .map_err(|e| TemplateError::Archive(format!("Failed to finish ZIP: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Get the ordered list of slide part paths from the presentation relationships.
fn get_slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>, TemplateError> {
    let rels_content = read_file_from_archive(archive, PRESENTATION_RELS)?;
    let mut slides: Vec<(String, Option<usize>)> = Vec::new();

    let mut reader = Reader::from_str(&rels_content);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut id = String::new();

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Type" => rel_type = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                        _ => {}
                    }
                }

                if rel_type.ends_with("/slide") {
                    let order_num = extract_slide_number(&id).or_else(|| extract_slide_number(&target));
                    let full_path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("ppt/{}", target),
                    };
                    slides.push((full_path, order_num));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TemplateError::Xml(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

fn read_file_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<String, TemplateError> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| TemplateError::Archive(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| TemplateError::Archive(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{read_part, sample_template, shape_slide, TemplateBuilder};

    const SUBSTITUTIONS: [(&str, &str); 2] = [
        ("{{NOME_CLIENTE}}", "Acme Ltd"),
        ("{{NOME_CARGA}}", "Lithium-Ion Pack"),
    ];

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slides/slide3.xml"), Some(3));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_slide_order_skips_layouts_and_masters() {
        let bytes = sample_template();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let order = get_slide_order(&mut archive).unwrap();
        assert_eq!(order, vec!["ppt/slides/slide1.xml", "ppt/slides/slide2.xml"]);
    }

    #[test]
    fn test_render_bytes_replaces_on_every_slide() {
        let rendered = render_bytes(Cursor::new(sample_template()), &SUBSTITUTIONS).unwrap();

        let slide1 = read_part(&rendered, "ppt/slides/slide1.xml");
        let slide2 = read_part(&rendered, "ppt/slides/slide2.xml");
        assert!(slide1.contains("<a:t>Estudo de viabilidade - Acme Ltd</a:t>"));
        assert!(slide2.contains("<a:t>Carga: Lithium-Ion Pack</a:t>"));
        assert!(slide2.contains("<a:t>Cliente: Acme Ltd</a:t>"));
        assert!(!slide1.contains("{{"));
        assert!(!slide2.contains("{{"));
    }

    #[test]
    fn test_render_bytes_copies_other_parts() {
        let template = sample_template();
        let rendered = render_bytes(Cursor::new(template.clone()), &SUBSTITUTIONS).unwrap();

        for part in [
            "[Content_Types].xml",
            "ppt/_rels/presentation.xml.rels",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/notes.xml",
        ] {
            assert_eq!(read_part(&rendered, part), read_part(&template, part));
        }

        let names: Vec<String> = ZipArchive::new(Cursor::new(rendered))
            .unwrap()
            .file_names()
            .map(String::from)
            .collect();
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_render_bytes_is_deterministic() {
        let first = render_bytes(Cursor::new(sample_template()), &SUBSTITUTIONS).unwrap();
        let second = render_bytes(Cursor::new(sample_template()), &SUBSTITUTIONS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_bytes_rejects_non_zip() {
        let err = render_bytes(Cursor::new(b"not a zip".to_vec()), &SUBSTITUTIONS).unwrap_err();
        assert!(matches!(err, TemplateError::Archive(_)));
    }

    #[test]
    fn test_render_bytes_requires_relationships() {
        let bytes = TemplateBuilder::new()
            .part("ppt/slides/slide1.xml", &shape_slide("{{NOME_CLIENTE}}"))
            .build_without_relationships();
        let err = render_bytes(Cursor::new(bytes), &SUBSTITUTIONS).unwrap_err();
        assert!(err.to_string().contains("presentation.xml.rels"));
    }

    #[test]
    fn test_render_writes_into_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template_propostas.pptx");
        std::fs::write(&template_path, sample_template()).unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let renderer = TemplateRenderer::new(&template_path);
        let output = renderer
            .render(&Selection::new("Acme Ltd", "Lithium-Ion Pack"), scratch.path())
            .unwrap();

        assert_eq!(output, scratch.path().join(RENDERED_FILE_NAME));
        let rendered = std::fs::read(&output).unwrap();
        assert!(read_part(&rendered, "ppt/slides/slide1.xml").contains("Acme Ltd"));
    }

    #[test]
    fn test_render_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = TemplateRenderer::new(dir.path().join("absent.pptx"));
        let err = renderer
            .render(&Selection::new("Acme Ltd", "LFP 48V"), dir.path())
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingTemplate(_)));
        assert!(!dir.path().join(RENDERED_FILE_NAME).exists());
    }
}
