//! In-memory PPTX builders for tests.

use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{DateTime, ZipArchive, ZipWriter};

const SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const MASTER_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";

/// Builds a minimal PPTX archive.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    parts: Vec<(String, String)>,
    slides: Vec<String>,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self {
            parts: vec![(
                "[Content_Types].xml".to_string(),
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#
                    .to_string(),
            )],
            slides: Vec::new(),
        }
    }

    /// Add the next slide (`ppt/slides/slideN.xml`).
    pub fn slide(mut self, xml: &str) -> Self {
        let path = format!("ppt/slides/slide{}.xml", self.slides.len() + 1);
        self.slides.push(path.clone());
        self.parts.push((path, xml.to_string()));
        self
    }

    /// Add an arbitrary part.
    pub fn part(mut self, name: &str, content: &str) -> Self {
        self.parts.push((name.to_string(), content.to_string()));
        self
    }

    /// Build the archive with a relationships part listing the slides.
    pub fn build(self) -> Vec<u8> {
        // Listed in reverse so readers cannot rely on document order
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (idx, path) in self.slides.iter().enumerate().rev() {
            let target = path.trim_start_matches("ppt/");
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="{}"/>"#,
                idx + 2,
                SLIDE_REL_TYPE,
                target
            ));
        }
        rels.push_str(&format!(
            r#"<Relationship Id="rId1" Type="{}" Target="slideMasters/slideMaster1.xml"/></Relationships>"#,
            MASTER_REL_TYPE
        ));

        let mut parts = self.parts;
        parts.push(("ppt/_rels/presentation.xml.rels".to_string(), rels));
        write_zip(&parts)
    }

    /// Build the archive without a relationships part.
    pub fn build_without_relationships(self) -> Vec<u8> {
        write_zip(&self.parts)
    }
}

/// A slide with one text shape per entry of `texts`.
pub fn slide_with_shapes(texts: &[&str]) -> String {
    let shapes: String = texts
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="TextBox {}"/></p:nvSpPr><p:spPr><a:xfrm><a:off x="0" y="{}"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="pt-BR"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                idx + 2,
                idx + 1,
                idx * 1000,
                text
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>"#,
        shapes
    )
}

/// A slide with a single text shape.
pub fn shape_slide(text: &str) -> String {
    slide_with_shapes(&[text])
}

/// Two slides using both placeholders, plus a layout and a loose part that
/// must not be rewritten.
pub fn sample_template() -> Vec<u8> {
    TemplateBuilder::new()
        .slide(&shape_slide("Estudo de viabilidade - {{NOME_CLIENTE}}"))
        .slide(&slide_with_shapes(&[
            "Carga: {{NOME_CARGA}}",
            "Cliente: {{NOME_CLIENTE}}",
        ]))
        .part(
            "ppt/slideLayouts/slideLayout1.xml",
            &shape_slide("Layout {{NOME_CLIENTE}}"),
        )
        .part("ppt/notes.xml", "<notes>{{NOME_CARGA}}</notes>")
        .build()
}

/// Read one part of an archive as text.
pub fn read_part(archive: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(archive)).expect("valid zip");
    let mut file = archive.by_name(name).expect("part present");
    let mut content = String::new();
    file.read_to_string(&mut content).expect("utf-8 part");
    content
}

fn write_zip(parts: &[(String, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().last_modified_time(DateTime::default());
    for (name, content) in parts {
        writer.start_file(name.as_str(), options).expect("start part");
        writer.write_all(content.as_bytes()).expect("write part");
    }
    writer.finish().expect("finish zip").into_inner()
}
