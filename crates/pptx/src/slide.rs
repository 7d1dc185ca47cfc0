//! Text rewriting for a single slide part.
//!
//! Every `txBody` in a slide is a text-bearing element: ordinary shapes,
//! placeholders, shapes inside groups and table cells all carry one. The
//! walker hands each line of text (the runs of a paragraph between line
//! breaks) to a [`TextVisitor`], then writes any changed run back.

use estudo_core::TemplateError;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

/// The kind of element a text body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Shape, placeholder or text box (`p:sp`, possibly inside a group).
    Shape,
    /// Cell of a table (`a:tc`).
    TableCell,
}

/// Visitor over the text lines of a slide.
pub trait TextVisitor {
    /// Visit the runs of one line. Runs may be rewritten in place; the number
    /// of runs is fixed.
    fn visit_line(&mut self, frame: FrameKind, runs: &mut [String]);
}

/// Literal replacement of placeholder tokens.
///
/// Tokens are applied in order, each replacing every occurrence. When every
/// token sits inside a single run, runs are rewritten one by one so their
/// formatting survives. A token split across runs forces the whole line into
/// the first run.
#[derive(Debug)]
pub struct PlaceholderSubstitution<'a> {
    substitutions: &'a [(&'a str, &'a str)],
    replaced: usize,
}

impl<'a> PlaceholderSubstitution<'a> {
    /// Create a substitution for `(token, value)` pairs.
    pub fn new(substitutions: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            substitutions,
            replaced: 0,
        }
    }

    /// Number of token occurrences replaced so far.
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    fn apply(&self, text: &str) -> (String, usize) {
        let mut result = text.to_string();
        let mut count = 0;
        for (token, value) in self.substitutions {
            if token.is_empty() {
                continue;
            }
            let found = result.matches(token).count();
            if found > 0 {
                count += found;
                result = result.replace(token, value);
            }
        }
        (result, count)
    }
}

impl TextVisitor for PlaceholderSubstitution<'_> {
    fn visit_line(&mut self, frame: FrameKind, runs: &mut [String]) {
        if runs.is_empty() {
            return;
        }

        let joined = runs.concat();
        let (target, count) = self.apply(&joined);
        if count == 0 {
            return;
        }
        self.replaced += count;

        let per_run: Vec<String> = runs.iter().map(|run| self.apply(run).0).collect();
        if per_run.concat() == target {
            for (run, rewritten) in runs.iter_mut().zip(per_run) {
                *run = rewritten;
            }
        } else {
            log::debug!("Placeholder split across runs in {:?}; merging line", frame);
            runs[0] = target;
            for run in runs.iter_mut().skip(1) {
                run.clear();
            }
        }
    }
}

/// Rewrite the text of one slide part with a visitor.
///
/// Markup outside changed text nodes is written back as read.
pub fn rewrite_slide_xml(xml: &str, visitor: &mut dyn TextVisitor) -> Result<String, TemplateError> {
    let mut events = read_events(xml)?;

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut frame: Option<FrameKind> = None;
    let mut line: Vec<usize> = Vec::new();

    for idx in 0..events.len() {
        match &events[idx] {
            Event::Start(e) => {
                let name = local_name(e.name().as_ref()).to_vec();
                match name.as_slice() {
                    b"txBody" => {
                        frame = Some(match stack.last().map(Vec::as_slice) {
                            Some(b"tc") => FrameKind::TableCell,
                            _ => FrameKind::Shape,
                        });
                    }
                    b"p" if frame.is_some() => line.clear(),
                    b"br" if frame.is_some() => {
                        flush_line(&mut events, &mut line, frame, visitor)?;
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let is_break = local_name(e.name().as_ref()) == b"br";
                if is_break && frame.is_some() {
                    flush_line(&mut events, &mut line, frame, visitor)?;
                }
            }
            Event::Text(_) => {
                if frame.is_some() && stack.last().map(Vec::as_slice) == Some(b"t".as_slice()) {
                    line.push(idx);
                }
            }
            Event::End(e) => {
                let name = local_name(e.name().as_ref()).to_vec();
                match name.as_slice() {
                    b"p" if frame.is_some() => {
                        flush_line(&mut events, &mut line, frame, visitor)?;
                    }
                    b"txBody" => {
                        line.clear();
                        frame = None;
                    }
                    _ => {}
                }
                stack.pop();
            }
            _ => {}
        }
    }

    write_events(events)
}

/// Pass the collected runs of a line to the visitor and write back changes.
fn flush_line(
    events: &mut [Event<'static>],
    line: &mut Vec<usize>,
    frame: Option<FrameKind>,
    visitor: &mut dyn TextVisitor,
) -> Result<(), TemplateError> {
    let Some(frame) = frame else {
        line.clear();
        return Ok(());
    };
    if line.is_empty() {
        return Ok(());
    }

    let mut runs = Vec::with_capacity(line.len());
    for &idx in line.iter() {
        match &events[idx] {
            Event::Text(text) => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| TemplateError::Xml(format!("Invalid text in slide: {}", e)))?;
                runs.push(unescaped.into_owned());
            }
            _ => runs.push(String::new()),
        }
    }
    let original = runs.clone();

    visitor.visit_line(frame, &mut runs);

    for ((&idx, before), after) in line.iter().zip(&original).zip(runs) {
        if *before != after {
            events[idx] = Event::Text(BytesText::new(&after).into_owned());
        }
    }
    line.clear();
    Ok(())
}

fn read_events(xml: &str) -> Result<Vec<Event<'static>>, TemplateError> {
    let mut reader = Reader::from_str(xml);
    let mut events = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => events.push(event.into_owned()),
            Err(e) => {
                return Err(TemplateError::Xml(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    Ok(events)
}

fn write_events(events: Vec<Event<'static>>) -> Result<String, TemplateError> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer
            .write_event(event)
            .map_err(|e| TemplateError::Xml(format!("Failed to write slide: {}", e)))?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| TemplateError::Xml(format!("Slide is not valid UTF-8: {}", e)))
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
