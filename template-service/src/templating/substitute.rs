//! Paragraph-level placeholder substitution over WordprocessingML.
//!
//! Word splits text into runs freely, so a token such as `{{nome}}` may be
//! spread across several `w:t` elements. Each paragraph is buffered, its
//! text joined, matches located in the joined text and then mapped back onto
//! the original runs: the replacement goes into the run holding the opening
//! `{{` and the remaining token characters are removed from the others.

use crate::templating::error::TemplateError;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

pub static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder pattern is valid")
});

const PARAGRAPH: &[u8] = b"w:p";
const TEXT: &[u8] = b"w:t";

/// One `w:t` element inside a buffered paragraph.
#[derive(Debug)]
struct Segment {
    /// Index of the `w:t` start event.
    start: usize,
    /// Indices of the text events inside the element.
    text_events: Vec<usize>,
    text: String,
}

#[derive(Debug, Default)]
struct Paragraph {
    events: Vec<Event<'static>>,
    segments: Vec<Segment>,
    in_text: bool,
}

impl Paragraph {
    fn push(&mut self, event: Event<'static>) -> Result<(), TemplateError> {
        let index = self.events.len();
        match &event {
            Event::Start(e) if e.name().as_ref() == TEXT => {
                self.segments.push(Segment {
                    start: index,
                    text_events: Vec::new(),
                    text: String::new(),
                });
                self.in_text = true;
            }
            Event::End(e) if e.name().as_ref() == TEXT => self.in_text = false,
            Event::Text(t) if self.in_text => {
                let text = t.unescape().map_err(TemplateError::invalid)?;
                if let Some(segment) = self.segments.last_mut() {
                    segment.text_events.push(index);
                    segment.text.push_str(&text);
                }
            }
            _ => {}
        }
        self.events.push(event);
        Ok(())
    }

    fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Returns the rewritten event list, or `None` when the paragraph holds
    /// no placeholder and can be written back verbatim.
    fn substitute(&self, values: &BTreeMap<String, String>) -> Option<Vec<Event<'static>>> {
        let full = self.text();
        let matches: Vec<(usize, usize, &str)> = PLACEHOLDER
            .captures_iter(&full)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?.as_str();
                let value = values.get(name).map(String::as_str).unwrap_or("");
                Some((whole.start(), whole.end(), value))
            })
            .collect();

        if matches.is_empty() {
            return None;
        }

        let mut rewritten: HashMap<usize, String> = HashMap::new();
        let mut offset = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            let seg_start = offset;
            let seg_end = offset + segment.text.len();
            offset = seg_end;

            let overlapping: Vec<_> = matches
                .iter()
                .filter(|(start, end, _)| *start < seg_end && *end > seg_start)
                .collect();
            if overlapping.is_empty() {
                continue;
            }

            let mut text = String::new();
            let mut cursor = seg_start;
            for (start, end, value) in overlapping {
                let cut_start = (*start).max(seg_start);
                let cut_end = (*end).min(seg_end);
                text.push_str(&full[cursor..cut_start]);
                if *start >= seg_start {
                    text.push_str(value);
                }
                cursor = cut_end;
            }
            text.push_str(&full[cursor..seg_end]);
            rewritten.insert(index, text);
        }

        let by_start: HashMap<usize, usize> = self
            .segments
            .iter()
            .enumerate()
            .map(|(i, s)| (s.start, i))
            .collect();
        let mut replaced_text: HashMap<usize, &str> = HashMap::new();
        let mut dropped_text: HashSet<usize> = HashSet::new();
        for (index, text) in &rewritten {
            let segment = &self.segments[*index];
            if let Some((first, rest)) = segment.text_events.split_first() {
                replaced_text.insert(*first, text.as_str());
                dropped_text.extend(rest.iter().copied());
            }
        }

        let mut out = Vec::with_capacity(self.events.len());
        for (index, event) in self.events.iter().enumerate() {
            if dropped_text.contains(&index) {
                continue;
            }
            if let Some(text) = replaced_text.get(&index) {
                out.push(Event::Text(BytesText::new(text).into_owned()));
                continue;
            }
            let needs_preserve = by_start
                .get(&index)
                .and_then(|seg| rewritten.get(seg))
                .is_some_and(|text| has_outer_whitespace(text));
            match event {
                Event::Start(e) if needs_preserve && !has_space_attribute(e) => {
                    let mut start = e.clone();
                    start.push_attribute(("xml:space", "preserve"));
                    out.push(Event::Start(start));
                }
                other => out.push(other.clone()),
            }
        }
        Some(out)
    }
}

fn has_outer_whitespace(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

fn has_space_attribute(start: &quick_xml::events::BytesStart<'_>) -> bool {
    start
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"xml:space")
}

enum Chunk {
    Passthrough(Event<'static>),
    Paragraph(Paragraph),
}

/// Streams the part, handing out events outside paragraphs one by one and
/// each outermost paragraph as a single buffered chunk.
fn walk<F>(xml: &str, mut sink: F) -> Result<(), TemplateError>
where
    F: FnMut(Chunk) -> Result<(), TemplateError>,
{
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut current: Option<Paragraph> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| {
                TemplateError::invalid(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?
            .into_owned();

        if matches!(event, Event::Eof) {
            break;
        }

        let opens = matches!(&event, Event::Start(e) if e.name().as_ref() == PARAGRAPH);
        let closes = matches!(&event, Event::End(e) if e.name().as_ref() == PARAGRAPH);

        if opens {
            depth += 1;
            if depth == 1 {
                current = Some(Paragraph::default());
            }
        }

        match current.as_mut() {
            Some(paragraph) => paragraph.push(event)?,
            None => sink(Chunk::Passthrough(event))?,
        }

        if closes && depth > 0 {
            depth -= 1;
            if depth == 0 {
                if let Some(paragraph) = current.take() {
                    sink(Chunk::Paragraph(paragraph))?;
                }
            }
        }
    }

    if let Some(paragraph) = current.take() {
        sink(Chunk::Paragraph(paragraph))?;
    }
    Ok(())
}

/// Joined text of every paragraph in the part, in document order.
pub fn paragraph_texts(xml: &str) -> Result<Vec<String>, TemplateError> {
    let mut texts = Vec::new();
    walk(xml, |chunk| {
        if let Chunk::Paragraph(paragraph) = chunk {
            texts.push(paragraph.text());
        }
        Ok(())
    })?;
    Ok(texts)
}

/// Replaces every placeholder in the part. Names without a value become the
/// empty string so template syntax never leaks into the output.
pub fn substitute(xml: &str, values: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    walk(xml, |chunk| {
        match chunk {
            Chunk::Passthrough(event) => writer
                .write_event(event)
                .map_err(|e| TemplateError::RenderFailed(e.to_string()))?,
            Chunk::Paragraph(paragraph) => {
                let events = paragraph
                    .substitute(values)
                    .unwrap_or(paragraph.events);
                for event in events {
                    writer
                        .write_event(event)
                        .map_err(|e| TemplateError::RenderFailed(e.to_string()))?;
                }
            }
        }
        Ok(())
    })?;

    String::from_utf8(writer.into_inner()).map_err(TemplateError::invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn body(inner: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {NS}><w:body>{inner}</w:body></w:document>"#)
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn joins_runs_per_paragraph() {
        let xml = body(
            "<w:p><w:r><w:t>Aluno: {{no</w:t></w:r><w:r><w:t>me}}</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Curso</w:t></w:r></w:p>",
        );
        let texts = paragraph_texts(&xml).unwrap();
        assert_eq!(texts, vec!["Aluno: {{nome}}", "Curso"]);
    }

    #[test]
    fn replaces_token_split_across_runs() {
        let xml = body(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>{{no</w:t></w:r><w:r><w:t>me}} ok</w:t></w:r></w:p>",
        );
        let out = substitute(&xml, &values(&[("nome", "Ana")])).unwrap();

        assert!(!out.contains("{{"));
        assert!(out.contains("<w:rPr><w:b/></w:rPr><w:t>Ana</w:t>"));
        assert!(out.contains(r#"<w:t xml:space="preserve"> ok</w:t>"#));
    }

    #[test]
    fn missing_values_render_empty() {
        let xml = body("<w:p><w:r><w:t>[{{curso}}]</w:t></w:r></w:p>");
        let out = substitute(&xml, &BTreeMap::new()).unwrap();
        assert!(out.contains("<w:t>[]</w:t>"));
    }

    #[test]
    fn values_are_xml_escaped() {
        let xml = body("<w:p><w:r><w:t>{{nome}}</w:t></w:r></w:p>");
        let out = substitute(&xml, &values(&[("nome", "A & <B>")])).unwrap();
        assert!(out.contains("A &amp; &lt;B&gt;"));
        let texts = paragraph_texts(&out).unwrap();
        assert_eq!(texts, vec!["A & <B>"]);
    }

    #[test]
    fn paragraphs_without_tokens_are_untouched() {
        let inner = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t xml:space="preserve"> Título &amp; mais </w:t></w:r></w:p>"#;
        let xml = body(inner);
        let out = substitute(&xml, &values(&[("nome", "Ana")])).unwrap();
        assert!(out.contains(inner));
    }

    #[test]
    fn several_tokens_in_one_run() {
        let xml = body("<w:p><w:r><w:t>{{a}}-{{b}}-{{a}}</w:t></w:r></w:p>");
        let out = substitute(&xml, &values(&[("a", "1"), ("b", "2")])).unwrap();
        assert!(out.contains("<w:t>1-2-1</w:t>"));
    }

    #[test]
    fn malformed_xml_is_invalid_format() {
        let err = paragraph_texts("<w:document><w:p></w:document>").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidDocumentFormat(_)));
    }
}
