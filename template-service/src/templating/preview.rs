//! WordprocessingML to HTML conversion for previews and PDF input.
//!
//! Only the structure a filled-in school form needs is kept: paragraphs,
//! headings, alignment, bold/italic/underline, line breaks and tables.
//! Every piece of text is escaped, so the output never carries markup that
//! did not come from this converter.

use crate::templating::error::TemplateError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Debug, Default, Clone, Copy)]
struct RunStyle {
    bold: bool,
    italic: bool,
    underline: bool,
}

#[derive(Debug, Default)]
struct RunState {
    style: RunStyle,
    html: String,
}

impl RunState {
    fn finish(self) -> String {
        let mut html = self.html;
        if html.is_empty() {
            return html;
        }
        if self.style.underline {
            html = format!("<u>{}</u>", html);
        }
        if self.style.italic {
            html = format!("<em>{}</em>", html);
        }
        if self.style.bold {
            html = format!("<strong>{}</strong>", html);
        }
        html
    }
}

#[derive(Debug)]
struct ParagraphState {
    tag: &'static str,
    align: Option<&'static str>,
    html: String,
    run: Option<RunState>,
}

impl ParagraphState {
    fn new() -> Self {
        Self {
            tag: "p",
            align: None,
            html: String::new(),
            run: None,
        }
    }

    fn append(&mut self, html: &str) {
        match self.run.as_mut() {
            Some(run) => run.html.push_str(html),
            None => self.html.push_str(html),
        }
    }

    fn finish(mut self) -> String {
        if let Some(run) = self.run.take() {
            self.html.push_str(&run.finish());
        }
        match self.align {
            Some(align) => format!(
                r#"<{tag} style="text-align:{align}">{html}</{tag}>"#,
                tag = self.tag,
                html = self.html
            ),
            None => format!("<{tag}>{html}</{tag}>", tag = self.tag, html = self.html),
        }
    }
}

#[derive(Debug, Default)]
struct RowState {
    header: bool,
    cells: String,
}

#[derive(Debug, Default)]
struct TableState {
    head: String,
    body: String,
    row: Option<RowState>,
}

impl TableState {
    fn finish(self) -> String {
        let mut html = String::from("<table>");
        if !self.head.is_empty() {
            html.push_str("<thead>");
            html.push_str(&self.head);
            html.push_str("</thead>");
        }
        html.push_str("<tbody>");
        html.push_str(&self.body);
        html.push_str("</tbody></table>");
        html
    }
}

#[derive(Default)]
struct HtmlBuilder {
    /// Output buffers: the body, then one per open table cell.
    buffers: Vec<String>,
    tables: Vec<TableState>,
    paragraphs: Vec<ParagraphState>,
    in_text: bool,
    in_paragraph_props: usize,
    in_run_props: usize,
    /// Depth inside `mc:Fallback`, whose content duplicates `mc:Choice`.
    skipped: usize,
}

impl HtmlBuilder {
    fn new() -> Self {
        Self {
            buffers: vec![String::new()],
            ..Default::default()
        }
    }

    fn emit_block(&mut self, html: &str) {
        if let Some(parent) = self.paragraphs.last_mut() {
            parent.append(html);
        } else if let Some(buffer) = self.buffers.last_mut() {
            buffer.push_str(html);
        }
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"mc:Fallback" => self.skipped += 1,
            _ if self.skipped > 0 => {}
            b"w:p" => self.paragraphs.push(ParagraphState::new()),
            b"w:pPr" => self.in_paragraph_props += 1,
            b"w:rPr" if self.in_paragraph_props == 0 => self.in_run_props += 1,
            b"w:r" => {
                if let Some(p) = self.paragraphs.last_mut() {
                    if let Some(run) = p.run.take() {
                        p.html.push_str(&run.finish());
                    }
                    p.run = Some(RunState::default());
                }
            }
            b"w:t" => self.in_text = true,
            b"w:tbl" => self.tables.push(TableState::default()),
            b"w:tr" => {
                if let Some(table) = self.tables.last_mut() {
                    table.row = Some(RowState::default());
                }
            }
            b"w:tc" => self.buffers.push(String::new()),
            _ => self.property(e),
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"mc:Fallback" => self.skipped = self.skipped.saturating_sub(1),
            _ if self.skipped > 0 => {}
            b"w:p" => {
                if let Some(paragraph) = self.paragraphs.pop() {
                    let html = paragraph.finish();
                    self.emit_block(&html);
                }
            }
            b"w:pPr" => self.in_paragraph_props = self.in_paragraph_props.saturating_sub(1),
            b"w:rPr" if self.in_paragraph_props == 0 => {
                self.in_run_props = self.in_run_props.saturating_sub(1)
            }
            b"w:r" => {
                if let Some(p) = self.paragraphs.last_mut() {
                    if let Some(run) = p.run.take() {
                        p.html.push_str(&run.finish());
                    }
                }
            }
            b"w:t" => self.in_text = false,
            b"w:tc" => {
                if self.buffers.len() > 1 {
                    let cell = self.buffers.pop().unwrap_or_default();
                    if let Some(row) = self.tables.last_mut().and_then(|t| t.row.as_mut()) {
                        let tag = if row.header { "th" } else { "td" };
                        row.cells.push_str(&format!("<{tag}>{cell}</{tag}>"));
                    }
                }
            }
            b"w:tr" => {
                if let Some(table) = self.tables.last_mut() {
                    if let Some(row) = table.row.take() {
                        let html = format!("<tr>{}</tr>", row.cells);
                        if row.header {
                            table.head.push_str(&html);
                        } else {
                            table.body.push_str(&html);
                        }
                    }
                }
            }
            b"w:tbl" => {
                if let Some(table) = self.tables.pop() {
                    let html = table.finish();
                    self.emit_block(&html);
                }
            }
            _ => {}
        }
    }

    /// Property and inline elements, which may arrive as start or empty tags.
    fn property(&mut self, e: &BytesStart<'_>) {
        if self.skipped > 0 {
            return;
        }
        match e.name().as_ref() {
            b"w:pStyle" if self.in_paragraph_props > 0 => {
                if let (Some(p), Some(style)) = (self.paragraphs.last_mut(), attr(e, b"w:val")) {
                    p.tag = heading_tag(&style);
                }
            }
            b"w:jc" if self.in_paragraph_props > 0 => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.align = match attr(e, b"w:val").as_deref() {
                        Some("center") => Some("center"),
                        Some("right") | Some("end") => Some("right"),
                        Some("both") | Some("distribute") => Some("justify"),
                        _ => None,
                    };
                }
            }
            b"w:b" | b"w:i" | b"w:u" if self.in_run_props > 0 => {
                let enabled = toggle_enabled(e);
                let name = e.name().as_ref().to_vec();
                if let Some(run) = self.paragraphs.last_mut().and_then(|p| p.run.as_mut()) {
                    match name.as_slice() {
                        b"w:b" => run.style.bold = enabled,
                        b"w:i" => run.style.italic = enabled,
                        _ => run.style.underline = enabled,
                    }
                }
            }
            b"w:trHeader" | b"w:tblHeader" => {
                if let Some(row) = self.tables.last_mut().and_then(|t| t.row.as_mut()) {
                    row.header = toggle_enabled(e);
                }
            }
            b"w:br" | b"w:cr" => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.append("<br>");
                }
            }
            b"w:tab" if self.in_paragraph_props == 0 => {
                if let Some(p) = self.paragraphs.last_mut() {
                    p.append("&emsp;");
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.skipped > 0 || !self.in_text {
            return;
        }
        if let Some(p) = self.paragraphs.last_mut() {
            p.append(&html_escape(text));
        }
    }

    fn finish(mut self) -> String {
        while let Some(paragraph) = self.paragraphs.pop() {
            let html = paragraph.finish();
            self.emit_block(&html);
        }
        self.buffers.into_iter().next().unwrap_or_default()
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `<w:b/>` means on; `w:val` of `0`, `false`, `off` or `none` means off.
fn toggle_enabled(e: &BytesStart<'_>) -> bool {
    !matches!(
        attr(e, b"w:val").as_deref(),
        Some("0") | Some("false") | Some("off") | Some("none")
    )
}

fn heading_tag(style: &str) -> &'static str {
    let lower = style.to_ascii_lowercase();
    if lower == "title" {
        return "h1";
    }
    let level = lower
        .strip_prefix("heading")
        .or_else(|| lower.strip_prefix("titulo"))
        .and_then(|rest| rest.trim().parse::<u8>().ok());
    match level {
        Some(1) => "h1",
        Some(2) => "h2",
        Some(3) => "h3",
        Some(4) => "h4",
        Some(5) => "h5",
        Some(6) => "h6",
        _ => "p",
    }
}

/// Converts a (substituted) `word/document.xml` into an HTML fragment.
pub fn document_to_html(xml: &str) -> Result<String, TemplateError> {
    let mut reader = Reader::from_str(xml);
    let mut builder = HtmlBuilder::new();

    loop {
        match reader.read_event().map_err(TemplateError::invalid)? {
            Event::Start(e) => builder.start(&e),
            Event::Empty(e) => builder.property(&e),
            Event::End(e) => builder.end(e.name().as_ref()),
            Event::Text(t) => {
                let text = t.unescape().map_err(TemplateError::invalid)?;
                builder.text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> String {
        format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    #[test]
    fn paragraphs_and_runs() {
        let html = document_to_html(&doc(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Nome:</w:t></w:r><w:r><w:t xml:space=\"preserve\"> Ana</w:t></w:r></w:p>",
        ))
        .unwrap();
        assert_eq!(html, "<p><strong>Nome:</strong> Ana</p>");
    }

    #[test]
    fn headings_and_alignment() {
        let html = document_to_html(&doc(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/><w:jc w:val="center"/></w:pPr><w:r><w:t>Declaração</w:t></w:r></w:p>"#,
        ))
        .unwrap();
        assert_eq!(html, r#"<h2 style="text-align:center">Declaração</h2>"#);
    }

    #[test]
    fn disabled_toggles_are_ignored() {
        let html = document_to_html(&doc(
            r#"<w:p><w:r><w:rPr><w:b w:val="0"/><w:i/></w:rPr><w:t>x</w:t></w:r></w:p>"#,
        ))
        .unwrap();
        assert_eq!(html, "<p><em>x</em></p>");
    }

    #[test]
    fn tables_with_header_rows() {
        let html = document_to_html(&doc(
            "<w:tbl>\
               <w:tr><w:trPr><w:tblHeader/></w:trPr><w:tc><w:p><w:r><w:t>Disciplina</w:t></w:r></w:p></w:tc></w:tr>\
               <w:tr><w:tc><w:p><w:r><w:t>Matemática</w:t></w:r></w:p></w:tc></w:tr>\
             </w:tbl>",
        ))
        .unwrap();
        assert_eq!(
            html,
            "<table><thead><tr><th><p>Disciplina</p></th></tr></thead>\
             <tbody><tr><td><p>Matemática</p></td></tr></tbody></table>"
        );
    }

    #[test]
    fn text_is_escaped() {
        let html = document_to_html(&doc(
            "<w:p><w:r><w:t>&lt;script&gt;alert(1)&lt;/script&gt;</w:t></w:r></w:p>",
        ))
        .unwrap();
        assert_eq!(html, "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>");
    }

    #[test]
    fn fallback_content_is_not_duplicated() {
        let html = document_to_html(&doc(
            "<w:p><w:r><mc:AlternateContent><mc:Choice><w:t>A</w:t></mc:Choice><mc:Fallback><w:t>A</w:t></mc:Fallback></mc:AlternateContent></w:r></w:p>",
        ))
        .unwrap();
        assert_eq!(html, "<p>A</p>");
    }

    #[test]
    fn line_breaks() {
        let html =
            document_to_html(&doc("<w:p><w:r><w:t>a</w:t><w:br/><w:t>b</w:t></w:r></w:p>"))
                .unwrap();
        assert_eq!(html, "<p>a<br>b</p>");
    }
}
