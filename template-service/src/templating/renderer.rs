use crate::templating::docx::{DocxPackage, PartKind, DOCX_CONTENT_TYPE};
use crate::templating::error::TemplateError;
use crate::templating::pdf::{wrap_for_print, HtmlToPdfRenderer};
use crate::templating::preview::document_to_html;
use crate::templating::substitute::substitute;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Docx,
    Pdf,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// A generated artifact ready to be sent to the caller.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

/// Turns a layout document plus a value map into previews, filled DOCX files
/// and PDFs. Rendering only reads its inputs.
#[derive(Clone)]
pub struct TemplateRenderer {
    pdf: Arc<dyn HtmlToPdfRenderer>,
    timeout: Duration,
}

impl TemplateRenderer {
    pub fn new(pdf: Arc<dyn HtmlToPdfRenderer>, timeout: Duration) -> Self {
        Self { pdf, timeout }
    }

    /// HTML preview of every text part with values substituted: headers,
    /// the body, then footers and notes. Missing values render as empty text.
    pub fn render_preview(
        &self,
        document: &[u8],
        values: &BTreeMap<String, String>,
    ) -> Result<String, TemplateError> {
        let mut package = DocxPackage::open(document)?;

        let mut headers = String::new();
        let mut rest = String::new();
        for part in package.text_parts() {
            let Some(kind) = PartKind::of(&part) else {
                continue;
            };
            let xml = package.read_part(&part)?;
            let html = document_to_html(&substitute(&xml, values)?)?;
            match kind {
                PartKind::Main => rest.insert_str(0, &html),
                _ if !has_text(&html) => {}
                PartKind::Header => headers.push_str(&format!(
                    r#"<header class="document-header">{}</header>"#,
                    html
                )),
                PartKind::Footer => rest.push_str(&format!(
                    r#"<footer class="document-footer">{}</footer>"#,
                    html
                )),
                PartKind::Footnotes | PartKind::Endnotes => rest.push_str(&format!(
                    r#"<section class="document-notes">{}</section>"#,
                    html
                )),
            }
        }

        metrics::counter!("template_render_total", "format" => "html").increment(1);

        Ok(format!(
            r#"<div class="document-preview">{}{}</div>"#,
            headers, rest
        ))
    }

    /// Substitutes values inside the original package. Only the text parts
    /// are rewritten; styles, media and relationships are kept byte for byte.
    pub fn render_document(
        &self,
        document: &[u8],
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, TemplateError> {
        let package = DocxPackage::open(document)?;
        let bytes = package.rewrite(|_, xml| substitute(xml, values))?;

        metrics::counter!("template_render_total", "format" => "docx").increment(1);

        Ok(bytes)
    }

    /// Prints an HTML fragment to PDF under the fixed print stylesheet.
    pub async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, TemplateError> {
        self.print("Document", html).await
    }

    async fn print(&self, title: &str, html: &str) -> Result<Vec<u8>, TemplateError> {
        let page = wrap_for_print(title, html);
        let start = Instant::now();

        let result = tokio::time::timeout(self.timeout, self.pdf.render(&page)).await;
        let elapsed = start.elapsed();

        let bytes = match result {
            Ok(rendered) => rendered?,
            Err(_) => {
                metrics::counter!("template_pdf_failures_total", "reason" => "timeout").increment(1);
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "PDF rendering timed out");
                return Err(TemplateError::RenderTimeout(self.timeout));
            }
        };

        if !bytes.starts_with(PDF_MAGIC) {
            metrics::counter!("template_pdf_failures_total", "reason" => "empty_output")
                .increment(1);
            tracing::error!(
                output_size = bytes.len(),
                "PDF renderer produced an artifact without a PDF header"
            );
            return Err(TemplateError::EmptyOutput);
        }

        metrics::counter!("template_render_total", "format" => "pdf").increment(1);
        metrics::histogram!("template_pdf_render_duration_seconds").record(elapsed.as_secs_f64());

        Ok(bytes)
    }

    /// Full generation path used by the workflow.
    pub async fn render(
        &self,
        document: &[u8],
        values: &BTreeMap<String, String>,
        format: OutputFormat,
        file_stem: &str,
    ) -> Result<GeneratedDocument, TemplateError> {
        let stem = sanitize_file_stem(file_stem);
        match format {
            OutputFormat::Docx => Ok(GeneratedDocument {
                bytes: self.render_document(document, values)?,
                content_type: DOCX_CONTENT_TYPE,
                file_name: format!("{}.docx", stem),
            }),
            OutputFormat::Pdf => {
                let html = self.render_preview(document, values)?;
                let bytes = self.print(file_stem, &html).await?;
                Ok(GeneratedDocument {
                    bytes,
                    content_type: PDF_CONTENT_TYPE,
                    file_name: format!("{}.pdf", stem),
                })
            }
        }
    }
}

/// True when the fragment has visible text outside its tags.
fn has_text(html: &str) -> bool {
    let mut in_tag = false;
    html.chars().any(|c| match c {
        '<' => {
            in_tag = true;
            false
        }
        '>' => {
            in_tag = false;
            false
        }
        _ => !in_tag && !c.is_whitespace(),
    })
}

/// Keeps letters, digits, `-` and `_`; anything else becomes `_`.
fn sanitize_file_stem(stem: &str) -> String {
    let cleaned: String = stem
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}
