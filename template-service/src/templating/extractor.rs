use crate::templating::docx::DocxPackage;
use crate::templating::error::TemplateError;
use crate::templating::substitute::{paragraph_texts, PLACEHOLDER};
use std::collections::HashSet;

/// Returns the unique placeholder names of a DOCX document in order of first
/// occurrence: main body first, then headers and footers.
pub fn extract(document: &[u8]) -> Result<Vec<String>, TemplateError> {
    let mut package = DocxPackage::open(document)?;

    let mut seen = HashSet::new();
    let mut placeholders = Vec::new();

    for part in package.text_parts() {
        let xml = package.read_part(&part)?;
        for text in paragraph_texts(&xml)? {
            for caps in PLACEHOLDER.captures_iter(&text) {
                let name = &caps[1];
                if seen.insert(name.to_string()) {
                    placeholders.push(name.to_string());
                }
            }
        }
    }

    tracing::debug!(count = placeholders.len(), "Extracted placeholders");

    Ok(placeholders)
}
