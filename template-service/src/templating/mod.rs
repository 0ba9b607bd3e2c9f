//! DOCX templating: placeholder extraction, substitution and rendering.

pub mod docx;
pub mod error;
pub mod extractor;
pub mod pdf;
pub mod preview;
pub mod renderer;
pub mod substitute;

#[cfg(test)]
pub(crate) mod fixtures;

pub use error::TemplateError;
pub use extractor::extract;
pub use pdf::{HtmlToPdfRenderer, ProcessPdfRenderer};
pub use renderer::{GeneratedDocument, OutputFormat, TemplateRenderer};
