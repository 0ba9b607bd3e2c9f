//! DOCX container handling.
//!
//! A DOCX file is a ZIP archive; the text that carries placeholders lives in
//! `word/document.xml` and the optional header, footer, footnote and endnote
//! parts. Everything else in the archive (styles, media, relationships) is
//! copied through untouched when a document is rewritten.

use crate::templating::error::TemplateError;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub const MAIN_PART: &str = "word/document.xml";

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// Largest decompressed size accepted for a single text part.
pub const MAX_PART_BYTES: u64 = 100 * 1024 * 1024;

/// Where a text part sits on the page. The derived order is the order
/// parts are scanned for placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PartKind {
    Main,
    Header,
    Footer,
    Footnotes,
    Endnotes,
}

impl PartKind {
    pub fn of(name: &str) -> Option<Self> {
        if name == MAIN_PART {
            return Some(PartKind::Main);
        }
        let file = name.strip_prefix("word/").filter(|rest| !rest.contains('/'))?;
        let stem = file.strip_suffix(".xml")?;
        match stem {
            "footnotes" => Some(PartKind::Footnotes),
            "endnotes" => Some(PartKind::Endnotes),
            _ if numbered(stem, "header").is_some() => Some(PartKind::Header),
            _ if numbered(stem, "footer").is_some() => Some(PartKind::Footer),
            _ => None,
        }
    }
}

/// `header12` -> 12, `header` -> 0.
fn numbered(stem: &str, prefix: &str) -> Option<u32> {
    let digits = stem.strip_prefix(prefix)?;
    if digits.is_empty() {
        Some(0)
    } else {
        digits.parse().ok()
    }
}

fn part_order(name: &str) -> (Option<PartKind>, u32) {
    let stem = name
        .rsplit('/')
        .next()
        .and_then(|file| file.strip_suffix(".xml"))
        .unwrap_or(name);
    let index = numbered(stem, "header")
        .or_else(|| numbered(stem, "footer"))
        .unwrap_or(0);
    (PartKind::of(name), index)
}

/// Checks the magic bytes. The file extension is never trusted.
pub fn check_signature(document: &[u8]) -> Result<(), TemplateError> {
    if document.is_empty() {
        return Err(TemplateError::EmptySourceDocument);
    }
    if !document.starts_with(ZIP_SIGNATURE) {
        return Err(TemplateError::invalid(
            "expected a DOCX (ZIP) container signature",
        ));
    }
    Ok(())
}

/// An opened, signature-checked DOCX package.
pub struct DocxPackage<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    part_limit: u64,
}

impl<'a> DocxPackage<'a> {
    pub fn open(document: &'a [u8]) -> Result<Self, TemplateError> {
        check_signature(document)?;

        let archive = ZipArchive::new(Cursor::new(document)).map_err(TemplateError::invalid)?;
        if archive.index_for_name(MAIN_PART).is_none() {
            return Err(TemplateError::invalid(format!("missing {}", MAIN_PART)));
        }

        Ok(Self {
            archive,
            part_limit: MAX_PART_BYTES,
        })
    }

    pub fn with_part_limit(mut self, limit: u64) -> Self {
        self.part_limit = limit;
        self
    }

    /// Names of the parts that can hold placeholders: the main document,
    /// headers, footers, footnotes, endnotes. Numbered parts sort by number.
    pub fn text_parts(&self) -> Vec<String> {
        let mut parts: Vec<String> = self
            .archive
            .file_names()
            .filter(|name| PartKind::of(name).is_some())
            .map(str::to_string)
            .collect();
        parts.sort_by_cached_key(|name| part_order(name));
        parts
    }

    pub fn read_part(&mut self, name: &str) -> Result<String, TemplateError> {
        let limit = self.part_limit;
        let file = self.archive.by_name(name).map_err(TemplateError::invalid)?;
        let size = file.size();
        read_limited(file, size, name, limit)
    }

    /// Rebuilds the archive, passing every text part through `rewrite` and
    /// raw-copying all other entries so their compressed bytes are unchanged.
    pub fn rewrite<F>(mut self, mut rewrite: F) -> Result<Vec<u8>, TemplateError>
    where
        F: FnMut(&str, &str) -> Result<String, TemplateError>,
    {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for index in 0..self.archive.len() {
            let file = self
                .archive
                .by_index(index)
                .map_err(TemplateError::invalid)?;
            let name = file.name().to_string();

            if PartKind::of(&name).is_some() {
                let options =
                    SimpleFileOptions::default().compression_method(file.compression());
                let size = file.size();
                let xml = read_limited(file, size, &name, self.part_limit)?;

                let rewritten = rewrite(&name, &xml)?;
                writer
                    .start_file(name.as_str(), options)
                    .map_err(|e| TemplateError::RenderFailed(e.to_string()))?;
                writer
                    .write_all(rewritten.as_bytes())
                    .map_err(|e| TemplateError::RenderFailed(e.to_string()))?;
            } else {
                writer
                    .raw_copy_file(file)
                    .map_err(|e| TemplateError::RenderFailed(e.to_string()))?;
            }
        }

        let cursor = writer
            .finish()
            .map_err(|e| TemplateError::RenderFailed(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

/// Reads a part as UTF-8, refusing anything that inflates past `limit`.
/// The declared size is checked first; the read itself is capped as well,
/// since the declared size can lie.
fn read_limited(
    part: impl Read,
    declared_size: u64,
    name: &str,
    limit: u64,
) -> Result<String, TemplateError> {
    if declared_size > limit {
        return Err(TemplateError::invalid(format!(
            "{} expands to {} bytes (limit {})",
            name, declared_size, limit
        )));
    }

    let mut xml = String::new();
    part.take(limit + 1)
        .read_to_string(&mut xml)
        .map_err(|e| TemplateError::invalid(format!("{} is not UTF-8 XML: {}", name, e)))?;
    if xml.len() as u64 > limit {
        return Err(TemplateError::invalid(format!(
            "{} expands past {} bytes",
            name, limit
        )));
    }
    Ok(xml)
}
