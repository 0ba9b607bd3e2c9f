//! Minimal DOCX packages for unit tests.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Builds a DOCX whose body has one paragraph per entry, one run per string.
pub fn docx_from_paragraphs(paragraphs: &[&[&str]]) -> Vec<u8> {
    docx_from_body(&paragraphs_xml(paragraphs), None)
}

/// Same as [`docx_from_paragraphs`] with a `word/header1.xml` part holding
/// one paragraph of `header` text.
pub fn docx_with_header(paragraphs: &[&[&str]], header: &str) -> Vec<u8> {
    docx_from_body(&paragraphs_xml(paragraphs), Some(header))
}

fn paragraphs_xml(paragraphs: &[&[&str]]) -> String {
    paragraphs
        .iter()
        .map(|runs| {
            let runs: String = runs
                .iter()
                .map(|text| {
                    format!(
                        r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#,
                        escape(text)
                    )
                })
                .collect();
            format!("<w:p>{}</w:p>", runs)
        })
        .collect()
}

/// Builds a DOCX around a raw `w:body` fragment, with a styles part and an
/// optional header.
pub fn docx_from_body(body: &str, header: Option<&str>) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#
    );
    let styles = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{W_NS}"/>"#
    );

    let mut parts = vec![
        ("[Content_Types].xml", r#"<?xml version="1.0"?><Types/>"#.to_string()),
        ("word/document.xml", document),
        ("word/styles.xml", styles),
    ];
    if let Some(text) = header {
        parts.push((
            "word/header1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="{W_NS}"><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:hdr>"#,
                escape(text)
            ),
        ));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
