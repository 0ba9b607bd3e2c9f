pub mod health;
pub mod layouts;
pub mod partials;
pub mod permissions;

use crate::templating::GeneratedDocument;
use axum::http::header;
use axum::response::{IntoResponse, Response};

pub use health::{health_check, metrics_endpoint, readiness_check};

fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

/// Sends a generated artifact as a download.
pub(crate) fn attachment(generated: GeneratedDocument) -> Response {
    (
        [
            (header::CONTENT_TYPE, generated.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&generated.file_name),
            ),
        ],
        generated.bytes,
    )
        .into_response()
}
