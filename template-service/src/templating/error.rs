use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

/// Failures of the extraction and rendering pipeline.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Source document is empty")]
    EmptySourceDocument,

    #[error("Invalid document format: {0}")]
    InvalidDocumentFormat(String),

    #[error("PDF rendering exceeded {0:?}")]
    RenderTimeout(Duration),

    #[error("Renderer produced an empty or malformed artifact")]
    EmptyOutput,

    #[error("Renderer failed: {0}")]
    RenderFailed(String),
}

impl TemplateError {
    pub(crate) fn invalid(reason: impl std::fmt::Display) -> Self {
        TemplateError::InvalidDocumentFormat(reason.to_string())
    }

    /// Render pipeline failures are reported to callers with a generic
    /// message; the detail stays in the logs.
    pub fn is_render_failure(&self) -> bool {
        matches!(
            self,
            TemplateError::RenderTimeout(_)
                | TemplateError::EmptyOutput
                | TemplateError::RenderFailed(_)
        )
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        if err.is_render_failure() {
            tracing::error!(error = %err, "Document rendering failed");
            return AppError::InternalError(anyhow::anyhow!("Document rendering failed"));
        }
        AppError::BadRequest(anyhow::Error::new(err))
    }
}
