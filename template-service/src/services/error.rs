use crate::templating::TemplateError;
use service_core::error::AppError;
use thiserror::Error;

/// Every denial carries the same message so callers cannot tell a missing
/// role from a restriction or an audience mismatch.
pub const ACCESS_DENIED_MESSAGE: &str = "You do not have access to this resource";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Access denied")]
    AccessDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Missing values for placeholders: {}", .0.join(", "))]
    IncompleteFields(Vec<String>),

    #[error("Unknown placeholders: {}", .0.join(", "))]
    UnknownFields(Vec<String>),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::AccessDenied => AppError::Forbidden(anyhow::anyhow!(ACCESS_DENIED_MESSAGE)),
            ServiceError::NotFound(what) => AppError::NotFound(anyhow::anyhow!("{} not found", what)),
            ServiceError::IncompleteFields(fields) => AppError::UnprocessableEntity {
                message: "Some placeholders have no value".to_string(),
                fields,
            },
            ServiceError::UnknownFields(fields) => AppError::BadRequest(anyhow::anyhow!(
                "Unknown placeholders: {}",
                fields.join(", ")
            )),
            ServiceError::InvalidInput(message) => AppError::BadRequest(anyhow::anyhow!(message)),
            ServiceError::Template(e) => e.into(),
            ServiceError::App(e) => e,
        }
    }
}
