//! Caller identity extractor.
//!
//! The enclosing application authenticates users and forwards who they are
//! in `X-User-ID` and `X-User-Role`. The role is normalised into [`Role`]
//! here, so nothing past this point compares raw role strings.

use crate::access::Actor;
use crate::models::Role;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?;
        let role: Role = header(parts, USER_ROLE_HEADER)?
            .parse()
            .map_err(|e: String| AppError::AuthError(anyhow::anyhow!(e)))?;

        let span = tracing::Span::current();
        span.record("user_id", user_id);
        span.record("role", role.as_str());

        Ok(Actor::new(user_id, role))
    }
}
