//! Persistence seams. The core only needs whole-record read, replace and
//! delete; MongoDB implements them in production and [`MemoryStore`] in
//! tests and local development.
//!
//! [`MemoryStore`]: crate::services::MemoryStore

use crate::models::{GranularRestriction, Layout, PartialTemplate, Role, RolePermissionSet};
use async_trait::async_trait;
use service_core::error::AppError;

#[async_trait]
pub trait LayoutRepository: Send + Sync {
    async fn insert_layout(&self, layout: &Layout) -> Result<(), AppError>;
    async fn find_layout(&self, id: &str) -> Result<Option<Layout>, AppError>;
    /// Newest first.
    async fn list_layouts(&self) -> Result<Vec<Layout>, AppError>;
    /// Returns whether a record was removed.
    async fn delete_layout(&self, id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PartialTemplateRepository: Send + Sync {
    async fn insert_partial(&self, template: &PartialTemplate) -> Result<(), AppError>;
    async fn find_partial(&self, id: &str) -> Result<Option<PartialTemplate>, AppError>;
    /// Newest first, optionally limited to one layout.
    async fn list_partials(&self, layout_id: Option<&str>)
        -> Result<Vec<PartialTemplate>, AppError>;
    async fn delete_partial(&self, id: &str) -> Result<bool, AppError>;
    /// Returns the number of removed records.
    async fn delete_partials_for_layout(&self, layout_id: &str) -> Result<u64, AppError>;
}

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn find_permissions(&self, user_id: &str)
        -> Result<Option<RolePermissionSet>, AppError>;
    async fn save_permissions(&self, permissions: &RolePermissionSet) -> Result<(), AppError>;
    async fn find_restriction(
        &self,
        user_id: &str,
        role: Role,
    ) -> Result<Option<GranularRestriction>, AppError>;
    async fn save_restriction(&self, restriction: &GranularRestriction) -> Result<(), AppError>;
}

/// Readiness probe for the backing store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;
}
