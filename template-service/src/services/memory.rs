//! In-process implementations of the repositories and blob storage, used by
//! the test suite and by `STORAGE_BACKEND=memory` for local runs.

use crate::models::{GranularRestriction, Layout, PartialTemplate, Role, RolePermissionSet};
use crate::services::repository::{
    HealthProbe, LayoutRepository, PartialTemplateRepository, PermissionRepository,
};
use crate::services::storage::Storage;
use async_trait::async_trait;
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryStore {
    layouts: Arc<DashMap<String, Layout>>,
    partials: Arc<DashMap<String, PartialTemplate>>,
    permissions: Arc<DashMap<String, RolePermissionSet>>,
    restrictions: Arc<DashMap<String, GranularRestriction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl LayoutRepository for MemoryStore {
    async fn insert_layout(&self, layout: &Layout) -> Result<(), AppError> {
        if self.layouts.contains_key(&layout.id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Layout {} already exists",
                layout.id
            )));
        }
        self.layouts.insert(layout.id.clone(), layout.clone());
        Ok(())
    }

    async fn find_layout(&self, id: &str) -> Result<Option<Layout>, AppError> {
        Ok(self.layouts.get(id).map(|entry| entry.value().clone()))
    }

    async fn list_layouts(&self) -> Result<Vec<Layout>, AppError> {
        let mut layouts: Vec<Layout> = self.layouts.iter().map(|e| e.value().clone()).collect();
        layouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(layouts)
    }

    async fn delete_layout(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.layouts.remove(id).is_some())
    }
}

#[async_trait]
impl PartialTemplateRepository for MemoryStore {
    async fn insert_partial(&self, template: &PartialTemplate) -> Result<(), AppError> {
        self.partials.insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn find_partial(&self, id: &str) -> Result<Option<PartialTemplate>, AppError> {
        Ok(self.partials.get(id).map(|entry| entry.value().clone()))
    }

    async fn list_partials(
        &self,
        layout_id: Option<&str>,
    ) -> Result<Vec<PartialTemplate>, AppError> {
        let mut partials: Vec<PartialTemplate> = self
            .partials
            .iter()
            .filter(|e| layout_id.is_none_or(|id| e.value().layout_id == id))
            .map(|e| e.value().clone())
            .collect();
        partials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(partials)
    }

    async fn delete_partial(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.partials.remove(id).is_some())
    }

    async fn delete_partials_for_layout(&self, layout_id: &str) -> Result<u64, AppError> {
        let mut removed = 0u64;
        self.partials.retain(|_, t| {
            let keep = t.layout_id != layout_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

#[async_trait]
impl PermissionRepository for MemoryStore {
    async fn find_permissions(
        &self,
        user_id: &str,
    ) -> Result<Option<RolePermissionSet>, AppError> {
        Ok(self.permissions.get(user_id).map(|e| e.value().clone()))
    }

    async fn save_permissions(&self, permissions: &RolePermissionSet) -> Result<(), AppError> {
        self.permissions
            .insert(permissions.user_id.clone(), permissions.clone());
        Ok(())
    }

    async fn find_restriction(
        &self,
        user_id: &str,
        role: Role,
    ) -> Result<Option<GranularRestriction>, AppError> {
        let key = GranularRestriction::key(user_id, role);
        Ok(self.restrictions.get(&key).map(|e| e.value().clone()))
    }

    async fn save_restriction(&self, restriction: &GranularRestriction) -> Result<(), AppError> {
        self.restrictions
            .insert(restriction.id.clone(), restriction.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        self.blobs.insert(key.to_string(), data);
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        self.blobs
            .get(key)
            .map(|e| e.value().clone())
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Stored document {} not found", key)))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.blobs.remove(key);
        Ok(())
    }
}
