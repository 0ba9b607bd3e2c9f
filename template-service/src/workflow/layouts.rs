use crate::access::{AccessGate, Actor, Resource};
use crate::models::Layout;
use crate::services::{LayoutRepository, PartialTemplateRepository, ServiceError, Storage};
use crate::templating::extract;
use std::sync::Arc;

/// Descriptive fields supplied with an upload.
#[derive(Debug, Clone, Default)]
pub struct LayoutMetadata {
    pub name: String,
    pub description: Option<String>,
    pub original_name: Option<String>,
}

/// Layout records plus their stored documents.
#[derive(Clone)]
pub struct LayoutStore {
    repo: Arc<dyn LayoutRepository>,
    partials: Arc<dyn PartialTemplateRepository>,
    storage: Arc<dyn Storage>,
    gate: AccessGate,
}

impl LayoutStore {
    pub fn new(
        repo: Arc<dyn LayoutRepository>,
        partials: Arc<dyn PartialTemplateRepository>,
        storage: Arc<dyn Storage>,
        gate: AccessGate,
    ) -> Self {
        Self {
            repo,
            partials,
            storage,
            gate,
        }
    }

    /// Extracts placeholders before anything is written, so a document that
    /// cannot be read never becomes a Layout.
    pub async fn create(
        &self,
        document: Vec<u8>,
        metadata: LayoutMetadata,
        actor: &Actor,
    ) -> Result<Layout, ServiceError> {
        self.gate.ensure_upload(Resource::Layouts, actor).await?;

        let placeholders = extract(&document)?;
        let layout = Layout::new(
            metadata.name,
            metadata.description,
            metadata.original_name,
            document.len() as i64,
            placeholders,
            actor.user_id.clone(),
        );

        self.storage.upload(&layout.storage_key, document).await?;
        if let Err(e) = self.repo.insert_layout(&layout).await {
            if let Err(cleanup) = self.storage.delete(&layout.storage_key).await {
                tracing::warn!(
                    layout_id = %layout.id,
                    error = %cleanup,
                    "Failed to remove stored document after insert failure"
                );
            }
            return Err(e.into());
        }

        metrics::counter!("layouts_created_total").increment(1);
        tracing::info!(
            layout_id = %layout.id,
            created_by = %layout.created_by,
            placeholders = layout.placeholders.len(),
            size = layout.size,
            "Layout created"
        );

        Ok(layout)
    }

    async fn find(&self, id: &str) -> Result<Layout, ServiceError> {
        self.repo
            .find_layout(id)
            .await?
            .ok_or(ServiceError::NotFound("Layout"))
    }

    /// Callers without layout view for their role are denied before the
    /// lookup, so they cannot tell missing ids from existing ones.
    pub async fn get(&self, id: &str, actor: &Actor) -> Result<Layout, ServiceError> {
        self.gate.ensure_view(Resource::Layouts, actor).await?;
        let layout = self.find(id).await?;
        self.gate.ensure_view(Resource::Layout(&layout), actor).await?;
        Ok(layout)
    }

    pub async fn get_with_document(
        &self,
        id: &str,
        actor: &Actor,
    ) -> Result<(Layout, Vec<u8>), ServiceError> {
        let layout = self.get(id, actor).await?;
        let document = self.storage.download(&layout.storage_key).await?;
        Ok((layout, document))
    }

    /// Used by the partial template workflow, which applies its own checks.
    pub(crate) async fn load_unchecked(
        &self,
        id: &str,
    ) -> Result<(Layout, Vec<u8>), ServiceError> {
        let layout = self.find(id).await?;
        let document = self.storage.download(&layout.storage_key).await?;
        Ok((layout, document))
    }

    pub(crate) async fn find_unchecked(&self, id: &str) -> Result<Layout, ServiceError> {
        self.find(id).await
    }

    /// Newest first, limited to the layouts the actor may view.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Layout>, ServiceError> {
        let layouts = self.repo.list_layouts().await?;
        Ok(self.gate.filter_allowed(layouts, actor).await?)
    }

    /// Hard delete. The layout's partial templates go with it.
    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<(), ServiceError> {
        self.gate.ensure_edit(Resource::Layouts, actor).await?;
        let layout = self.find(id).await?;
        self.gate.ensure_edit(Resource::Layout(&layout), actor).await?;

        let removed_partials = self.partials.delete_partials_for_layout(&layout.id).await?;
        if !self.repo.delete_layout(&layout.id).await? {
            return Err(ServiceError::NotFound("Layout"));
        }
        if let Err(e) = self.storage.delete(&layout.storage_key).await {
            tracing::warn!(
                layout_id = %layout.id,
                error = %e,
                "Failed to remove stored document of deleted layout"
            );
        }

        tracing::info!(
            layout_id = %layout.id,
            deleted_by = %actor.user_id,
            removed_partials,
            "Layout deleted"
        );

        Ok(())
    }
}
