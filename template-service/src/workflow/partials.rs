use crate::access::{AccessGate, Actor, Resource};
use crate::models::{Audience, PartialTemplate, TemplateStatus};
use crate::services::{PartialTemplateRepository, ServiceError};
use crate::templating::{GeneratedDocument, OutputFormat, TemplateRenderer};
use crate::workflow::layouts::LayoutStore;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Input for saving a partial template. `audience` is validated by the
/// workflow, after the edit check.
#[derive(Debug, Clone)]
pub struct NewPartialTemplate {
    pub title: String,
    pub description: Option<String>,
    pub content: BTreeMap<String, String>,
    pub audience: String,
}

/// Partial templates are layouts with some values filled in by an author
/// and completed, any number of times, by members of their audience.
#[derive(Clone)]
pub struct PartialTemplateWorkflow {
    repo: Arc<dyn PartialTemplateRepository>,
    layouts: LayoutStore,
    renderer: TemplateRenderer,
    gate: AccessGate,
}

/// Completer values overlaid by the author's: the author wins on shared keys.
fn merge(
    author: &BTreeMap<String, String>,
    completer: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = completer;
    merged.extend(author.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Placeholders with no key in `values`, in layout order.
fn missing_fields(placeholders: &[String], values: &BTreeMap<String, String>) -> Vec<String> {
    placeholders
        .iter()
        .filter(|name| !values.contains_key(name.as_str()))
        .cloned()
        .collect()
}

impl PartialTemplateWorkflow {
    pub fn new(
        repo: Arc<dyn PartialTemplateRepository>,
        layouts: LayoutStore,
        renderer: TemplateRenderer,
        gate: AccessGate,
    ) -> Self {
        Self {
            repo,
            layouts,
            renderer,
            gate,
        }
    }

    pub async fn create_from_layout(
        &self,
        layout_id: &str,
        input: NewPartialTemplate,
        actor: &Actor,
    ) -> Result<PartialTemplate, ServiceError> {
        self.gate.ensure_edit(Resource::Layouts, actor).await?;
        let layout = self.layouts.find_unchecked(layout_id).await?;
        self.gate.ensure_edit(Resource::Layout(&layout), actor).await?;

        let audience: Audience = input.audience.parse().map_err(ServiceError::InvalidInput)?;

        let unknown: Vec<String> = input
            .content
            .keys()
            .filter(|key| !layout.placeholders.contains(*key))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ServiceError::UnknownFields(unknown));
        }

        let status = if missing_fields(&layout.placeholders, &input.content).is_empty() {
            TemplateStatus::Complete
        } else {
            TemplateStatus::Open
        };

        let template = PartialTemplate::new(
            layout.id.clone(),
            input.title,
            input.description,
            input.content,
            audience,
            status,
            actor.user_id.clone(),
        );
        self.repo.insert_partial(&template).await?;

        tracing::info!(
            template_id = %template.id,
            layout_id = %layout.id,
            audience = ?template.audience,
            status = ?template.status,
            created_by = %template.created_by,
            "Partial template saved"
        );

        Ok(template)
    }

    async fn find(&self, id: &str) -> Result<PartialTemplate, ServiceError> {
        self.repo
            .find_partial(id)
            .await?
            .ok_or(ServiceError::NotFound("Partial template"))
    }

    pub async fn get(&self, id: &str, actor: &Actor) -> Result<PartialTemplate, ServiceError> {
        self.gate.ensure_view(Resource::Documents, actor).await?;
        let template = self.find(id).await?;
        self.gate
            .ensure_view(Resource::PartialTemplate(&template), actor)
            .await?;
        Ok(template)
    }

    /// Newest first, limited to the templates the actor may view.
    pub async fn list(
        &self,
        layout_id: Option<&str>,
        actor: &Actor,
    ) -> Result<Vec<PartialTemplate>, ServiceError> {
        let templates = self.repo.list_partials(layout_id).await?;
        Ok(self.gate.filter_allowed(templates, actor).await?)
    }

    /// Renders the merged values as HTML without requiring every field.
    pub async fn preview(
        &self,
        id: &str,
        completer_content: BTreeMap<String, String>,
        actor: &Actor,
    ) -> Result<String, ServiceError> {
        let template = self.get(id, actor).await?;
        let (_, document) = self.layouts.load_unchecked(&template.layout_id).await?;
        let values = merge(&template.content, completer_content);
        Ok(self.renderer.render_preview(&document, &values)?)
    }

    /// Access is checked before any field validation. The record is left
    /// untouched, so every completion is an independent generation.
    pub async fn complete(
        &self,
        id: &str,
        completer_content: BTreeMap<String, String>,
        format: OutputFormat,
        actor: &Actor,
    ) -> Result<GeneratedDocument, ServiceError> {
        let template = self.get(id, actor).await?;
        let (layout, document) = self.layouts.load_unchecked(&template.layout_id).await?;

        let values = merge(&template.content, completer_content);
        let missing = missing_fields(&layout.placeholders, &values);
        if !missing.is_empty() {
            tracing::debug!(
                template_id = %template.id,
                missing = ?missing,
                "Completion rejected: missing fields"
            );
            return Err(ServiceError::IncompleteFields(missing));
        }

        let generated = self
            .renderer
            .render(&document, &values, format, &template.title)
            .await?;

        metrics::counter!("partial_templates_completed_total", "format" => format.as_str())
            .increment(1);
        tracing::info!(
            template_id = %template.id,
            layout_id = %layout.id,
            completed_by = %actor.user_id,
            format = format.as_str(),
            size = generated.bytes.len(),
            "Partial template completed"
        );

        Ok(generated)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<(), ServiceError> {
        self.gate.ensure_edit(Resource::Documents, actor).await?;
        let template = self.find(id).await?;
        self.gate
            .ensure_edit(Resource::PartialTemplate(&template), actor)
            .await?;

        if !self.repo.delete_partial(&template.id).await? {
            return Err(ServiceError::NotFound("Partial template"));
        }

        tracing::info!(
            template_id = %template.id,
            deleted_by = %actor.user_id,
            "Partial template deleted"
        );

        Ok(())
    }
}
