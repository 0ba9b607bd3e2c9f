use crate::models::{Audience, PartialTemplate, TemplateStatus};
use crate::templating::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SavePartialRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub content: BTreeMap<String, String>,
    pub audience: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Deserialize)]
pub struct PartialListParams {
    pub layout_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartialTemplateResponse {
    pub id: String,
    pub layout_id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: BTreeMap<String, String>,
    pub audience: Audience,
    pub status: TemplateStatus,
    pub created_by: String,
    pub created_at: String,
}

impl From<PartialTemplate> for PartialTemplateResponse {
    fn from(template: PartialTemplate) -> Self {
        Self {
            id: template.id,
            layout_id: template.layout_id,
            title: template.title,
            description: template.description,
            content: template.content,
            audience: template.audience,
            status: template.status,
            created_by: template.created_by,
            created_at: template.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartialListResponse {
    pub partial_templates: Vec<PartialTemplateResponse>,
    pub total: usize,
}
