use crate::models::Layout;
use crate::templating::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub original_name: Option<String>,
    pub size: i64,
    pub placeholders: Vec<String>,
    pub created_by: String,
    pub created_at: String,
}

impl From<Layout> for LayoutResponse {
    fn from(layout: Layout) -> Self {
        Self {
            id: layout.id,
            name: layout.name,
            description: layout.description,
            original_name: layout.original_name,
            size: layout.size,
            placeholders: layout.placeholders,
            created_by: layout.created_by,
            created_at: layout.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutListResponse {
    pub layouts: Vec<LayoutResponse>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub format: OutputFormat,
}
