use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded DOCX document whose placeholders were extracted at upload.
/// The document bytes live in blob storage under `storage_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub original_name: Option<String>,
    pub size: i64,
    pub storage_key: String,
    pub placeholders: Vec<String>,
    pub created_by: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Layout {
    pub fn new(
        name: String,
        description: Option<String>,
        original_name: Option<String>,
        size: i64,
        placeholders: Vec<String>,
        created_by: String,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            storage_key: format!("layouts/{}.docx", id),
            id,
            name,
            description,
            original_name,
            size,
            placeholders,
            created_by,
            created_at: Utc::now(),
        }
    }
}
