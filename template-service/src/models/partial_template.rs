use crate::models::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// Which roles a partial template is offered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Professor,
    Collaborator,
    Everyone,
}

impl Audience {
    /// Whether a non-administrator with `role` is in the audience.
    /// Administrators are handled by the access gate before this is asked.
    pub fn admits(&self, role: Role) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Professor => role == Role::Professor,
            Audience::Collaborator => role == Role::Collaborator,
        }
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "professor" => Ok(Audience::Professor),
            "collaborator" | "colaborador" => Ok(Audience::Collaborator),
            "everyone" | "todos" => Ok(Audience::Everyone),
            _ => Err(format!(
                "Invalid audience '{}': expected professor, collaborator or everyone",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Open,
    Complete,
}

/// A layout with some placeholders pre-filled by its author, offered to an
/// audience for completion. Completing never changes the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialTemplate {
    #[serde(rename = "_id")]
    pub id: String,
    pub layout_id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: BTreeMap<String, String>,
    pub audience: Audience,
    pub status: TemplateStatus,
    pub created_by: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl PartialTemplate {
    pub fn new(
        layout_id: String,
        title: String,
        description: Option<String>,
        content: BTreeMap<String, String>,
        audience: Audience,
        status: TemplateStatus,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            layout_id,
            title,
            description,
            content,
            audience,
            status,
            created_by,
            created_at: Utc::now(),
        }
    }
}
