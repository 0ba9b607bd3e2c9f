use crate::models::{GranularRestriction, ResourceKind, Role, RolePermissionSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

/// Role sets are accepted as role names or numeric ids.
#[derive(Debug, Default, Deserialize)]
pub struct RolePermissionsRequest {
    pub can_access_documents: bool,
    #[serde(default)]
    pub document_view_roles: Vec<String>,
    #[serde(default)]
    pub document_edit_roles: Vec<String>,
    #[serde(default)]
    pub document_upload_roles: Vec<String>,
    #[serde(default)]
    pub layout_view_roles: Vec<String>,
    #[serde(default)]
    pub layout_edit_roles: Vec<String>,
    #[serde(default)]
    pub layout_upload_roles: Vec<String>,
}

fn parse_roles(values: &[String]) -> Result<BTreeSet<Role>, String> {
    values.iter().map(|v| v.parse::<Role>()).collect()
}

impl RolePermissionsRequest {
    pub fn into_permissions(self, user_id: &str) -> Result<RolePermissionSet, String> {
        let mut set = RolePermissionSet::empty(user_id);
        set.can_access_documents = self.can_access_documents;
        set.document_view_roles = parse_roles(&self.document_view_roles)?;
        set.document_edit_roles = parse_roles(&self.document_edit_roles)?;
        set.document_upload_roles = parse_roles(&self.document_upload_roles)?;
        set.layout_view_roles = parse_roles(&self.layout_view_roles)?;
        set.layout_edit_roles = parse_roles(&self.layout_edit_roles)?;
        set.layout_upload_roles = parse_roles(&self.layout_upload_roles)?;
        Ok(set)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RolePermissionsResponse {
    pub user_id: String,
    pub can_access_documents: bool,
    pub document_view_roles: BTreeSet<Role>,
    pub document_edit_roles: BTreeSet<Role>,
    pub document_upload_roles: BTreeSet<Role>,
    pub layout_view_roles: BTreeSet<Role>,
    pub layout_edit_roles: BTreeSet<Role>,
    pub layout_upload_roles: BTreeSet<Role>,
    pub updated_at: String,
}

impl From<RolePermissionSet> for RolePermissionsResponse {
    fn from(set: RolePermissionSet) -> Self {
        Self {
            user_id: set.user_id,
            can_access_documents: set.can_access_documents,
            document_view_roles: set.document_view_roles,
            document_edit_roles: set.document_edit_roles,
            document_upload_roles: set.document_upload_roles,
            layout_view_roles: set.layout_view_roles,
            layout_edit_roles: set.layout_edit_roles,
            layout_upload_roles: set.layout_upload_roles,
            updated_at: set.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SetRestrictionsRequest {
    #[serde(default)]
    pub layouts: BTreeSet<String>,
    #[serde(default)]
    pub documents: BTreeSet<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ToggleRestrictionRequest {
    pub kind: ResourceKind,
    #[validate(length(min = 1, message = "Resource id is required"))]
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestrictionResponse {
    pub user_id: String,
    pub role: Role,
    pub restricted_layout_ids: BTreeSet<String>,
    pub restricted_document_ids: BTreeSet<String>,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted: Option<bool>,
}

impl RestrictionResponse {
    pub fn with_toggle(restriction: GranularRestriction, restricted: bool) -> Self {
        Self {
            restricted: Some(restricted),
            ..Self::from(restriction)
        }
    }
}

impl From<GranularRestriction> for RestrictionResponse {
    fn from(restriction: GranularRestriction) -> Self {
        Self {
            user_id: restriction.user_id,
            role: restriction.role,
            restricted_layout_ids: restriction.restricted_layout_ids,
            restricted_document_ids: restriction.restricted_document_ids,
            updated_at: restriction.updated_at.to_rfc3339(),
            restricted: None,
        }
    }
}
