use crate::models::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Document,
    Layout,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Document => f.write_str("document"),
            ResourceKind::Layout => f.write_str("layout"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Edit,
    Upload,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::View => f.write_str("view"),
            Action::Edit => f.write_str("edit"),
            Action::Upload => f.write_str("upload"),
        }
    }
}

/// Per-user allow-lists of roles for each (kind, action) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePermissionSet {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub can_access_documents: bool,
    #[serde(default)]
    pub document_view_roles: BTreeSet<Role>,
    #[serde(default)]
    pub document_edit_roles: BTreeSet<Role>,
    #[serde(default)]
    pub document_upload_roles: BTreeSet<Role>,
    #[serde(default)]
    pub layout_view_roles: BTreeSet<Role>,
    #[serde(default)]
    pub layout_edit_roles: BTreeSet<Role>,
    #[serde(default)]
    pub layout_upload_roles: BTreeSet<Role>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl RolePermissionSet {
    /// A set that grants nothing.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            can_access_documents: false,
            document_view_roles: BTreeSet::new(),
            document_edit_roles: BTreeSet::new(),
            document_upload_roles: BTreeSet::new(),
            layout_view_roles: BTreeSet::new(),
            layout_edit_roles: BTreeSet::new(),
            layout_upload_roles: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn roles_for(&self, kind: ResourceKind, action: Action) -> &BTreeSet<Role> {
        match (kind, action) {
            (ResourceKind::Document, Action::View) => &self.document_view_roles,
            (ResourceKind::Document, Action::Edit) => &self.document_edit_roles,
            (ResourceKind::Document, Action::Upload) => &self.document_upload_roles,
            (ResourceKind::Layout, Action::View) => &self.layout_view_roles,
            (ResourceKind::Layout, Action::Edit) => &self.layout_edit_roles,
            (ResourceKind::Layout, Action::Upload) => &self.layout_upload_roles,
        }
    }

    /// Administrators bypass the allow-lists, so they are never stored.
    pub fn normalized(mut self) -> Self {
        for set in [
            &mut self.document_view_roles,
            &mut self.document_edit_roles,
            &mut self.document_upload_roles,
            &mut self.layout_view_roles,
            &mut self.layout_edit_roles,
            &mut self.layout_upload_roles,
        ] {
            set.remove(&Role::Administrator);
        }
        self.updated_at = Utc::now();
        self
    }
}

/// Deny overlay for one `(user, role)` pair. Applies to every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GranularRestriction {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub role: Role,
    #[serde(default)]
    pub restricted_layout_ids: BTreeSet<String>,
    #[serde(default)]
    pub restricted_document_ids: BTreeSet<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl GranularRestriction {
    pub fn key(user_id: &str, role: Role) -> String {
        format!("{}:{}", user_id, role)
    }

    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        let user_id = user_id.into();
        Self {
            id: Self::key(&user_id, role),
            user_id,
            role,
            restricted_layout_ids: BTreeSet::new(),
            restricted_document_ids: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }

    fn ids_mut(&mut self, kind: ResourceKind) -> &mut BTreeSet<String> {
        match kind {
            ResourceKind::Document => &mut self.restricted_document_ids,
            ResourceKind::Layout => &mut self.restricted_layout_ids,
        }
    }

    pub fn restricts(&self, kind: ResourceKind, id: &str) -> bool {
        match kind {
            ResourceKind::Document => self.restricted_document_ids.contains(id),
            ResourceKind::Layout => self.restricted_layout_ids.contains(id),
        }
    }

    /// Flips one id in or out of the deny set. Returns whether the id is now
    /// restricted.
    pub fn toggle(&mut self, kind: ResourceKind, id: &str) -> bool {
        let ids = self.ids_mut(kind);
        let restricted = if ids.remove(id) {
            false
        } else {
            ids.insert(id.to_string());
            true
        };
        self.updated_at = Utc::now();
        restricted
    }

    pub fn reset(&mut self) {
        self.restricted_layout_ids.clear();
        self.restricted_document_ids.clear();
        self.updated_at = Utc::now();
    }
}
