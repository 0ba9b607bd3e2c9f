use crate::access::Actor;
use crate::models::{GranularRestriction, ResourceKind, Role, RolePermissionSet};
use crate::services::{PermissionRepository, ServiceError};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Administration of role permission sets and granular restrictions.
/// Only administrators may read or change them.
#[derive(Clone)]
pub struct PermissionRecords {
    repo: Arc<dyn PermissionRepository>,
}

impl PermissionRecords {
    pub fn new(repo: Arc<dyn PermissionRepository>) -> Self {
        Self { repo }
    }

    fn ensure_administrator(actor: &Actor) -> Result<(), ServiceError> {
        if actor.role.is_administrator() {
            Ok(())
        } else {
            Err(ServiceError::AccessDenied)
        }
    }

    /// Missing records read as the empty, maximally restrictive set.
    pub async fn role_permissions(
        &self,
        user_id: &str,
        actor: &Actor,
    ) -> Result<RolePermissionSet, ServiceError> {
        Self::ensure_administrator(actor)?;
        Ok(self
            .repo
            .find_permissions(user_id)
            .await?
            .unwrap_or_else(|| RolePermissionSet::empty(user_id)))
    }

    pub async fn set_role_permissions(
        &self,
        permissions: RolePermissionSet,
        actor: &Actor,
    ) -> Result<RolePermissionSet, ServiceError> {
        Self::ensure_administrator(actor)?;
        let permissions = permissions.normalized();
        self.repo.save_permissions(&permissions).await?;

        tracing::info!(
            user_id = %permissions.user_id,
            changed_by = %actor.user_id,
            can_access_documents = permissions.can_access_documents,
            "Role permissions saved"
        );

        Ok(permissions)
    }

    pub async fn restrictions(
        &self,
        user_id: &str,
        role: Role,
        actor: &Actor,
    ) -> Result<GranularRestriction, ServiceError> {
        Self::ensure_administrator(actor)?;
        Ok(self
            .repo
            .find_restriction(user_id, role)
            .await?
            .unwrap_or_else(|| GranularRestriction::new(user_id, role)))
    }

    pub async fn set_restrictions(
        &self,
        user_id: &str,
        role: Role,
        layouts: BTreeSet<String>,
        documents: BTreeSet<String>,
        actor: &Actor,
    ) -> Result<GranularRestriction, ServiceError> {
        Self::ensure_administrator(actor)?;
        let mut restriction = GranularRestriction::new(user_id, role);
        restriction.restricted_layout_ids = layouts;
        restriction.restricted_document_ids = documents;
        self.repo.save_restriction(&restriction).await?;

        tracing::info!(
            user_id = %user_id,
            role = %role,
            changed_by = %actor.user_id,
            layouts = restriction.restricted_layout_ids.len(),
            documents = restriction.restricted_document_ids.len(),
            "Granular restrictions replaced"
        );

        Ok(restriction)
    }

    /// Flips a single id. Returns the saved record and whether the id is now
    /// restricted.
    pub async fn toggle_restriction(
        &self,
        user_id: &str,
        role: Role,
        kind: ResourceKind,
        resource_id: &str,
        actor: &Actor,
    ) -> Result<(GranularRestriction, bool), ServiceError> {
        let mut restriction = self.restrictions(user_id, role, actor).await?;
        let restricted = restriction.toggle(kind, resource_id);
        self.repo.save_restriction(&restriction).await?;

        tracing::info!(
            user_id = %user_id,
            role = %role,
            kind = %kind,
            resource_id = %resource_id,
            restricted,
            changed_by = %actor.user_id,
            "Granular restriction toggled"
        );

        Ok((restriction, restricted))
    }

    pub async fn reset_restrictions(
        &self,
        user_id: &str,
        role: Role,
        actor: &Actor,
    ) -> Result<GranularRestriction, ServiceError> {
        let mut restriction = self.restrictions(user_id, role, actor).await?;
        restriction.reset();
        self.repo.save_restriction(&restriction).await?;

        tracing::info!(
            user_id = %user_id,
            role = %role,
            changed_by = %actor.user_id,
            "Granular restrictions reset"
        );

        Ok(restriction)
    }
}
