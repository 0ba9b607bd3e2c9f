use crate::access::Actor;
use crate::models::{Action, GranularRestriction, ResourceKind, Role, RolePermissionSet};
use crate::services::PermissionRepository;
use service_core::error::AppError;
use std::sync::Arc;

/// The permission records of one `(user, role)` pair, loaded together so a
/// list can be filtered against a single consistent read.
#[derive(Debug, Clone)]
pub struct PermissionSnapshot {
    pub role: Role,
    pub permissions: Option<RolePermissionSet>,
    pub restriction: Option<GranularRestriction>,
}

impl PermissionSnapshot {
    /// Resolution order, first match wins:
    /// 1. administrator: allowed
    /// 2. id in the deny overlay for this kind: denied
    /// 3. no permission record or documents switched off: denied
    /// 4. role in the `<kind>_<action>_roles` allow-list
    ///
    /// The deny overlay is checked before the allow-list, otherwise a
    /// per-item restriction could never override a role-level allow.
    pub fn allows(&self, kind: ResourceKind, action: Action, resource_id: Option<&str>) -> bool {
        if self.role.is_administrator() {
            return true;
        }

        if let (Some(id), Some(restriction)) = (resource_id, self.restriction.as_ref()) {
            if restriction.restricts(kind, id) {
                return false;
            }
        }

        let Some(permissions) = self.permissions.as_ref() else {
            return false;
        };
        if !permissions.can_access_documents {
            return false;
        }

        permissions.roles_for(kind, action).contains(&self.role)
    }
}

/// Reads the permission records on every call. Nothing is cached across
/// requests, so a saved change applies to the next request.
#[derive(Clone)]
pub struct PermissionResolver {
    repo: Arc<dyn PermissionRepository>,
}

impl PermissionResolver {
    pub fn new(repo: Arc<dyn PermissionRepository>) -> Self {
        Self { repo }
    }

    pub async fn snapshot(&self, actor: &Actor) -> Result<PermissionSnapshot, AppError> {
        if actor.role.is_administrator() {
            return Ok(PermissionSnapshot {
                role: actor.role,
                permissions: None,
                restriction: None,
            });
        }

        let permissions = self.repo.find_permissions(&actor.user_id).await?;
        let restriction = self
            .repo
            .find_restriction(&actor.user_id, actor.role)
            .await?;

        Ok(PermissionSnapshot {
            role: actor.role,
            permissions,
            restriction,
        })
    }

    pub async fn effective(
        &self,
        user_id: &str,
        role: Role,
        kind: ResourceKind,
        action: Action,
        resource_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let actor = Actor::new(user_id, role);
        let allowed = self
            .snapshot(&actor)
            .await?
            .allows(kind, action, resource_id);

        tracing::debug!(
            user_id = %user_id,
            role = %role,
            kind = %kind,
            action = %action,
            resource_id = ?resource_id,
            allowed,
            "Resolved permission"
        );

        Ok(allowed)
    }
}
