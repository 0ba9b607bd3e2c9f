use crate::access::{Actor, PermissionResolver, PermissionSnapshot};
use crate::models::{Action, Layout, PartialTemplate, ResourceKind};
use crate::services::ServiceError;
use service_core::error::AppError;

/// Something an access decision is made about.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// The layout collection as a whole, e.g. for uploads.
    Layouts,
    Layout(&'a Layout),
    /// Documents as a whole: the role-level check, before any record is read.
    Documents,
    Document(&'a str),
    /// Checked as a document with its own id, narrowed by its audience.
    PartialTemplate(&'a PartialTemplate),
}

impl Resource<'_> {
    fn kind(&self) -> ResourceKind {
        match self {
            Resource::Layouts | Resource::Layout(_) => ResourceKind::Layout,
            Resource::Documents | Resource::Document(_) | Resource::PartialTemplate(_) => {
                ResourceKind::Document
            }
        }
    }

    fn id(&self) -> Option<&str> {
        match self {
            Resource::Layouts | Resource::Documents => None,
            Resource::Layout(layout) => Some(layout.id.as_str()),
            Resource::Document(id) => Some(*id),
            Resource::PartialTemplate(template) => Some(template.id.as_str()),
        }
    }
}

pub trait AsResource {
    fn as_resource(&self) -> Resource<'_>;
}

impl AsResource for Layout {
    fn as_resource(&self) -> Resource<'_> {
        Resource::Layout(self)
    }
}

impl AsResource for PartialTemplate {
    fn as_resource(&self) -> Resource<'_> {
        Resource::PartialTemplate(self)
    }
}

fn allowed(snapshot: &PermissionSnapshot, resource: Resource<'_>, action: Action) -> bool {
    if snapshot.role.is_administrator() {
        return true;
    }
    if let (Resource::PartialTemplate(template), Action::View) = (resource, action) {
        if !template.audience.admits(snapshot.role) {
            return false;
        }
    }
    snapshot.allows(resource.kind(), action, resource.id())
}

/// Answers view/edit/upload questions for an actor and resource. Denials
/// are reported with one uniform error whatever the cause.
#[derive(Clone)]
pub struct AccessGate {
    resolver: PermissionResolver,
}

impl AccessGate {
    pub fn new(resolver: PermissionResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    async fn check(
        &self,
        resource: Resource<'_>,
        actor: &Actor,
        action: Action,
    ) -> Result<bool, AppError> {
        let snapshot = self.resolver.snapshot(actor).await?;
        let granted = allowed(&snapshot, resource, action);
        if !granted {
            tracing::info!(
                user_id = %actor.user_id,
                role = %actor.role,
                kind = %resource.kind(),
                action = %action,
                resource_id = ?resource.id(),
                "Access denied"
            );
        }
        Ok(granted)
    }

    pub async fn can_view(&self, resource: Resource<'_>, actor: &Actor) -> Result<bool, AppError> {
        self.check(resource, actor, Action::View).await
    }

    pub async fn can_edit(&self, resource: Resource<'_>, actor: &Actor) -> Result<bool, AppError> {
        self.check(resource, actor, Action::Edit).await
    }

    pub async fn can_upload(
        &self,
        resource: Resource<'_>,
        actor: &Actor,
    ) -> Result<bool, AppError> {
        self.check(resource, actor, Action::Upload).await
    }

    pub async fn ensure_view(&self, resource: Resource<'_>, actor: &Actor) -> Result<(), ServiceError> {
        deny_unless(self.can_view(resource, actor).await?)
    }

    pub async fn ensure_edit(&self, resource: Resource<'_>, actor: &Actor) -> Result<(), ServiceError> {
        deny_unless(self.can_edit(resource, actor).await?)
    }

    pub async fn ensure_upload(
        &self,
        resource: Resource<'_>,
        actor: &Actor,
    ) -> Result<(), ServiceError> {
        deny_unless(self.can_upload(resource, actor).await?)
    }

    /// Keeps the items the actor may view. The permission records are read
    /// once and the filter itself is pure.
    pub async fn filter_allowed<T: AsResource>(
        &self,
        items: Vec<T>,
        actor: &Actor,
    ) -> Result<Vec<T>, AppError> {
        let snapshot = self.resolver.snapshot(actor).await?;
        Ok(filter_viewable(&snapshot, items))
    }
}

fn deny_unless(granted: bool) -> Result<(), ServiceError> {
    if granted {
        Ok(())
    } else {
        Err(ServiceError::AccessDenied)
    }
}

pub fn filter_viewable<T: AsResource>(snapshot: &PermissionSnapshot, items: Vec<T>) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| allowed(snapshot, item.as_resource(), Action::View))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Audience, GranularRestriction, Role, RolePermissionSet, TemplateStatus};
    use crate::services::{MemoryStore, PermissionRepository};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn template(audience: Audience) -> PartialTemplate {
        PartialTemplate::new(
            "layout-1".to_string(),
            "Declaração".to_string(),
            None,
            BTreeMap::new(),
            audience,
            TemplateStatus::Open,
            "author".to_string(),
        )
    }

    async fn gate(store: &MemoryStore) -> AccessGate {
        AccessGate::new(PermissionResolver::new(Arc::new(store.clone())))
    }

    async fn grant_document_view(store: &MemoryStore, user_id: &str, roles: &[Role]) {
        let mut set = RolePermissionSet::empty(user_id);
        set.can_access_documents = true;
        set.document_view_roles.extend(roles.iter().copied());
        store.save_permissions(&set).await.unwrap();
    }

    #[tokio::test]
    async fn audience_narrows_partial_template_view() {
        let store = MemoryStore::new();
        grant_document_view(&store, "u1", &[Role::Professor, Role::Collaborator]).await;
        let gate = gate(&store).await;

        let professor = Actor::new("u1", Role::Professor);
        let collaborator = Actor::new("u1", Role::Collaborator);
        let for_professors = template(Audience::Professor);

        assert!(gate
            .can_view(Resource::PartialTemplate(&for_professors), &professor)
            .await
            .unwrap());
        assert!(!gate
            .can_view(Resource::PartialTemplate(&for_professors), &collaborator)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn everyone_audience_still_needs_document_view() {
        let store = MemoryStore::new();
        grant_document_view(&store, "u1", &[Role::Professor]).await;
        let gate = gate(&store).await;
        let open_to_all = template(Audience::Everyone);

        assert!(gate
            .can_view(Resource::PartialTemplate(&open_to_all), &Actor::new("u1", Role::Professor))
            .await
            .unwrap());
        assert!(!gate
            .can_view(
                Resource::PartialTemplate(&open_to_all),
                &Actor::new("u1", Role::Collaborator)
            )
            .await
            .unwrap());
        assert!(!gate
            .can_view(Resource::PartialTemplate(&open_to_all), &Actor::new("u9", Role::Professor))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn administrator_bypasses_audience() {
        let store = MemoryStore::new();
        let gate = gate(&store).await;
        let for_collaborators = template(Audience::Collaborator);
        let admin = Actor::new("root", Role::Administrator);

        assert!(gate
            .can_view(Resource::PartialTemplate(&for_collaborators), &admin)
            .await
            .unwrap());
        assert!(gate.can_upload(Resource::Layouts, &admin).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_reports_uniform_denial() {
        let store = MemoryStore::new();
        let gate = gate(&store).await;
        let err = gate
            .ensure_edit(Resource::Document("d1"), &Actor::new("u1", Role::Professor))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied));
    }

    #[tokio::test]
    async fn collection_checks_ignore_granular_restrictions() {
        let store = MemoryStore::new();
        grant_document_view(&store, "u1", &[Role::Professor]).await;
        let mut restriction = GranularRestriction::new("u1", Role::Professor);
        restriction.toggle(ResourceKind::Document, "d1");
        store.save_restriction(&restriction).await.unwrap();
        let gate = gate(&store).await;

        let professor = Actor::new("u1", Role::Professor);
        assert!(gate.can_view(Resource::Documents, &professor).await.unwrap());
        assert!(!gate.can_view(Resource::Document("d1"), &professor).await.unwrap());
        assert!(!gate
            .can_view(Resource::Documents, &Actor::new("u1", Role::Collaborator))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn filter_is_idempotent() {
        let store = MemoryStore::new();
        grant_document_view(&store, "u1", &[Role::Professor]).await;
        let mut restriction = GranularRestriction::new("u1", Role::Professor);
        let hidden = template(Audience::Everyone);
        restriction.toggle(ResourceKind::Document, &hidden.id);
        store.save_restriction(&restriction).await.unwrap();
        let gate = gate(&store).await;
        let actor = Actor::new("u1", Role::Professor);

        let items = vec![
            template(Audience::Professor),
            template(Audience::Collaborator),
            hidden,
        ];
        let once = gate.filter_allowed(items, &actor).await.unwrap();
        let once_ids: Vec<String> = once.iter().map(|t| t.id.clone()).collect();
        let twice = gate.filter_allowed(once, &actor).await.unwrap();
        let twice_ids: Vec<String> = twice.iter().map(|t| t.id.clone()).collect();

        assert_eq!(once_ids.len(), 1);
        assert_eq!(once_ids, twice_ids);
    }
}
