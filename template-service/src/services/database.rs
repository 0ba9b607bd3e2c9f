use crate::models::{GranularRestriction, Layout, PartialTemplate, Role, RolePermissionSet};
use crate::services::repository::{
    HealthProbe, LayoutRepository, PartialTemplateRepository, PermissionRepository,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, IndexOptions, ReplaceOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for template-service");

        let layouts_by_date = IndexModel::builder()
            .keys(doc! { "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("created_at_desc".to_string())
                    .build(),
            )
            .build();

        self.layouts()
            .create_index(layouts_by_date, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create created_at index on layouts collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on layouts.created_at");

        let partials_by_layout = IndexModel::builder()
            .keys(doc! { "layout_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("layout_lookup".to_string())
                    .build(),
            )
            .build();

        self.partial_templates()
            .create_index(partials_by_layout, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create layout index on partial_templates collection: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index on partial_templates.(layout_id, created_at)");

        let restrictions_by_user = IndexModel::builder()
            .keys(doc! { "user_id": 1, "role": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_role_lookup".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.granular_restrictions()
            .create_index(restrictions_by_user, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create user_role index on granular_restrictions collection: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index on granular_restrictions.(user_id, role)");

        Ok(())
    }

    pub fn layouts(&self) -> Collection<Layout> {
        self.db.collection("layouts")
    }

    pub fn partial_templates(&self) -> Collection<PartialTemplate> {
        self.db.collection("partial_templates")
    }

    pub fn role_permissions(&self) -> Collection<RolePermissionSet> {
        self.db.collection("role_permissions")
    }

    pub fn granular_restrictions(&self) -> Collection<GranularRestriction> {
        self.db.collection("granular_restrictions")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": -1 }).build()
}

fn upsert() -> ReplaceOptions {
    ReplaceOptions::builder().upsert(true).build()
}

#[async_trait]
impl HealthProbe for MongoDb {
    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}

#[async_trait]
impl LayoutRepository for MongoDb {
    async fn insert_layout(&self, layout: &Layout) -> Result<(), AppError> {
        self.layouts().insert_one(layout, None).await?;
        Ok(())
    }

    async fn find_layout(&self, id: &str) -> Result<Option<Layout>, AppError> {
        Ok(self.layouts().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_layouts(&self) -> Result<Vec<Layout>, AppError> {
        let cursor = self.layouts().find(None, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_layout(&self, id: &str) -> Result<bool, AppError> {
        let result = self.layouts().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl PartialTemplateRepository for MongoDb {
    async fn insert_partial(&self, template: &PartialTemplate) -> Result<(), AppError> {
        self.partial_templates().insert_one(template, None).await?;
        Ok(())
    }

    async fn find_partial(&self, id: &str) -> Result<Option<PartialTemplate>, AppError> {
        Ok(self
            .partial_templates()
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn list_partials(
        &self,
        layout_id: Option<&str>,
    ) -> Result<Vec<PartialTemplate>, AppError> {
        let filter = layout_id.map(|id| doc! { "layout_id": id });
        let cursor = self.partial_templates().find(filter, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_partial(&self, id: &str) -> Result<bool, AppError> {
        let result = self
            .partial_templates()
            .delete_one(doc! { "_id": id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_partials_for_layout(&self, layout_id: &str) -> Result<u64, AppError> {
        let result = self
            .partial_templates()
            .delete_many(doc! { "layout_id": layout_id }, None)
            .await?;
        Ok(result.deleted_count)
    }
}

#[async_trait]
impl PermissionRepository for MongoDb {
    async fn find_permissions(
        &self,
        user_id: &str,
    ) -> Result<Option<RolePermissionSet>, AppError> {
        Ok(self
            .role_permissions()
            .find_one(doc! { "_id": user_id }, None)
            .await?)
    }

    async fn save_permissions(&self, permissions: &RolePermissionSet) -> Result<(), AppError> {
        self.role_permissions()
            .replace_one(doc! { "_id": permissions.user_id.as_str() }, permissions, upsert())
            .await?;
        Ok(())
    }

    async fn find_restriction(
        &self,
        user_id: &str,
        role: Role,
    ) -> Result<Option<GranularRestriction>, AppError> {
        let id = GranularRestriction::key(user_id, role);
        Ok(self
            .granular_restrictions()
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn save_restriction(&self, restriction: &GranularRestriction) -> Result<(), AppError> {
        self.granular_restrictions()
            .replace_one(doc! { "_id": restriction.id.as_str() }, restriction, upsert())
            .await?;
        Ok(())
    }
}
