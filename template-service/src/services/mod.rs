pub mod database;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod repository;
pub mod storage;

pub use database::MongoDb;
pub use error::ServiceError;
pub use memory::{MemoryStorage, MemoryStore};
pub use metrics::{get_metrics, init_metrics};
pub use repository::{
    HealthProbe, LayoutRepository, PartialTemplateRepository, PermissionRepository,
};
pub use storage::{LocalStorage, Storage};
