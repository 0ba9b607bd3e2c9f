//! Permission resolution and the gate every workflow operation goes through.

pub mod gate;
pub mod records;
pub mod resolver;

use crate::models::Role;

pub use gate::{AccessGate, AsResource, Resource};
pub use records::PermissionRecords;
pub use resolver::{PermissionResolver, PermissionSnapshot};

/// The authenticated caller, as asserted by the enclosing application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}
