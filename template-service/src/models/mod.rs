pub mod layout;
pub mod partial_template;
pub mod permission;
pub mod role;

pub use layout::Layout;
pub use partial_template::{Audience, PartialTemplate, TemplateStatus};
pub use permission::{Action, GranularRestriction, ResourceKind, RolePermissionSet};
pub use role::Role;
