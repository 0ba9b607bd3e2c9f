pub mod layouts;
pub mod partials;

pub use layouts::{LayoutMetadata, LayoutStore};
pub use partials::{NewPartialTemplate, PartialTemplateWorkflow};
