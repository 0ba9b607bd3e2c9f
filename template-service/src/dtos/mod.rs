pub mod layouts;
pub mod partials;
pub mod permissions;

pub use layouts::{GenerateRequest, LayoutListResponse, LayoutResponse, PreviewRequest};
pub use partials::{
    CompleteRequest, PartialListParams, PartialListResponse, PartialTemplateResponse,
    SavePartialRequest,
};
pub use permissions::{
    RestrictionResponse, RolePermissionsRequest, RolePermissionsResponse,
    SetRestrictionsRequest, ToggleRestrictionRequest,
};
