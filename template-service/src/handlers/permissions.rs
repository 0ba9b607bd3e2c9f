use crate::access::Actor;
use crate::dtos::{
    RestrictionResponse, RolePermissionsRequest, RolePermissionsResponse,
    SetRestrictionsRequest, ToggleRestrictionRequest,
};
use crate::models::Role;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

fn parse_role(role: &str) -> Result<Role, AppError> {
    role.parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))
}

pub async fn get_role_permissions(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let set = state.permissions.role_permissions(&user_id, &actor).await?;
    Ok(Json(RolePermissionsResponse::from(set)))
}

pub async fn set_role_permissions(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<String>,
    Json(req): Json<RolePermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let set = req
        .into_permissions(&user_id)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;
    let saved = state.permissions.set_role_permissions(set, &actor).await?;
    Ok(Json(RolePermissionsResponse::from(saved)))
}

pub async fn get_restrictions(
    State(state): State<AppState>,
    actor: Actor,
    Path((user_id, role)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(&role)?;
    let restriction = state
        .permissions
        .restrictions(&user_id, role, &actor)
        .await?;
    Ok(Json(RestrictionResponse::from(restriction)))
}

pub async fn set_restrictions(
    State(state): State<AppState>,
    actor: Actor,
    Path((user_id, role)): Path<(String, String)>,
    Json(req): Json<SetRestrictionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(&role)?;
    let restriction = state
        .permissions
        .set_restrictions(&user_id, role, req.layouts, req.documents, &actor)
        .await?;
    Ok(Json(RestrictionResponse::from(restriction)))
}

pub async fn toggle_restriction(
    State(state): State<AppState>,
    actor: Actor,
    Path((user_id, role)): Path<(String, String)>,
    Json(req): Json<ToggleRestrictionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let role = parse_role(&role)?;
    let (restriction, restricted) = state
        .permissions
        .toggle_restriction(&user_id, role, req.kind, &req.id, &actor)
        .await?;
    Ok(Json(RestrictionResponse::with_toggle(restriction, restricted)))
}

pub async fn reset_restrictions(
    State(state): State<AppState>,
    actor: Actor,
    Path((user_id, role)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(&role)?;
    let restriction = state
        .permissions
        .reset_restrictions(&user_id, role, &actor)
        .await?;
    Ok(Json(RestrictionResponse::from(restriction)))
}
