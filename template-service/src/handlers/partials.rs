use crate::access::Actor;
use crate::dtos::{
    CompleteRequest, PartialListParams, PartialListResponse, PartialTemplateResponse,
    PreviewRequest, SavePartialRequest,
};
use crate::handlers::attachment;
use crate::startup::AppState;
use crate::workflow::NewPartialTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

pub async fn save_partial(
    State(state): State<AppState>,
    actor: Actor,
    Path(layout_id): Path<String>,
    Json(req): Json<SavePartialRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let template = state
        .partials
        .create_from_layout(
            &layout_id,
            NewPartialTemplate {
                title: req.title.trim().to_string(),
                description: req.description,
                content: req.content,
                audience: req.audience,
            },
            &actor,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PartialTemplateResponse::from(template)),
    ))
}

pub async fn list_partials(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<PartialListParams>,
) -> Result<impl IntoResponse, AppError> {
    let partial_templates: Vec<PartialTemplateResponse> = state
        .partials
        .list(params.layout_id.as_deref(), &actor)
        .await?
        .into_iter()
        .map(PartialTemplateResponse::from)
        .collect();

    Ok(Json(PartialListResponse {
        total: partial_templates.len(),
        partial_templates,
    }))
}

pub async fn get_partial(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let template = state.partials.get(&id, &actor).await?;
    Ok(Json(PartialTemplateResponse::from(template)))
}

pub async fn delete_partial(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.partials.delete(&id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn preview_partial(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let html = state.partials.preview(&id, req.values, &actor).await?;
    Ok(Html(html))
}

pub async fn complete_partial(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let generated = state
        .partials
        .complete(&id, req.values, req.format, &actor)
        .await?;
    Ok(attachment(generated))
}
