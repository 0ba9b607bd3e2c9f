use crate::access::Actor;
use crate::dtos::{GenerateRequest, LayoutListResponse, LayoutResponse, PreviewRequest};
use crate::handlers::attachment;
use crate::startup::AppState;
use crate::workflow::LayoutMetadata;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use service_core::error::AppError;

fn file_stem(name: &str) -> String {
    std::path::Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

pub async fn upload_layout(
    State(state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut document: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        match field.name() {
            Some("file") => {
                original_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
                })?;
                document = Some(data.to_vec());
            }
            Some("name") => {
                name = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read name: {}", e))
                })?);
            }
            Some("description") => {
                description = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read description: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let document =
        document.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    if document.len() > state.config.max_upload_bytes {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "File too large (max {} bytes)",
            state.config.max_upload_bytes
        )));
    }

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| original_name.as_deref().map(file_stem))
        .unwrap_or_else(|| "Untitled layout".to_string());
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    tracing::info!(
        filename = ?original_name,
        size = document.len(),
        "Layout upload started"
    );

    let layout = state
        .layouts
        .create(
            document,
            LayoutMetadata {
                name,
                description,
                original_name,
            },
            &actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(LayoutResponse::from(layout))))
}

pub async fn list_layouts(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let layouts: Vec<LayoutResponse> = state
        .layouts
        .list(&actor)
        .await?
        .into_iter()
        .map(LayoutResponse::from)
        .collect();

    Ok(Json(LayoutListResponse {
        total: layouts.len(),
        layouts,
    }))
}

pub async fn get_layout(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let layout = state.layouts.get(&id, &actor).await?;
    Ok(Json(LayoutResponse::from(layout)))
}

pub async fn delete_layout(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.layouts.delete(&id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn preview_layout(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (_, document) = state.layouts.get_with_document(&id, &actor).await?;
    let html = state.renderer.render_preview(&document, &req.values)?;
    Ok(Html(html))
}

/// Fills the layout directly. Missing values render as empty text.
pub async fn generate_layout(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (layout, document) = state.layouts.get_with_document(&id, &actor).await?;
    let generated = state
        .renderer
        .render(&document, &req.values, req.format, &layout.name)
        .await?;

    tracing::info!(
        layout_id = %layout.id,
        format = req.format.as_str(),
        size = generated.bytes.len(),
        "Layout generated"
    );

    Ok(attachment(generated))
}
