use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use std::sync::Arc;

use crate::{
    core::{inference::query_distances, ranker::rank, registry::ModelInfo},
    error::{AppError, Result},
    utils::{is_image_file, validate_file_extension},
    AppState,
};

use super::responses::{
    ApiResponse, HealthResponse, RankDistancesRequest, RankParams, RankResponse,
};

/// Reads the `file` field of a multipart upload.
async fn read_upload(state: &AppState, multipart: &mut Multipart) -> Result<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .ok_or_else(|| AppError::UploadError("No filename provided".to_string()))?
            .to_string();

        if !validate_file_extension(&file_name, &state.config.allowed_extensions)
            || !is_image_file(&file_name)
        {
            return Err(AppError::UploadError(format!(
                "Unsupported file type: {}",
                file_name
            )));
        }

        let content = field.bytes().await?;
        if content.is_empty() {
            return Err(AppError::UploadError("Uploaded file is empty".to_string()));
        }
        return Ok((file_name, content));
    }

    Err(AppError::UploadError("No file provided".to_string()))
}

/// Ranks the reference set against an uploaded image
pub(crate) async fn rank_image(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RankParams>,
    mut multipart: Multipart,
) -> Result<ApiResponse<RankResponse>> {
    let k = params.k.unwrap_or(state.config.default_k);
    let (file_name, content) = read_upload(&state, &mut multipart).await?;
    log::debug!("Ranking upload {} ({} bytes)", file_name, content.len());

    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&content)).await??;

    let loaded = state.registry.current()?;
    let distances = query_distances(Arc::clone(&loaded.model), image).await?;
    let ranking = rank(&distances, k);
    log::info!("{}", ranking.listing());

    Ok(ApiResponse::success(RankResponse::new(
        &ranking,
        k,
        Some(loaded.info.version.clone()),
        |i| loaded.model.label(i),
    )))
}

/// Ranks a caller-supplied distance vector
pub(crate) async fn rank_distances(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RankDistancesRequest>,
) -> Result<ApiResponse<RankResponse>> {
    request.distances.validate()?;
    let k = request.k.unwrap_or(state.config.default_k);
    let ranking = rank(&request.distances, k);

    Ok(ApiResponse::success(RankResponse::new(
        &ranking,
        k,
        None,
        |_| None,
    )))
}

/// Describes the active model
pub(crate) async fn model_info(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<ModelInfo>> {
    let loaded = state.registry.current()?;
    Ok(ApiResponse::success(loaded.info.clone()))
}

/// Reloads the model asset from disk
pub(crate) async fn reload_model(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<ModelInfo>> {
    let info = tokio::task::spawn_blocking(move || state.registry.reload()).await??;
    Ok(ApiResponse::success(info))
}

/// Health check endpoint
pub(crate) async fn health_check(
    State(state): State<Arc<AppState>>,
) -> ApiResponse<HealthResponse> {
    ApiResponse::success(HealthResponse {
        status: "ok",
        version: crate::built_info::PKG_VERSION,
        model_version: state.registry.current_version(),
    })
}
