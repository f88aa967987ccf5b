use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use common::AssetType;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::dispatch;
use crate::entity::asset;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::ledger::{self, AssetDefaults, NewVersion};
use crate::models::asset::{AssetListQuery, AssetListResponse, AssetResponse, UploadAssetResponse};
use crate::models::version::VersionResponse;
use crate::state::AppState;
use crate::utils::ownership::{find_owned_asset, find_owned_project};

pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(256 * 1024 * 1024) // 256 MB
}

/// Fields collected from an upload form. Everything is validated before a
/// single byte reaches storage.
pub(crate) struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

pub(crate) async fn read_file_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<UploadedFile, AppError> {
    let filename = field
        .file_name()
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        .to_vec();
    Ok(UploadedFile { filename, data })
}

pub(crate) async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))
}

pub(crate) fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Assets",
    operation_id = "uploadAsset",
    summary = "Upload a file to a named asset",
    description = "Creates the asset on first upload, otherwise appends a new version to the \
        existing asset of that name. Multipart fields: `project` (id, required), `name` \
        (required), `file` (required), `description` and `asset_type` (optional). The upload \
        returns as soon as the version is committed; pipeline jobs run in the background.",
    request_body(content_type = "multipart/form-data", description = "Asset upload form"),
    responses(
        (status = 201, description = "Version recorded", body = UploadAssetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Allocation conflict (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_asset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut project_id: Option<i32> = None;
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;
    let mut asset_type: Option<AssetType> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("project") => {
                let text = read_text_field(field, "project").await?;
                project_id = Some(text.trim().parse().map_err(|_| {
                    AppError::Validation("'project' must be a numeric project id".into())
                })?);
            }
            Some("name") => name = Some(read_text_field(field, "name").await?),
            Some("description") => description = Some(read_text_field(field, "description").await?),
            Some("asset_type") => {
                let text = read_text_field(field, "asset_type").await?;
                asset_type = Some(
                    text.trim()
                        .parse()
                        .map_err(|e| AppError::Validation(format!("{e}")))?,
                );
            }
            Some("file") => file = Some(read_file_field(field).await?),
            _ => {} // Ignore unknown fields.
        }
    }

    let project_id =
        project_id.ok_or_else(|| AppError::Validation("Missing 'project' field".into()))?;
    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("Missing 'name' field".into()))?;
    if name.chars().count() > 128 {
        return Err(AppError::Validation(
            "Asset name must be 1-128 characters".into(),
        ));
    }
    let file = file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let project = find_owned_project(&state.db, auth_user.user_id, project_id).await?;

    let (asset, asset_created) = ledger::get_or_create_asset(
        &state.db,
        auth_user.user_id,
        project.id,
        &name,
        AssetDefaults {
            description: description.clone(),
            asset_type,
        },
    )
    .await?;

    let stored = state
        .store
        .store(auth_user.user_id, &project.name, &file.filename, &file.data)
        .await?;

    let version = match ledger::allocate_version(
        &state.db,
        auth_user.user_id,
        asset.id,
        NewVersion {
            file_reference: stored.reference.clone(),
            filename: file.filename,
            content_hash: content_hash(&file.data),
            size: stored.size,
            description,
            status: None,
        },
    )
    .await
    {
        Ok(v) => v,
        Err(e) => {
            // The file never made it into the ledger; drop it again.
            let _ = state.store.delete(&stored.reference).await;
            return Err(e);
        }
    };

    dispatch::enqueue_pipeline_job(&state, &asset, &version).await;

    let asset = find_owned_asset(&state.db, auth_user.user_id, asset.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadAssetResponse {
            asset: AssetResponse::from(asset),
            version: VersionResponse::from(version),
            asset_created,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Assets",
    operation_id = "listAssets",
    summary = "List the caller's assets",
    params(AssetListQuery),
    responses(
        (status = 200, description = "Asset list", body = AssetListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_assets(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AssetListQuery>,
) -> Result<Json<AssetListResponse>, AppError> {
    let mut find = asset::Entity::find()
        .filter(asset::Column::OwnerId.eq(auth_user.user_id))
        .order_by_asc(asset::Column::Id);

    if let Some(project_id) = query.project {
        // Reject foreign project ids the same way as missing ones.
        find_owned_project(&state.db, auth_user.user_id, project_id).await?;
        find = find.filter(asset::Column::ProjectId.eq(project_id));
    }

    let assets: Vec<AssetResponse> = find
        .all(&state.db)
        .await?
        .into_iter()
        .map(AssetResponse::from)
        .collect();

    let total = assets.len() as u64;
    Ok(Json(AssetListResponse { assets, total }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Assets",
    operation_id = "getAsset",
    summary = "Fetch one asset",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset", body = AssetResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, asset_id))]
pub async fn get_asset(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(asset_id): Path<i32>,
) -> Result<Json<AssetResponse>, AppError> {
    let asset = find_owned_asset(&state.db, auth_user.user_id, asset_id).await?;
    Ok(Json(AssetResponse::from(asset)))
}
