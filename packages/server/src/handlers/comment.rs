use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::instrument;

use crate::entity::comment;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::comment::{
    CommentListResponse, CommentResponse, CreateCommentRequest, validate_comment,
};
use crate::state::AppState;
use crate::utils::ownership::find_owned_asset;

#[utoipa::path(
    get,
    path = "/{id}/comments",
    tag = "Comments",
    operation_id = "listComments",
    summary = "List comments on an asset, oldest first",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Comment list", body = CommentListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, asset_id))]
pub async fn list_comments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(asset_id): Path<i32>,
) -> Result<Json<CommentListResponse>, AppError> {
    let asset = find_owned_asset(&state.db, auth_user.user_id, asset_id).await?;

    let comments: Vec<CommentResponse> = comment::Entity::find()
        .filter(comment::Column::AssetId.eq(asset.id))
        .order_by_asc(comment::Column::CreatedAt)
        .all(&state.db)
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();

    let total = comments.len() as u64;
    Ok(Json(CommentListResponse { comments, total }))
}

#[utoipa::path(
    post,
    path = "/{id}/comments",
    tag = "Comments",
    operation_id = "addComment",
    summary = "Comment on an asset",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, asset_id))]
pub async fn add_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(asset_id): Path<i32>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_comment(&payload)?;

    let asset = find_owned_asset(&state.db, auth_user.user_id, asset_id).await?;

    let created = comment::ActiveModel {
        asset_id: Set(asset.id),
        user_id: Set(auth_user.user_id),
        content: Set(payload.content),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(created))))
}
