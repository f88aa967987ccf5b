use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{asset, comment, project, version};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::project::{
    CreateProjectRequest, ProjectListQuery, ProjectListResponse, ProjectResponse,
    UpdateProjectRequest, validate_project_name,
};
use crate::state::AppState;
use crate::utils::ownership::{find_owned_project, find_owned_project_for_update};

#[utoipa::path(
    post,
    path = "/",
    tag = "Projects",
    operation_id = "createProject",
    summary = "Create a project",
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_project_name(&payload.name)?;

    let now = chrono::Utc::now();
    let created = project::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description.unwrap_or_default()),
        active: Set(true),
        owner_id: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Projects",
    operation_id = "listProjects",
    summary = "List the caller's projects",
    params(ProjectListQuery),
    responses(
        (status = 200, description = "Project list", body = ProjectListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_projects(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let mut find = project::Entity::find()
        .filter(project::Column::OwnerId.eq(auth_user.user_id))
        .order_by_asc(project::Column::Id);
    if !query.include_inactive.unwrap_or(false) {
        find = find.filter(project::Column::Active.eq(true));
    }

    let projects: Vec<ProjectResponse> = find
        .all(&state.db)
        .await?
        .into_iter()
        .map(ProjectResponse::from)
        .collect();

    let total = projects.len() as u64;
    Ok(Json(ProjectListResponse { projects, total }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Projects",
    operation_id = "getProject",
    summary = "Fetch one project",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project", body = ProjectResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, project_id))]
pub async fn get_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
) -> Result<Json<ProjectResponse>, AppError> {
    let project = find_owned_project(&state.db, auth_user.user_id, project_id).await?;
    Ok(Json(ProjectResponse::from(project)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Projects",
    operation_id = "updateProject",
    summary = "Update project metadata",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Updated project", body = ProjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, project_id))]
pub async fn update_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
    AppJson(payload): AppJson<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    if let Some(ref name) = payload.name {
        validate_project_name(name)?;
    }

    let project = find_owned_project(&state.db, auth_user.user_id, project_id).await?;

    let mut active_model: project::ActiveModel = project.into();
    if let Some(name) = payload.name {
        active_model.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active_model.description = Set(description);
    }
    if let Some(active) = payload.active {
        active_model.active = Set(active);
    }
    active_model.updated_at = Set(chrono::Utc::now());

    let updated = active_model.update(&state.db).await?;
    Ok(Json(ProjectResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Projects",
    operation_id = "deleteProject",
    summary = "Delete a project and all of its assets",
    description = "Removes the project, its assets, their versions and comments. \
        Stored files are left behind for later cleanup.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, project_id))]
pub async fn delete_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_owned_project_for_update(&txn, auth_user.user_id, project_id).await?;

    let asset_ids: Vec<i32> = asset::Entity::find()
        .filter(asset::Column::ProjectId.eq(project_id))
        .select_only()
        .column(asset::Column::Id)
        .into_tuple::<i32>()
        .all(&txn)
        .await?;

    if !asset_ids.is_empty() {
        version::Entity::delete_many()
            .filter(version::Column::AssetId.is_in(asset_ids.clone()))
            .exec(&txn)
            .await?;
        comment::Entity::delete_many()
            .filter(comment::Column::AssetId.is_in(asset_ids))
            .exec(&txn)
            .await?;
        asset::Entity::delete_many()
            .filter(asset::Column::ProjectId.eq(project_id))
            .exec(&txn)
            .await?;
    }

    project::Entity::delete_by_id(project_id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
