use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::VersionStatus;
use common::storage::FileStore;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::dispatch;
use crate::entity::{project, version};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::asset::{UploadedFile, content_hash, read_file_field, read_text_field};
use crate::ledger::{self, NewVersion};
use crate::models::version::{
    StatusChoice, StatusListResponse, VersionListResponse, VersionResponse,
};
use crate::state::AppState;
use crate::utils::ownership::find_owned_asset;

#[utoipa::path(
    get,
    path = "/{id}/versions",
    tag = "Versions",
    operation_id = "listVersions",
    summary = "List an asset's versions, newest first",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Version history", body = VersionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, asset_id))]
pub async fn list_versions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(asset_id): Path<i32>,
) -> Result<Json<VersionListResponse>, AppError> {
    let asset = find_owned_asset(&state.db, auth_user.user_id, asset_id).await?;

    let versions: Vec<VersionResponse> = ledger::list_versions(&state.db, asset.id)
        .await?
        .into_iter()
        .map(VersionResponse::from)
        .collect();

    let total = versions.len() as u64;
    Ok(Json(VersionListResponse {
        asset_id: asset.id,
        versions,
        total,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/versions",
    tag = "Versions",
    operation_id = "createVersion",
    summary = "Version-up an existing asset",
    description = "Appends a new version. Multipart fields: `file` (required), `status` \
        (required, one of the workflow statuses), `description` (optional, defaults to a \
        standard note). The upload returns once the version is committed.",
    params(("id" = i32, Path, description = "Asset ID")),
    request_body(content_type = "multipart/form-data", description = "Version upload form"),
    responses(
        (status = 201, description = "Version recorded", body = VersionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Asset not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Allocation conflict (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id, asset_id))]
pub async fn create_version(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(asset_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<UploadedFile> = None;
    let mut status: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => file = Some(read_file_field(field).await?),
            Some("status") => status = Some(read_text_field(field, "status").await?),
            Some("description") => description = Some(read_text_field(field, "description").await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let status = status.ok_or_else(|| AppError::Validation("Missing 'status' field".into()))?;

    let asset = find_owned_asset(&state.db, auth_user.user_id, asset_id).await?;
    let project = project::Entity::find_by_id(asset.project_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("asset has no project".into()))?;

    let version = store_new_version(
        &state.db,
        state.store.as_ref(),
        auth_user.user_id,
        asset.id,
        &project.name,
        file,
        &status,
        description,
    )
    .await?;

    dispatch::enqueue_pipeline_job(&state, &asset, &version).await;

    Ok((StatusCode::CREATED, Json(VersionResponse::from(version))))
}

/// Validate the declared status, persist the payload, then record the
/// version. The status is parsed before any byte reaches storage, so a
/// rejected upload leaves neither a file nor a row behind; a version insert
/// that fails after the write removes the stored file again.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn store_new_version(
    db: &DatabaseConnection,
    store: &dyn FileStore,
    user_id: i32,
    asset_id: i32,
    project_name: &str,
    file: UploadedFile,
    status_raw: &str,
    description: Option<String>,
) -> Result<version::Model, AppError> {
    let status: VersionStatus = status_raw
        .trim()
        .parse()
        .map_err(|e| AppError::Validation(format!("{e}")))?;

    let stored = store
        .store(user_id, project_name, &file.filename, &file.data)
        .await?;

    match ledger::allocate_version(
        db,
        user_id,
        asset_id,
        NewVersion {
            file_reference: stored.reference.clone(),
            filename: file.filename,
            content_hash: content_hash(&file.data),
            size: stored.size,
            description,
            status: Some(status),
        },
    )
    .await
    {
        Ok(version) => Ok(version),
        Err(e) => {
            let _ = store.delete(&stored.reference).await;
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/{id}/versions/{number}/download",
    tag = "Versions",
    operation_id = "downloadVersion",
    summary = "Download the file of one version",
    description = "Streams the stored file. Supports ETag caching via If-None-Match; the ETag \
        is the SHA-256 of the content.",
    params(
        ("id" = i32, Path, description = "Asset ID"),
        ("number" = i32, Path, description = "Version number"),
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Asset or version not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, headers), fields(user_id = auth_user.user_id, asset_id, number))]
pub async fn download_version(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((asset_id, number)): Path<(i32, i32)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let asset = find_owned_asset(&state.db, auth_user.user_id, asset_id).await?;

    let version = version::Entity::find()
        .filter(version::Column::AssetId.eq(asset.id))
        .filter(version::Column::Number.eq(number))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Version not found".into()))?;

    let etag_value = format!("\"{}\"", version.content_hash);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && if_none_match_hits(val, &etag_value)
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = state.store.open(&version.file_reference).await?;
    let stream = ReaderStream::new(reader);
    let body = Body::from_stream(stream);

    let content_type = mime_guess::from_path(&version.filename)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, version.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&version.filename),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

#[utoipa::path(
    get,
    path = "/statuses",
    tag = "Versions",
    operation_id = "listStatuses",
    summary = "List the workflow status vocabulary",
    responses(
        (status = 200, description = "Status choices", body = StatusListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user))]
pub async fn list_statuses(_auth_user: AuthUser) -> Json<StatusListResponse> {
    Json(StatusListResponse {
        choices: VersionStatus::ALL
            .iter()
            .map(|s| StatusChoice {
                key: s.as_str(),
                label: s.label(),
            })
            .collect(),
        values: VersionStatus::ALL.iter().map(|s| s.as_str()).collect(),
    })
}

/// Check an `If-None-Match` header against the version's entity tag.
///
/// The header may carry a comma-separated list of tags or `*`. Weak tags
/// compare equal to their strong form; the tag is a content hash, so weak
/// and strong comparison coincide.
fn if_none_match_hits(header_value: &str, etag: &str) -> bool {
    header_value
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag)
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::user;
    use crate::ledger::AssetDefaults;
    use chrono::Utc;
    use common::storage::FilesystemFileStore;
    use sea_orm::{
        ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, PaginatorTrait, Set,
    };

    async fn test_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        db.get_schema_registry("server::entity::*")
            .sync(&db)
            .await
            .unwrap();
        db
    }

    // One user, one project, one empty asset. Returns (user_id, project
    // name, asset_id).
    async fn seed_asset(db: &DatabaseConnection) -> (i32, String, i32) {
        let user = user::ActiveModel {
            username: Set("alice".to_string()),
            password: Set("hash".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let now = Utc::now();
        let proj = project::ActiveModel {
            name: Set("film".to_string()),
            description: Set(String::new()),
            active: Set(true),
            owner_id: Set(user.id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let (asset, _) =
            ledger::get_or_create_asset(db, user.id, proj.id, "hero", AssetDefaults::default())
                .await
                .unwrap();
        (user.id, proj.name, asset.id)
    }

    fn upload() -> UploadedFile {
        UploadedFile {
            filename: "model.obj".to_string(),
            data: b"obj bytes".to_vec(),
        }
    }

    #[tokio::test]
    async fn unknown_status_leaves_no_row_and_no_file() {
        let db = test_db().await;
        let (user_id, project_name, asset_id) = seed_asset(&db).await;
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemFileStore::new(dir.path().to_path_buf(), 16 * 1024)
            .await
            .unwrap();

        let err = store_new_version(
            &db,
            &store,
            user_id,
            asset_id,
            &project_name,
            upload(),
            "not_a_real_status",
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(version::Entity::find().count(&db).await.unwrap(), 0);
        let mut entries = std::fs::read_dir(dir.path().join("user_data")).unwrap();
        assert!(entries.next().is_none());
    }

    #[tokio::test]
    async fn accepted_status_stores_file_then_row() {
        let db = test_db().await;
        let (user_id, project_name, asset_id) = seed_asset(&db).await;
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemFileStore::new(dir.path().to_path_buf(), 16 * 1024)
            .await
            .unwrap();

        let version = store_new_version(
            &db,
            &store,
            user_id,
            asset_id,
            &project_name,
            upload(),
            VersionStatus::ReadyForReview.as_str(),
            Some("lighting pass".into()),
        )
        .await
        .unwrap();

        assert_eq!(version.number, 1);
        assert_eq!(version.status, VersionStatus::ReadyForReview);
        assert_eq!(version.description, "lighting pass");
        assert!(store.exists(&version.file_reference).await.unwrap());
    }

    #[test]
    fn if_none_match_accepts_lists_and_weak_tags() {
        assert!(if_none_match_hits("\"abc\"", "\"abc\""));
        assert!(if_none_match_hits("\"x\", \"abc\"", "\"abc\""));
        assert!(if_none_match_hits("W/\"abc\"", "\"abc\""));
        assert!(if_none_match_hits("*", "\"abc\""));
        assert!(!if_none_match_hits("\"x\", \"y\"", "\"abc\""));
    }

    #[test]
    fn content_disposition_sanitizes() {
        let value = content_disposition_value("weird \"name\";.png");
        assert!(value.starts_with("attachment; filename=\"weirdname.png\""));

        let value = content_disposition_value("\"\"");
        assert!(value.contains("filename=\"download\""));
    }
}
