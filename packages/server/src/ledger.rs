//! Asset registry and version ledger.
//!
//! All writes that touch version numbers go through here. The allocation
//! protocol is: open a transaction, lock the asset row, read the current
//! maximum number, insert max + 1. The composite unique key on
//! `(asset_id, number)` backstops the lock; when a racing insert still
//! slips through, the loser retries with a fresh transaction.

use chrono::Utc;
use common::{AssetType, VersionStatus};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use crate::entity::{asset, version};
use crate::error::AppError;
use crate::utils::ownership::find_owned_project_for_update;

/// Description recorded when the uploader does not provide one.
pub const DEFAULT_VERSION_DESCRIPTION: &str = "uploaded by the user";

/// How many fresh transactions to attempt when version inserts keep losing
/// the unique-key race.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// Optional metadata accompanying an upload. Fields left `None` keep the
/// existing values when the asset already exists.
#[derive(Debug, Default)]
pub struct AssetDefaults {
    pub description: Option<String>,
    pub asset_type: Option<AssetType>,
}

/// Everything needed to append one version to an asset's history.
#[derive(Debug)]
pub struct NewVersion {
    pub file_reference: String,
    pub filename: String,
    pub content_hash: String,
    pub size: i64,
    pub description: Option<String>,
    pub status: Option<VersionStatus>,
}

/// Find an asset by name inside a project, creating it on first upload.
///
/// The project row is locked first so two first uploads of the same name
/// serialize; the `(project_id, name)` unique key catches anything that
/// still races, in which case the existing row is fetched and reused.
/// Returns the asset and whether this call created it.
pub async fn get_or_create_asset(
    db: &DatabaseConnection,
    user_id: i32,
    project_id: i32,
    name: &str,
    defaults: AssetDefaults,
) -> Result<(asset::Model, bool), AppError> {
    let txn = db.begin().await?;
    find_owned_project_for_update(&txn, user_id, project_id).await?;

    if let Some(existing) = asset::Entity::find()
        .filter(asset::Column::ProjectId.eq(project_id))
        .filter(asset::Column::Name.eq(name))
        .one(&txn)
        .await?
    {
        let mut active: asset::ActiveModel = existing.into();
        // Only non-empty input overwrites; absent input never blanks a field.
        if let Some(description) = defaults.description
            && !description.trim().is_empty()
        {
            active.description = Set(description);
        }
        if let Some(asset_type) = defaults.asset_type {
            active.asset_type = Set(asset_type);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        return Ok((updated, false));
    }

    let now = Utc::now();
    let new_asset = asset::ActiveModel {
        project_id: Set(project_id),
        name: Set(name.to_string()),
        description: Set(defaults.description.unwrap_or_default()),
        asset_type: Set(defaults.asset_type.unwrap_or_default()),
        owner_id: Set(user_id),
        processing: Set(Default::default()),
        ai_data: Set(None),
        render_reference: Set(None),
        thumbnail_reference: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_asset.insert(&txn).await {
        Ok(created) => {
            txn.commit().await?;
            Ok((created, true))
        }
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                tracing::debug!(project_id, name, "asset creation race, reusing existing row");
                let _ = txn.rollback().await;
                let existing = asset::Entity::find()
                    .filter(asset::Column::ProjectId.eq(project_id))
                    .filter(asset::Column::Name.eq(name))
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal("asset missing after duplicate insert".into())
                    })?;
                Ok((existing, false))
            }
            _ => Err(e.into()),
        },
    }
}

/// Append a version to an asset, allocating the next sequential number.
///
/// The asset lookup is ownership-scoped, so callers cannot append to a
/// foreign asset. Fails with `Conflict` only after every attempt loses the
/// unique-key race, which under the row lock should not happen in practice.
pub async fn allocate_version(
    db: &DatabaseConnection,
    user_id: i32,
    asset_id: i32,
    new: NewVersion,
) -> Result<version::Model, AppError> {
    let description = match new.description {
        Some(d) if !d.trim().is_empty() => d,
        _ => DEFAULT_VERSION_DESCRIPTION.to_string(),
    };
    let status = new.status.unwrap_or_else(VersionStatus::initial);

    for attempt in 0..MAX_ALLOCATION_ATTEMPTS {
        let txn = db.begin().await?;

        asset::Entity::find_by_id(asset_id)
            .filter(asset::Column::OwnerId.eq(user_id))
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Asset not found".into()))?;

        let number = next_version_number(&txn, asset_id).await?;

        let model = version::ActiveModel {
            asset_id: Set(asset_id),
            number: Set(number),
            file_reference: Set(new.file_reference.clone()),
            filename: Set(new.filename.clone()),
            content_hash: Set(new.content_hash.clone()),
            size: Set(new.size),
            description: Set(description.clone()),
            status: Set(status),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match model.insert(&txn).await {
            Ok(created) => {
                txn.commit().await?;
                return Ok(created);
            }
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    tracing::debug!(asset_id, number, attempt, "version number race, retrying");
                    let _ = txn.rollback().await;
                }
                _ => return Err(e.into()),
            },
        }
    }

    Err(AppError::Conflict(
        "Version allocation kept conflicting under concurrent uploads".into(),
    ))
}

/// Highest allocated number plus one; 1 for an asset with no versions.
async fn next_version_number<C: ConnectionTrait>(db: &C, asset_id: i32) -> Result<i32, AppError> {
    let max_number: Option<i32> = version::Entity::find()
        .filter(version::Column::AssetId.eq(asset_id))
        .select_only()
        .column_as(version::Column::Number.max(), "max_number")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    max_number
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| AppError::Conflict("Version number overflow".into()))
}

/// All versions of an asset, newest first.
pub async fn list_versions<C: ConnectionTrait>(
    db: &C,
    asset_id: i32,
) -> Result<Vec<version::Model>, AppError> {
    Ok(version::Entity::find()
        .filter(version::Column::AssetId.eq(asset_id))
        .order_by_desc(version::Column::Number)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{project, user};
    use sea_orm::{ConnectOptions, Database, PaginatorTrait};

    // In-memory SQLite with a single connection, so every task sees the
    // same database and statements serialize.
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

    async fn seed_user(db: &DatabaseConnection, username: &str) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            password: Set("hash".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn seed_project(db: &DatabaseConnection, owner_id: i32, name: &str) -> project::Model {
        let now = Utc::now();
        project::ActiveModel {
            name: Set(name.to_string()),
            description: Set(String::new()),
            active: Set(true),
            owner_id: Set(owner_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    fn version_payload(reference: &str) -> NewVersion {
        NewVersion {
            file_reference: reference.to_string(),
            filename: "model.obj".to_string(),
            content_hash: "abc123".to_string(),
            size: 42,
            description: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn first_upload_creates_asset_with_version_one() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let project = seed_project(&db, user.id, "film").await;

        let (asset, created) = get_or_create_asset(
            &db,
            user.id,
            project.id,
            "hero",
            AssetDefaults {
                description: Some("main character".into()),
                asset_type: Some(AssetType::Geometry),
            },
        )
        .await
        .unwrap();
        assert!(created);
        assert_eq!(asset.asset_type, AssetType::Geometry);

        let version = allocate_version(&db, user.id, asset.id, version_payload("ref/1"))
            .await
            .unwrap();
        assert_eq!(version.number, 1);
        assert_eq!(version.status, VersionStatus::Placeholder);
        assert_eq!(version.description, DEFAULT_VERSION_DESCRIPTION);
    }

    #[tokio::test]
    async fn repeat_upload_reuses_asset_and_increments() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let project = seed_project(&db, user.id, "film").await;

        let (asset, _) =
            get_or_create_asset(&db, user.id, project.id, "hero", AssetDefaults::default())
                .await
                .unwrap();
        allocate_version(&db, user.id, asset.id, version_payload("ref/1"))
            .await
            .unwrap();

        let (again, created) =
            get_or_create_asset(&db, user.id, project.id, "hero", AssetDefaults::default())
                .await
                .unwrap();
        assert!(!created);
        assert_eq!(again.id, asset.id);
        assert_eq!(asset::Entity::find().count(&db).await.unwrap(), 1);

        let v2 = allocate_version(&db, user.id, asset.id, version_payload("ref/2"))
            .await
            .unwrap();
        assert_eq!(v2.number, 2);
    }

    #[tokio::test]
    async fn metadata_updates_are_partial() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let project = seed_project(&db, user.id, "film").await;

        get_or_create_asset(
            &db,
            user.id,
            project.id,
            "hero",
            AssetDefaults {
                description: Some("original".into()),
                asset_type: Some(AssetType::Image),
            },
        )
        .await
        .unwrap();

        // Absent fields keep their values, present fields overwrite.
        let (asset, _) = get_or_create_asset(
            &db,
            user.id,
            project.id,
            "hero",
            AssetDefaults {
                description: None,
                asset_type: Some(AssetType::Video),
            },
        )
        .await
        .unwrap();
        assert_eq!(asset.description, "original");
        assert_eq!(asset.asset_type, AssetType::Video);

        // An empty description does not blank the stored one.
        let (asset, _) = get_or_create_asset(
            &db,
            user.id,
            project.id,
            "hero",
            AssetDefaults {
                description: Some("   ".into()),
                asset_type: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(asset.description, "original");
    }

    #[tokio::test]
    async fn versions_list_newest_first() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let project = seed_project(&db, user.id, "film").await;
        let (asset, _) =
            get_or_create_asset(&db, user.id, project.id, "hero", AssetDefaults::default())
                .await
                .unwrap();

        for i in 1..=4 {
            allocate_version(&db, user.id, asset.id, version_payload(&format!("ref/{i}")))
                .await
                .unwrap();
        }

        let versions = list_versions(&db, asset.id).await.unwrap();
        let numbers: Vec<i32> = versions.iter().map(|v| v.number).collect();
        assert_eq!(numbers, vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn concurrent_allocations_get_distinct_numbers() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let project = seed_project(&db, user.id, "film").await;
        let (asset, _) =
            get_or_create_asset(&db, user.id, project.id, "hero", AssetDefaults::default())
                .await
                .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            let asset_id = asset.id;
            let user_id = user.id;
            handles.push(tokio::spawn(async move {
                allocate_version(&db, user_id, asset_id, version_payload(&format!("ref/{i}")))
                    .await
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().number);
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=8).collect::<Vec<i32>>());
    }

    #[tokio::test]
    async fn foreign_asset_reported_as_missing() {
        let db = test_db().await;
        let alice = seed_user(&db, "alice").await;
        let mallory = seed_user(&db, "mallory").await;
        let project = seed_project(&db, alice.id, "film").await;
        let (asset, _) =
            get_or_create_asset(&db, alice.id, project.id, "hero", AssetDefaults::default())
                .await
                .unwrap();

        let err = allocate_version(&db, mallory.id, asset.id, version_payload("ref/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = get_or_create_asset(&db, mallory.id, project.id, "other", AssetDefaults::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn provided_description_and_status_kept() {
        let db = test_db().await;
        let user = seed_user(&db, "alice").await;
        let project = seed_project(&db, user.id, "film").await;
        let (asset, _) =
            get_or_create_asset(&db, user.id, project.id, "hero", AssetDefaults::default())
                .await
                .unwrap();

        let version = allocate_version(
            &db,
            user.id,
            asset.id,
            NewVersion {
                description: Some("lighting pass".into()),
                status: Some(VersionStatus::ReadyForReview),
                ..version_payload("ref/1")
            },
        )
        .await
        .unwrap();
        assert_eq!(version.description, "lighting pass");
        assert_eq!(version.status, VersionStatus::ReadyForReview);
    }
}
