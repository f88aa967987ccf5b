use sea_orm::sea_query::LockType;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::{asset, project};
use crate::error::AppError;

/// Ownership-scoped lookups. A resource that exists but belongs to another
/// user is reported exactly like one that does not exist, so responses never
/// reveal which ids are taken.
pub async fn find_owned_project<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    project_id: i32,
) -> Result<project::Model, AppError> {
    project::Entity::find_by_id(project_id)
        .filter(project::Column::OwnerId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

/// Same as [`find_owned_project`] but takes a `FOR UPDATE` row lock. Call
/// inside a transaction.
pub async fn find_owned_project_for_update<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    project_id: i32,
) -> Result<project::Model, AppError> {
    project::Entity::find_by_id(project_id)
        .filter(project::Column::OwnerId.eq(user_id))
        .lock(LockType::Update)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

pub async fn find_owned_asset<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    asset_id: i32,
) -> Result<asset::Model, AppError> {
    asset::Entity::find_by_id(asset_id)
        .filter(asset::Column::OwnerId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".into()))
}

/// Same as [`find_owned_asset`] but takes a `FOR UPDATE` row lock. Call
/// inside a transaction.
pub async fn find_owned_asset_for_update<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    asset_id: i32,
) -> Result<asset::Model, AppError> {
    asset::Entity::find_by_id(asset_id)
        .filter(asset::Column::OwnerId.eq(user_id))
        .lock(LockType::Update)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".into()))
}
