use common::VersionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An immutable snapshot of an asset. Numbers start at 1 per asset and
/// never repeat; the composite unique key is the last line of defense
/// when two uploads race past the row lock.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "version")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "asset_number")]
    pub asset_id: i32,
    #[sea_orm(unique_key = "asset_number")]
    pub number: i32,

    pub file_reference: String,
    pub filename: String,
    /// SHA-256 of the stored file, used as the download ETag.
    pub content_hash: String,
    pub size: i64,

    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: VersionStatus,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(belongs_to, from = "asset_id", to = "id")]
    pub asset: HasOne<super::asset::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
