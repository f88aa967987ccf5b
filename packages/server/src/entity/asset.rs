use common::{AssetType, ProcessingStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named asset inside a project. The asset row itself is mutable
/// metadata; its history lives in the `version` table.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "project_name")]
    pub project_id: i32,
    #[sea_orm(unique_key = "project_name")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub asset_type: AssetType,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    /// Background pipeline state for the most recent upload.
    pub processing: ProcessingStatus,
    #[sea_orm(column_type = "Json", nullable)]
    pub ai_data: Option<Json>,
    /// Storage reference of the latest render output, if any.
    pub render_reference: Option<String>,
    /// Storage reference of the latest generated thumbnail, if any.
    pub thumbnail_reference: Option<String>,

    #[sea_orm(belongs_to, from = "project_id", to = "id")]
    pub project: HasOne<super::project::Entity>,

    #[sea_orm(has_many)]
    pub versions: HasMany<super::version::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
