use chrono::{DateTime, Utc};
use common::{AssetType, ProcessingStatus};
use serde::{Deserialize, Serialize};

use crate::entity::asset;
use crate::models::version::VersionResponse;

#[derive(Serialize, utoipa::ToSchema)]
pub struct AssetResponse {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub description: String,
    pub asset_type: AssetType,
    pub processing: ProcessingStatus,
    pub ai_data: Option<serde_json::Value>,
    pub render_reference: Option<String>,
    pub thumbnail_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<asset::Model> for AssetResponse {
    fn from(a: asset::Model) -> Self {
        Self {
            id: a.id,
            project_id: a.project_id,
            name: a.name,
            description: a.description,
            asset_type: a.asset_type,
            processing: a.processing,
            ai_data: a.ai_data,
            render_reference: a.render_reference,
            thumbnail_reference: a.thumbnail_reference,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AssetListResponse {
    pub assets: Vec<AssetResponse>,
    pub total: u64,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AssetListQuery {
    /// Restrict the listing to one project.
    pub project: Option<i32>,
}

/// Response for an upload: the asset shell plus the version the upload
/// produced. `asset_created` distinguishes a first upload from a version-up.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadAssetResponse {
    pub asset: AssetResponse,
    pub version: VersionResponse,
    pub asset_created: bool,
}
