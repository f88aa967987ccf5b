use chrono::{DateTime, Utc};
use common::VersionStatus;
use serde::Serialize;

use crate::entity::version;

#[derive(Serialize, utoipa::ToSchema)]
pub struct VersionResponse {
    pub id: i32,
    pub asset_id: i32,
    /// Sequential number, starting at 1 per asset.
    pub number: i32,
    pub filename: String,
    pub size: i64,
    pub content_hash: String,
    pub description: String,
    pub status: VersionStatus,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<version::Model> for VersionResponse {
    fn from(v: version::Model) -> Self {
        Self {
            id: v.id,
            asset_id: v.asset_id,
            number: v.number,
            filename: v.filename,
            size: v.size,
            content_hash: v.content_hash,
            description: v.description,
            status: v.status,
            user_id: v.user_id,
            created_at: v.created_at,
        }
    }
}

/// Version history of one asset, newest first.
#[derive(Serialize, utoipa::ToSchema)]
pub struct VersionListResponse {
    pub asset_id: i32,
    pub versions: Vec<VersionResponse>,
    pub total: u64,
}

/// One selectable workflow status.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StatusChoice {
    #[schema(example = "work_in_progress")]
    pub key: &'static str,
    #[schema(example = "work in progress")]
    pub label: &'static str,
}

/// The full status vocabulary, in pipeline order.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StatusListResponse {
    pub choices: Vec<StatusChoice>,
    pub values: Vec<&'static str>,
}
