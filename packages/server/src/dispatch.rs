//! Fire-and-forget dispatch of background pipeline jobs after an upload.
//!
//! A dispatch failure never fails the upload; the version is already
//! committed and the asset simply stays in its previous processing state.

use common::{AssetType, JobKind, PipelineJob};
use sea_orm::{ActiveModelTrait, ActiveValue::Set};

use crate::entity::{asset, version};
use crate::state::AppState;

/// Which pipeline job an upload of this kind of asset triggers.
pub fn job_kind_for(asset_type: AssetType) -> JobKind {
    match asset_type {
        AssetType::Geometry => JobKind::Render,
        AssetType::Image => JobKind::Thumbnail,
        AssetType::Video | AssetType::Document => JobKind::AiEnrich,
    }
}

pub async fn enqueue_pipeline_job(state: &AppState, asset: &asset::Model, version: &version::Model) {
    let Some(ref mq) = state.mq else {
        tracing::debug!(asset_id = asset.id, "queue disabled, skipping job dispatch");
        return;
    };

    let job = PipelineJob::new(
        job_kind_for(asset.asset_type),
        asset.id,
        version.id,
        version.filename.clone(),
    );

    match mq
        .publish(&state.config.mq.job_queue, None, &job, None)
        .await
    {
        Ok(_) => {
            tracing::info!(
                asset_id = asset.id,
                version = version.number,
                kind = %job.kind,
                "pipeline job enqueued"
            );
            // Best effort; a stale processing state is corrected by the
            // next result message.
            let mut active: asset::ActiveModel = asset.clone().into();
            active.processing = Set(common::ProcessingStatus::Processing);
            active.updated_at = Set(chrono::Utc::now());
            if let Err(e) = active.update(&state.db).await {
                tracing::warn!(asset_id = asset.id, "failed to mark asset processing: {e}");
            }
        }
        Err(e) => {
            tracing::warn!(asset_id = asset.id, "failed to enqueue pipeline job: {e}");
        }
    }
}
