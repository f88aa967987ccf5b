use std::sync::Arc;

use chrono::Utc;
use common::storage::FileStore;
use common::{JobKind, PipelineOutcome, PipelineResult, ProcessingStatus};
use mq::{BroccoliError, BrokerMessage, Mq};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QuerySelect, Set, TransactionTrait,
};
use tracing::{error, info};

use crate::entity::{asset, project};

/// Consume pipeline results from the result queue.
pub async fn consume_pipeline_results(
    db: DatabaseConnection,
    store: Arc<dyn FileStore>,
    mq: Arc<Mq>,
    queue_name: String,
) {
    info!(queue = %queue_name, "Starting pipeline result consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // single-threaded for sequential DB writes
            None,
            move |message: BrokerMessage<PipelineResult>| {
                let db = db.clone();
                let store = store.clone();
                async move {
                    let result = message.payload;
                    let asset_id = result.asset_id;
                    let job_id = result.job_id.clone();

                    if let Err(e) = process_pipeline_result(&db, &*store, result).await {
                        error!(
                            asset_id,
                            job_id = %job_id,
                            error = %e,
                            "Failed to process pipeline result"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Pipeline result consumer stopped unexpectedly");
    }
}

/// Apply one pipeline result to its asset.
///
/// A missing asset is not an error: the asset (or its project) was deleted
/// while the job was in flight, so the result is dropped quietly.
pub async fn process_pipeline_result(
    db: &DatabaseConnection,
    store: &dyn FileStore,
    result: PipelineResult,
) -> anyhow::Result<()> {
    let txn = db.begin().await?;

    let Some(asset_model) = asset::Entity::find_by_id(result.asset_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        info!(
            asset_id = result.asset_id,
            job_id = %result.job_id,
            "Asset gone, dropping pipeline result"
        );
        txn.commit().await?;
        return Ok(());
    };

    let mut update: asset::ActiveModel = asset_model.clone().into();

    match result.outcome {
        PipelineOutcome::Completed => {
            if let Some(artifact) = result.artifact {
                let project_name = project::Entity::find_by_id(asset_model.project_id)
                    .one(&txn)
                    .await?
                    .map(|p| p.name)
                    .unwrap_or_else(|| "orphaned".to_string());

                let stored = store
                    .store(
                        asset_model.owner_id,
                        &project_name,
                        &artifact.filename,
                        &artifact.content,
                    )
                    .await?;

                match result.kind {
                    JobKind::Render => update.render_reference = Set(Some(stored.reference)),
                    JobKind::Thumbnail => update.thumbnail_reference = Set(Some(stored.reference)),
                    JobKind::AiEnrich => {}
                }
            }
            if let Some(ai_data) = result.ai_data {
                update.ai_data = Set(Some(ai_data));
            }
            update.processing = Set(ProcessingStatus::Completed);
        }
        PipelineOutcome::Failed { ref message } => {
            error!(
                asset_id = result.asset_id,
                job_id = %result.job_id,
                message,
                "Pipeline job failed"
            );
            update.processing = Set(ProcessingStatus::Error);
        }
    }

    update.updated_at = Set(Utc::now());
    update.update(&txn).await?;
    txn.commit().await?;

    info!(
        asset_id = result.asset_id,
        kind = %result.kind,
        "Processed pipeline result"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::FilesystemFileStore;
    use common::{AssetType, PipelineArtifact, PipelineJob};
    use sea_orm::ConnectOptions;

    async fn test_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
        opt.max_connections(1).sqlx_logging(false);
        let db = sea_orm::Database::connect(opt).await.unwrap();
        db.get_schema_registry("server::entity::*")
            .sync(&db)
            .await
            .unwrap();
        db
    }

    async fn seed_asset(db: &DatabaseConnection) -> asset::Model {
        let now = Utc::now();
        let user = crate::entity::user::ActiveModel {
            username: Set("alice".into()),
            password: Set("hash".into()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
        let project = project::ActiveModel {
            name: Set("film".into()),
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
        asset::ActiveModel {
            project_id: Set(project.id),
            name: Set("hero".into()),
            description: Set(String::new()),
            asset_type: Set(AssetType::Geometry),
            owner_id: Set(user.id),
            processing: Set(ProcessingStatus::Processing),
            ai_data: Set(None),
            render_reference: Set(None),
            thumbnail_reference: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn temp_store() -> (FilesystemFileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemFileStore::new(dir.path().join("media"), 10 * 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn completed_render_stores_artifact_and_marks_asset() {
        let db = test_db().await;
        let (store, _dir) = temp_store().await;
        let asset_model = seed_asset(&db).await;

        let job = PipelineJob::new(JobKind::Render, asset_model.id, 1, "model.obj".into());
        let result = PipelineResult {
            job_id: job.job_id.clone(),
            kind: JobKind::Render,
            asset_id: asset_model.id,
            version_id: 1,
            outcome: PipelineOutcome::Completed,
            artifact: Some(PipelineArtifact {
                filename: format!("render_{}.txt", asset_model.id),
                content: b"rendered".to_vec(),
            }),
            ai_data: None,
        };

        process_pipeline_result(&db, &store, result).await.unwrap();

        let updated = asset::Entity::find_by_id(asset_model.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.processing, ProcessingStatus::Completed);
        let reference = updated.render_reference.unwrap();
        assert_eq!(store.get(&reference).await.unwrap(), b"rendered");
    }

    #[tokio::test]
    async fn ai_result_lands_in_ai_data() {
        let db = test_db().await;
        let (store, _dir) = temp_store().await;
        let asset_model = seed_asset(&db).await;

        let result = PipelineResult {
            job_id: "job".into(),
            kind: JobKind::AiEnrich,
            asset_id: asset_model.id,
            version_id: 1,
            outcome: PipelineOutcome::Completed,
            artifact: None,
            ai_data: Some(serde_json::json!({"confidence": 0.95})),
        };

        process_pipeline_result(&db, &store, result).await.unwrap();

        let updated = asset::Entity::find_by_id(asset_model.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.processing, ProcessingStatus::Completed);
        assert_eq!(
            updated.ai_data.unwrap()["confidence"],
            serde_json::json!(0.95)
        );
    }

    #[tokio::test]
    async fn failure_marks_error() {
        let db = test_db().await;
        let (store, _dir) = temp_store().await;
        let asset_model = seed_asset(&db).await;

        let result = PipelineResult {
            job_id: "job".into(),
            kind: JobKind::Render,
            asset_id: asset_model.id,
            version_id: 1,
            outcome: PipelineOutcome::Failed {
                message: "renderer crashed".into(),
            },
            artifact: None,
            ai_data: None,
        };

        process_pipeline_result(&db, &store, result).await.unwrap();

        let updated = asset::Entity::find_by_id(asset_model.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.processing, ProcessingStatus::Error);
    }

    #[tokio::test]
    async fn missing_asset_is_a_quiet_no_op() {
        let db = test_db().await;
        let (store, _dir) = temp_store().await;

        let result = PipelineResult {
            job_id: "job".into(),
            kind: JobKind::Thumbnail,
            asset_id: 9999,
            version_id: 1,
            outcome: PipelineOutcome::Completed,
            artifact: None,
            ai_data: None,
        };

        assert!(process_pipeline_result(&db, &store, result).await.is_ok());
    }
}
