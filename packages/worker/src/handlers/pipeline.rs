//! Simulated pipeline stages.
//!
//! Stand-ins for real render, thumbnail, and AI backends: each stage sleeps
//! for a configured duration and produces a deterministic artifact, so the
//! end-to-end dispatch and result plumbing can be exercised without any of
//! the heavy tooling installed.

use std::time::Duration;

use common::{JobKind, PipelineArtifact, PipelineJob, PipelineOutcome, PipelineResult};
use tracing::info;

use crate::config::WorkerConfig;

/// Run one job to completion, including the simulated work delay.
pub async fn process_job(config: &WorkerConfig, job: PipelineJob) -> PipelineResult {
    let delay_ms = match job.kind {
        JobKind::Render => config.render_delay_ms,
        JobKind::Thumbnail => config.thumbnail_delay_ms,
        JobKind::AiEnrich => config.ai_delay_ms,
    };

    info!(
        job_id = %job.job_id,
        kind = %job.kind,
        asset_id = job.asset_id,
        delay_ms,
        "Processing pipeline job"
    );
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    simulate(&job)
}

/// Build the result for a job. Deterministic and instant; the delay lives in
/// [`process_job`].
pub fn simulate(job: &PipelineJob) -> PipelineResult {
    let (artifact, ai_data) = match job.kind {
        JobKind::Render => (
            Some(PipelineArtifact {
                filename: format!("render_{}.txt", job.asset_id),
                content: b"This is the rendered file content.".to_vec(),
            }),
            None,
        ),
        JobKind::Thumbnail => (
            Some(PipelineArtifact {
                filename: format!("thumb_{}.png", job.asset_id),
                content: b"thumbnail image data".to_vec(),
            }),
            None,
        ),
        JobKind::AiEnrich => (
            None,
            Some(serde_json::json!({
                "analysis": "This asset has been classified successfully.",
                "source_file": job.filename,
                "confidence": 0.95,
            })),
        ),
    };

    PipelineResult {
        job_id: job.job_id.clone(),
        kind: job.kind,
        asset_id: job.asset_id,
        version_id: job.version_id,
        outcome: PipelineOutcome::Completed,
        artifact,
        ai_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_produces_named_artifact() {
        let job = PipelineJob::new(JobKind::Render, 7, 2, "model.obj".into());
        let result = simulate(&job);
        assert!(matches!(result.outcome, PipelineOutcome::Completed));
        let artifact = result.artifact.unwrap();
        assert_eq!(artifact.filename, "render_7.txt");
        assert!(!artifact.content.is_empty());
        assert!(result.ai_data.is_none());
    }

    #[test]
    fn thumbnail_produces_png_name() {
        let job = PipelineJob::new(JobKind::Thumbnail, 3, 1, "photo.jpg".into());
        let result = simulate(&job);
        assert_eq!(result.artifact.unwrap().filename, "thumb_3.png");
    }

    #[test]
    fn ai_enrich_produces_data_not_artifact() {
        let job = PipelineJob::new(JobKind::AiEnrich, 5, 9, "report.pdf".into());
        let result = simulate(&job);
        assert!(result.artifact.is_none());
        let data = result.ai_data.unwrap();
        assert_eq!(data["confidence"], serde_json::json!(0.95));
        assert_eq!(data["source_file"], serde_json::json!("report.pdf"));
    }

    #[test]
    fn result_echoes_job_identity() {
        let job = PipelineJob::new(JobKind::Render, 1, 4, "a.obj".into());
        let result = simulate(&job);
        assert_eq!(result.job_id, job.job_id);
        assert_eq!(result.asset_id, 1);
        assert_eq!(result.version_id, 4);
    }
}
