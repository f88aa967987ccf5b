use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of background pipeline job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Full render of a geometry asset.
    Render,
    /// Preview image generation.
    Thumbnail,
    /// AI analysis / classification.
    AiEnrich,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Thumbnail => "thumbnail",
            Self::AiEnrich => "ai_enrich",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline job message sent to the worker queue.
///
/// Fire-and-forget: the request path that publishes this never awaits the
/// outcome. If the referenced asset no longer exists by the time the job or
/// its result is processed, the job is dropped quietly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineJob {
    /// Job identifier (UUID).
    pub job_id: String,
    pub kind: JobKind,
    /// Asset the job targets.
    pub asset_id: i32,
    /// Version that triggered the job.
    pub version_id: i32,
    /// Original upload filename, used to name derived artifacts.
    pub filename: String,
}

impl PipelineJob {
    /// Create a new job with a generated UUID.
    pub fn new(kind: JobKind, asset_id: i32, version_id: i32, filename: String) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            kind,
            asset_id,
            version_id,
            filename,
        }
    }
}

/// Result from the worker after a pipeline job finishes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Original job ID.
    pub job_id: String,
    pub kind: JobKind,
    pub asset_id: i32,
    pub version_id: i32,
    pub outcome: PipelineOutcome,
    /// Derived artifact (rendered output or thumbnail), if the job produced one.
    pub artifact: Option<PipelineArtifact>,
    /// AI analysis payload (only for `AiEnrich` jobs).
    pub ai_data: Option<serde_json::Value>,
}

impl PipelineResult {
    /// Create a result indicating the job failed.
    pub fn failed(job: &PipelineJob, message: impl Into<String>) -> Self {
        Self {
            job_id: job.job_id.clone(),
            kind: job.kind,
            asset_id: job.asset_id,
            version_id: job.version_id,
            outcome: PipelineOutcome::Failed {
                message: message.into(),
            },
            artifact: None,
            ai_data: None,
        }
    }
}

/// Terminal outcome of a pipeline job.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed,
    Failed { message: String },
}

/// Bytes produced by a pipeline job, stored by the result consumer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineArtifact {
    /// Suggested filename (e.g. "render_42.txt", "thumb_42.png").
    pub filename: String,
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique() {
        let a = PipelineJob::new(JobKind::Render, 1, 1, "model.obj".into());
        let b = PipelineJob::new(JobKind::Render, 1, 1, "model.obj".into());
        assert_ne!(a.job_id, b.job_id);
    }

    #[test]
    fn result_round_trip() {
        let job = PipelineJob::new(JobKind::AiEnrich, 7, 3, "doc.pdf".into());
        let result = PipelineResult {
            job_id: job.job_id.clone(),
            kind: job.kind,
            asset_id: job.asset_id,
            version_id: job.version_id,
            outcome: PipelineOutcome::Completed,
            artifact: None,
            ai_data: Some(serde_json::json!({"confidence": 0.95})),
        };
        let json = serde_json::to_string(&result).unwrap();
        let parsed: PipelineResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.asset_id, 7);
        assert!(matches!(parsed.outcome, PipelineOutcome::Completed));
    }

    #[test]
    fn failed_carries_message() {
        let job = PipelineJob::new(JobKind::Thumbnail, 2, 9, "a.png".into());
        let result = PipelineResult::failed(&job, "simulated failure");
        match result.outcome {
            PipelineOutcome::Failed { message } => assert_eq!(message, "simulated failure"),
            _ => panic!("expected failure outcome"),
        }
    }
}
