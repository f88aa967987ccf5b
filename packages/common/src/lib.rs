pub mod asset_type;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod storage;
pub mod workflow;

pub use asset_type::AssetType;
pub use pipeline::{JobKind, PipelineArtifact, PipelineJob, PipelineOutcome, PipelineResult};
pub use processing::ProcessingStatus;
pub use workflow::VersionStatus;
