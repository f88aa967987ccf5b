use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Number of jobs to process concurrently. Default: 4.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Simulated render duration in milliseconds. Default: 5000.
    #[serde(default = "default_render_delay_ms")]
    pub render_delay_ms: u64,
    /// Simulated thumbnail duration in milliseconds. Default: 2000.
    #[serde(default = "default_thumbnail_delay_ms")]
    pub thumbnail_delay_ms: u64,
    /// Simulated AI analysis duration in milliseconds. Default: 3000.
    #[serde(default = "default_ai_delay_ms")]
    pub ai_delay_ms: u64,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_batch_size() -> usize {
    4
}
fn default_render_delay_ms() -> u64 {
    5000
}
fn default_thumbnail_delay_ms() -> u64 {
    2000
}
fn default_ai_delay_ms() -> u64 {
    3000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            batch_size: default_batch_size(),
            render_delay_ms: default_render_delay_ms(),
            thumbnail_delay_ms: default_thumbnail_delay_ms(),
            ai_delay_ms: default_ai_delay_ms(),
        }
    }
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("PALETTE_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("worker.batch_size", 4_i64)?
            .set_default("worker.render_delay_ms", 5000_i64)?
            .set_default("worker.thumbnail_delay_ms", 2000_i64)?
            .set_default("worker.ai_delay_ms", 3000_i64)?
            .set_default("mq.enabled", true)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .set_default("mq.job_queue", "pipeline_jobs")?
            .set_default("mq.result_queue", "pipeline_results")?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("PALETTE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
