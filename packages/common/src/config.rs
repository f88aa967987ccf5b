use serde::Deserialize;

/// App-level MQ configuration, shared by server and worker.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether MQ is enabled. Default: true.
    /// The server degrades to no background dispatch when disabled; the
    /// worker always requires MQ and ignores this field.
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue for pipeline jobs (server publishes, worker consumes).
    #[serde(default = "default_mq_job_queue")]
    pub job_queue: String,
    /// Queue for pipeline results (worker publishes, server consumes).
    #[serde(default = "default_mq_result_queue")]
    pub result_queue: String,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_job_queue() -> String {
    "pipeline_jobs".into()
}
fn default_mq_result_queue() -> String {
    "pipeline_results".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            job_queue: default_mq_job_queue(),
            result_queue: default_mq_result_queue(),
        }
    }
}
