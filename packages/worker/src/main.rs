mod config;
mod handlers;

use std::sync::Arc;

use anyhow::Context;
use common::{PipelineJob, PipelineResult};
use handlers::pipeline::process_job;
use mq::{BroccoliError, BrokerMessage, MqConfig, init_mq};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = config::WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    let mq = Arc::new(
        init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to initialize MQ")?,
    );

    info!(
        job_queue = %config.mq.job_queue,
        result_queue = %config.mq.result_queue,
        "MQ connected"
    );

    let worker_config = config.worker.clone();
    let result_queue = config.mq.result_queue.clone();
    let mq_for_handler = Arc::clone(&mq);

    let result = mq
        .process_messages(
            &config.mq.job_queue,
            Some(config.worker.batch_size), // concurrent jobs
            None,
            move |message: BrokerMessage<PipelineJob>| {
                let mq = Arc::clone(&mq_for_handler);
                let result_queue = result_queue.clone();
                let worker_config = worker_config.clone();
                async move { process_message(message, &mq, &result_queue, &worker_config).await }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker stopped unexpectedly");
    }

    Ok(())
}

async fn process_message(
    message: BrokerMessage<PipelineJob>,
    mq: &Arc<mq::Mq>,
    result_queue: &str,
    worker_config: &config::WorkerConfig,
) -> Result<(), BroccoliError> {
    let job = message.payload;
    let job_id = job.job_id.clone();

    let result: PipelineResult = process_job(worker_config, job).await;

    mq.publish(result_queue, None, &result, None)
        .await
        .map_err(|e| {
            error!(job_id = %job_id, error = %e, "Failed to publish pipeline result");
            BroccoliError::Job(format!("result publish failed: {e}"))
        })?;

    info!(job_id = %job_id, "Pipeline result published");
    Ok(())
}
