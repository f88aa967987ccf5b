use std::sync::Arc;

use anyhow::Context;
use common::storage::FilesystemFileStore;
use server::config::AppConfig;
use server::state::AppState;
use server::{build_router, consumers, database};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(
        FilesystemFileStore::new(config.storage.root.clone().into(), config.storage.max_file_size)
            .await
            .context("Failed to initialize file storage")?,
    );

    let mq = if config.mq.enabled {
        match mq::init_mq(mq::MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        {
            Ok(queue) => Some(Arc::new(queue)),
            Err(e) => {
                warn!("Queue unavailable, pipeline jobs disabled: {e}");
                None
            }
        }
    } else {
        info!("Queue disabled by configuration, pipeline jobs disabled");
        None
    };

    if let Some(mq) = mq.clone() {
        tokio::spawn(consumers::consume_pipeline_results(
            db.clone(),
            store.clone(),
            mq,
            config.mq.result_queue.clone(),
        ));
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        db,
        config: Arc::new(config),
        store,
        mq,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {addr}");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
