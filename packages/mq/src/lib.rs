mod error;

pub use broccoli_queue::{
    brokers::broker::BrokerMessage,
    error::BroccoliError,
    queue::{BroccoliQueue, ConsumeOptions, PublishOptions},
};

pub use error::MqError;

/// Redis-backed queue shared by the server (publisher/consumer) and the
/// pipeline worker (consumer/publisher).
pub type Mq = BroccoliQueue;

pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

pub async fn init_mq(config: MqConfig) -> Result<Mq, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}
