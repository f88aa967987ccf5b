use std::sync::Arc;

use common::storage::FileStore;
use mq::Mq;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn FileStore>,
    /// Absent when the queue is disabled; uploads then skip job dispatch.
    pub mq: Option<Arc<Mq>>,
}
