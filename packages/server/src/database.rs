use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Connect to the database and synchronize the entity schema.
///
/// A request holds a connection only for the span of one transaction; the
/// longest hold is the version-allocation lock, which covers a single
/// aggregate read and insert. A modest pool covers that comfortably.
pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());
    opt.max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}
