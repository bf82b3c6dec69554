use std::sync::Arc;

use sea_orm::{ConnectOptions, Database as SeaDatabase};

use crate::database::Database;

/// Fresh in-memory database with the real schema applied
pub async fn test_db() -> Arc<Database> {
    // In-memory SQLite is per connection, so the pool must hold exactly one.
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let conn = SeaDatabase::connect(opt).await.unwrap();

    Arc::new(Database::prepare(conn).await.unwrap())
}
