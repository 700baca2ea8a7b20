use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};
use std::time::Duration;

use crate::config::Config;

/// Initialize the database connection from config.
pub async fn connect(config: &Config) -> Result<DatabaseConnection, sea_orm::DbErr> {
    // An in-memory SQLite database exists per connection; pooling more than
    // one connection would hand each request a different empty database.
    let in_memory = config.database_url.contains(":memory:");
    let (max_conns, min_conns) = if in_memory { (1, 1) } else { (100, 5) };

    let mut opts = ConnectOptions::new(&config.database_url);
    opts.max_connections(max_conns)
        .min_connections(min_conns)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(config.is_dev());

    SeaDatabase::connect(opts).await
}
