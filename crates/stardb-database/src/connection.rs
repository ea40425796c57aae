//! Database connection management

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use stardb_core::DatabaseConfig;
use stardb_migrations::{Migrator, MigratorTrait};
use std::sync::Arc;
use tracing::{debug, info};

pub type DbConnection = DatabaseConnection;

/// Connect to the configured backend and bring the static catalog schema
/// up to date.
pub async fn establish_connection(config: &DatabaseConfig) -> Result<Arc<DbConnection>, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    debug!("Connected to {:?} backend", db.get_database_backend());

    // Run migrations
    Migrator::up(&db, None).await?;
    info!("Catalog schema is up to date");

    Ok(Arc::new(db))
}
