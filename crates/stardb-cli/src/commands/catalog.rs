//! Connection and session handling shared by every command

use sea_orm::ConnectionTrait;
use stardb_catalog::{Catalog, Session};
use stardb_core::StarDbConfig;
use stardb_database::{establish_connection, DbConnection};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Options accepted by every command
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub database_url: Option<String>,
    pub templates: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn load_config(&self) -> anyhow::Result<StarDbConfig> {
        let config = StarDbConfig::load(self.config.as_deref())?
            .with_database_url(self.database_url.clone())
            .with_templates(self.templates.clone());
        config.validate()?;
        Ok(config)
    }
}

/// Open database connection plus the process-wide catalog state
pub struct CatalogEnv {
    db: Arc<DbConnection>,
    catalog: Catalog,
}

impl CatalogEnv {
    pub async fn open(options: &GlobalOptions) -> anyhow::Result<Self> {
        let config = options.load_config()?;
        debug!("Initializing database connection...");
        let db = establish_connection(&config.database).await?;
        let catalog = Catalog::from_config(&config, db.get_database_backend())?;
        Ok(Self { db, catalog })
    }

    pub async fn begin(&self) -> anyhow::Result<Session<'_>> {
        Ok(self.catalog.begin(&self.db).await?)
    }
}

/// Commit the session when the command succeeded, roll it back otherwise
pub async fn finish<T>(session: Session<'_>, result: anyhow::Result<T>) -> anyhow::Result<T> {
    match result {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// Run an async command body on a fresh runtime
pub fn block_on<F: Future<Output = anyhow::Result<()>>>(future: F) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(future)
}
