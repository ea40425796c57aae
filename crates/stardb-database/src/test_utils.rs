//! Test utilities for database integration tests
//!
//! Every `TestDatabase` is a private in-memory SQLite database with the
//! static catalog schema applied. The pool holds exactly one connection,
//! since each SQLite memory connection is its own database.

use crate::DbConnection;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, QueryResult, Statement};
use sea_orm_migration::MigratorTrait;
use stardb_migrations::Migrator;
use std::sync::Arc;

pub struct TestDatabase {
    pub db: Arc<DbConnection>,
}

impl TestDatabase {
    /// Create an empty in-memory database without running migrations
    pub async fn new() -> anyhow::Result<Self> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(opt)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open in-memory database: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Create an in-memory database and run the catalog migrations
    pub async fn with_migrations() -> anyhow::Result<Self> {
        let test_db = Self::new().await?;
        Migrator::up(&*test_db.db, None)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        Ok(test_db)
    }

    /// Get a reference to the database connection
    pub fn connection(&self) -> &DbConnection {
        &self.db
    }

    /// Get an Arc to the database connection
    pub fn connection_arc(&self) -> Arc<DbConnection> {
        self.db.clone()
    }

    /// Execute raw SQL
    pub async fn execute_sql(&self, sql: &str) -> anyhow::Result<()> {
        self.db.execute_unprepared(sql).await?;
        Ok(())
    }

    /// Query raw SQL and return results
    pub async fn query_sql(&self, sql: &str) -> anyhow::Result<Vec<QueryResult>> {
        let backend = self.db.get_database_backend();
        let rows = self
            .db
            .query_all(Statement::from_string(backend, sql.to_owned()))
            .await?;
        Ok(rows)
    }

    /// Count rows of a table
    pub async fn count(&self, table: &str) -> anyhow::Result<i64> {
        let rows = self
            .query_sql(&format!("SELECT COUNT(*) AS n FROM \"{}\"", table))
            .await?;
        let n = rows
            .first()
            .ok_or_else(|| anyhow::anyhow!("COUNT returned no row"))?
            .try_get::<i64>("", "n")?;
        Ok(n)
    }

    /// Whether a table exists in the SQLite catalog
    pub async fn table_exists(&self, table: &str) -> anyhow::Result<bool> {
        let rows = self
            .query_sql(&format!(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '{}'",
                table.replace('\'', "''")
            ))
            .await?;
        Ok(!rows.is_empty())
    }
}
