use sea_orm::{ConnectOptions, Database};
use stardb_migrations::{Migrator, MigratorTrait, SchemaManager};

async fn memory_db() -> anyhow::Result<sea_orm::DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1);
    Ok(Database::connect(opt).await?)
}

#[tokio::test]
async fn test_up_creates_static_tables() -> anyhow::Result<()> {
    let db = memory_db().await?;
    Migrator::up(&db, None).await?;

    let manager = SchemaManager::new(&db);
    for table in [
        "star",
        "star_alias",
        "reference",
        "origin",
        "instrument",
        "source",
        "datatype",
        "property",
        "timeseries",
        "dataset",
        "dataset_map",
    ] {
        assert!(manager.has_table(table).await?, "missing table {}", table);
    }
    Ok(())
}

#[tokio::test]
async fn test_down_removes_static_tables() -> anyhow::Result<()> {
    let db = memory_db().await?;
    Migrator::up(&db, None).await?;
    Migrator::down(&db, None).await?;

    let manager = SchemaManager::new(&db);
    assert!(!manager.has_table("star").await?);
    assert!(!manager.has_table("dataset_map").await?);
    Ok(())
}
