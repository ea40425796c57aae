//! Shared fixtures for catalog integration tests
//!
//! - An in-memory name authority with a fixed object list
//! - A migrated SQLite database with the built-in table templates
//! - Helpers inserting provenance rows

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sea_orm::{ConnectionTrait, DbBackend};
use stardb_catalog::{
    Catalog, CatalogResult, NameAuthority, NewDatatype, NewOrigin, NewReference, NewSource,
    ObjectInfo, Provenance, TemplateRegistry,
};
use stardb_core::compress_space;
use stardb_database::test_utils::TestDatabase;
use stardb_entities::{reference, source};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Name authority answering from a fixed list of objects
#[derive(Default)]
pub struct FakeAuthority {
    objects: Vec<(ObjectInfo, Vec<String>)>,
    lookups: AtomicUsize,
}

impl FakeAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, main_id: &str, ra: f64, dec: f64, ids: &[&str]) -> Self {
        self.objects.push((
            ObjectInfo {
                main_id: main_id.to_string(),
                coord: format!("{} {}", ra, dec),
                ra,
                dec,
            },
            ids.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// The usual stars of these tests
    pub fn standard() -> Self {
        Self::new()
            .with_object("* alf Lyr", 279.2347, 38.7837, &["* alf Lyr", "NAME Vega", "HD 172167"])
            .with_object("* alf CMa", 101.2872, -16.7161, &["* alf CMa", "NAME Sirius", "HD 48915"])
            .with_object("* eps Eri", 53.2327, -9.4583, &["* eps Eri", "HD 22049"])
            .with_object("HD 1835", 5.8, -12.2, &["HD 1835", "* 9 Cet"])
            .with_object("HD 224750", 359.9, 0.2, &["HD 224750"])
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn find(&self, name: &str) -> Option<&(ObjectInfo, Vec<String>)> {
        let wanted = compress_space(name).to_lowercase();
        self.objects.iter().find(|(_, ids)| {
            ids.iter().any(|id| {
                let id = compress_space(id).to_lowercase();
                id == wanted
                    || id.strip_prefix("name ") == Some(wanted.as_str())
                    || id.strip_prefix("* ") == Some(wanted.as_str())
            })
        })
    }
}

#[async_trait]
impl NameAuthority for FakeAuthority {
    async fn lookup_ids(&self, name: &str) -> CatalogResult<Option<Vec<String>>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.find(name).map(|(_, ids)| ids.clone()))
    }

    async fn lookup_info(&self, name: &str) -> CatalogResult<Option<ObjectInfo>> {
        Ok(self.find(name).map(|(info, _)| info.clone()))
    }
}

pub struct Harness {
    pub test_db: TestDatabase,
    pub catalog: Catalog,
    pub authority: Arc<FakeAuthority>,
}

impl Harness {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_authority(FakeAuthority::standard()).await
    }

    pub async fn with_authority(authority: FakeAuthority) -> anyhow::Result<Self> {
        let test_db = TestDatabase::with_migrations().await?;
        let templates = TemplateRegistry::for_backend(DbBackend::Sqlite)?;
        let authority = Arc::new(authority);
        let catalog = Catalog::new(Arc::new(templates), authority.clone());
        Ok(Self {
            test_db,
            catalog,
            authority,
        })
    }

    pub fn db(&self) -> &sea_orm::DatabaseConnection {
        self.test_db.connection()
    }

    pub async fn datatype(&self, name: &str, kind: &str, unit: &str) -> anyhow::Result<()> {
        self.catalog
            .datatypes(self.db())
            .insert(&NewDatatype::new(name, kind, unit, &format!("{} values", name))?)
            .await?;
        Ok(())
    }
}

/// Insert a reference, an origin and a source named `name`
pub async fn insert_source<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> anyhow::Result<(source::Model, reference::Model)> {
    let provenance = Provenance::new(db);
    let reference = provenance
        .ensure_reference(&NewReference::new(
            &format!("{} paper", name),
            "Doe, J. 2020, A&A, 1, 1",
            "2020A&A.....1....1D",
        )?)
        .await?;
    let origin = provenance
        .ensure_origin(&NewOrigin::new(&format!("{} survey", name), "SURVEY")?)
        .await?;
    let source = provenance
        .insert_source(&NewSource::new(
            name,
            "FILE",
            Some(origin.id),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        )?)
        .await?;
    Ok((source, reference))
}
