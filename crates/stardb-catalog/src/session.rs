//! Run-long session over one transaction
//!
//! A [`Catalog`] holds what is shared for the lifetime of the process: the
//! template registry and the name authority. A [`Session`] opens the single
//! transaction of a run and hands out every component bound to it. Nothing
//! is written until [`Session::commit`]; dropping a session rolls back.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, TransactionTrait,
};
use stardb_core::StarDbConfig;
use std::sync::Arc;
use tracing::{debug, info};

use crate::authority::{NameAuthority, SimbadAuthority};
use crate::dataset::DatasetMaterializer;
use crate::datatypes::DatatypeRegistry;
use crate::error::CatalogResult;
use crate::ingest::IngestRun;
use crate::provenance::Provenance;
use crate::query::QueryAssembler;
use crate::sanity::SanityChecker;
use crate::stars::StarResolver;
use crate::templates::TemplateRegistry;

#[derive(Clone)]
pub struct Catalog {
    templates: Arc<TemplateRegistry>,
    authority: Arc<dyn NameAuthority>,
}

impl Catalog {
    pub fn new(templates: Arc<TemplateRegistry>, authority: Arc<dyn NameAuthority>) -> Self {
        Self {
            templates,
            authority,
        }
    }

    /// Build from configuration: templates from the configured document or
    /// the built-in set for `backend`, SIMBAD as the name authority
    pub fn from_config(config: &StarDbConfig, backend: DbBackend) -> CatalogResult<Self> {
        let templates = match &config.schema.templates {
            Some(path) => {
                debug!("Loading table templates from {}", path.display());
                TemplateRegistry::load(path)?
            }
            None => TemplateRegistry::for_backend(backend)?,
        };
        let authority = SimbadAuthority::new(&config.name_authority)?;
        Ok(Self::new(Arc::new(templates), Arc::new(authority)))
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn authority(&self) -> &dyn NameAuthority {
        self.authority.as_ref()
    }

    pub fn provenance<'a, C: ConnectionTrait>(&'a self, db: &'a C) -> Provenance<'a, C> {
        Provenance::new(db)
    }

    pub fn stars<'a, C: ConnectionTrait>(&'a self, db: &'a C) -> StarResolver<'a, C> {
        StarResolver::new(db, self.authority.as_ref())
    }

    pub fn datatypes<'a, C: ConnectionTrait>(&'a self, db: &'a C) -> DatatypeRegistry<'a, C> {
        DatatypeRegistry::new(db, &self.templates)
    }

    pub fn datasets<'a, C: ConnectionTrait>(&'a self, db: &'a C) -> DatasetMaterializer<'a, C> {
        DatasetMaterializer::new(db)
    }

    pub fn query<'a, C: ConnectionTrait>(&'a self, db: &'a C) -> QueryAssembler<'a, C> {
        QueryAssembler::new(db)
    }

    pub fn sanity<'a, C: ConnectionTrait>(&'a self, db: &'a C) -> SanityChecker<'a, C> {
        SanityChecker::new(db)
    }

    /// Start an ingestion run with fresh caches
    pub fn ingest_run<'a, C: ConnectionTrait>(
        &'a self,
        db: &'a C,
        create_stars: bool,
    ) -> IngestRun<'a, C> {
        IngestRun::new(db, self.authority.as_ref(), create_stars)
    }

    /// Open the run-long transaction
    pub async fn begin<'c>(&'c self, db: &DatabaseConnection) -> CatalogResult<Session<'c>> {
        Session::begin(db, self).await
    }
}

pub struct Session<'c> {
    txn: DatabaseTransaction,
    catalog: &'c Catalog,
}

impl<'c> Session<'c> {
    pub async fn begin(db: &DatabaseConnection, catalog: &'c Catalog) -> CatalogResult<Self> {
        let txn = db.begin().await?;
        debug!("Session transaction opened");
        Ok(Self { txn, catalog })
    }

    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    pub fn provenance(&self) -> Provenance<'_, DatabaseTransaction> {
        self.catalog.provenance(&self.txn)
    }

    pub fn stars(&self) -> StarResolver<'_, DatabaseTransaction> {
        self.catalog.stars(&self.txn)
    }

    pub fn datatypes(&self) -> DatatypeRegistry<'_, DatabaseTransaction> {
        self.catalog.datatypes(&self.txn)
    }

    pub fn datasets(&self) -> DatasetMaterializer<'_, DatabaseTransaction> {
        self.catalog.datasets(&self.txn)
    }

    pub fn query(&self) -> QueryAssembler<'_, DatabaseTransaction> {
        self.catalog.query(&self.txn)
    }

    pub fn sanity(&self) -> SanityChecker<'_, DatabaseTransaction> {
        self.catalog.sanity(&self.txn)
    }

    pub fn ingest_run(&self, create_stars: bool) -> IngestRun<'_, DatabaseTransaction> {
        self.catalog.ingest_run(&self.txn, create_stars)
    }

    pub async fn commit(self) -> CatalogResult<()> {
        self.txn.commit().await?;
        info!("Session committed");
        Ok(())
    }

    pub async fn rollback(self) -> CatalogResult<()> {
        self.txn.rollback().await?;
        info!("Session rolled back");
        Ok(())
    }
}
