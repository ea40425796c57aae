//! StarDB catalog engine
//!
//! Every measurable quantity ("datatype") owns a physical table built from
//! one of three structural templates. This crate creates and drops those
//! tables, resolves star identities against an external name authority,
//! normalizes heterogeneous input into one stored shape, ingests data
//! points and assembles queries across an arbitrary set of datatypes.
//!
//! All components borrow a [`sea_orm::ConnectionTrait`], so they run
//! unchanged against a plain connection or inside the single transaction
//! held by a [`Session`].

pub mod authority;
pub mod coords;
pub mod dataset;
pub mod datatypes;
pub mod error;
pub mod ident;
pub mod ingest;
pub mod normalize;
pub mod provenance;
pub mod query;
pub mod requests;
pub mod sanity;
pub mod session;
mod sql;
pub mod stars;
pub mod templates;

pub use authority::{NameAuthority, ObjectInfo, SimbadAuthority};
pub use coords::SkyCoord;
pub use dataset::{DatasetMaterializer, DatasetRebuild};
pub use datatypes::DatatypeRegistry;
pub use error::{CatalogError, CatalogResult, TemplateError};
pub use ident::{DatatypeName, TableName};
pub use ingest::{
    AppendOutcome, EntityRef, Fact, FactKey, FactValue, FactWriter, FailurePolicy, IngestContext,
    IngestOutcome, IngestReport, IngestRun,
};
pub use normalize::{ErrorBounds, ErrorInput, ObservationTime, TimeInput};
pub use provenance::{Provenance, SourceDeletion, VersionFilter};
pub use query::{
    CellValue, DataTable, ProvenancedValue, QueryAssembler, StarMatch, TableOptions, TimePoint,
};
pub use requests::{NewDatatype, NewInstrument, NewOrigin, NewReference, NewSource};
pub use sanity::{SanityChecker, SanityReport};
pub use session::{Catalog, Session};
pub use stars::{ResolvedStar, StarResolver};
pub use templates::{Ddl, TemplateParams, TemplateRegistry};
