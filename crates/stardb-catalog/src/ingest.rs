//! Ingestion Pipeline
//!
//! Each data point goes through RESOLVE_ENTITIES, NORMALIZE and DISPATCH.
//! Stars and datatypes resolved during a run are cached on the
//! [`IngestRun`]; a run must not outlive the batch it was created for.

use chrono::{SubsecRound, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use stardb_core::{compress_space, DBDateTime};
use stardb_datapkg::{DataPkgResult, DataPoint, DataReader};
use stardb_entities::{datatype, property, source, star, timeseries, StructKind};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::authority::NameAuthority;
use crate::error::{CatalogError, CatalogResult};
use crate::ident::TableName;
use crate::normalize::{
    normalize_error, normalize_time, ErrorBounds, ErrorInput, ObservationTime, TimeInput,
};
use crate::provenance::{Provenance, VersionFilter};
use crate::requests::{NewOrigin, NewReference, NewSource};
use crate::sql::Params;
use crate::stars::StarResolver;

/// An entity given either by row id or by natural key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Id(i32),
    Name(String),
}

impl From<i32> for EntityRef {
    fn from(id: i32) -> Self {
        EntityRef::Id(id)
    }
}

impl From<&str> for EntityRef {
    fn from(name: &str) -> Self {
        EntityRef::Name(name.to_string())
    }
}

/// Provenance shared by every data point of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestContext {
    pub source: EntityRef,
    pub reference: EntityRef,
    pub instrument: Option<EntityRef>,
}

/// Natural key of one fact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactKey {
    pub star_id: i32,
    pub datatype_id: i32,
    pub source_id: i32,
    pub reference_id: i32,
    pub instrument_id: Option<i32>,
}

/// Normalized payload of one fact
#[derive(Debug, Clone, PartialEq)]
pub enum FactValue {
    Number { value: f64, errors: ErrorBounds },
    Label(String),
}

/// A fully resolved and normalized data point
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub key: FactKey,
    pub value: FactValue,
    pub time: Option<ObservationTime>,
    pub meta: Option<serde_json::Value>,
}

/// Result of appending one timepoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppendOutcome {
    pub timeseries_id: i32,
    /// New value of the header's `last_appended` marker
    pub appended_at: DBDateTime,
    pub created_header: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Property(property::Model),
    Timepoint(AppendOutcome),
}

/// What to do when a single data point fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the batch at the first failure
    #[default]
    Abort,
    /// Log and skip the data point. Database errors still abort, since the
    /// open transaction may be unusable after them.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub data_points: usize,
    /// Distinct stars referenced by the run
    pub stars: usize,
    pub new_stars: usize,
    pub failures: usize,
}

/// Writes normalized facts into the generic and per-datatype tables
pub struct FactWriter<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> FactWriter<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Insert a MEASURE or LABEL fact: the generic property row, then the
    /// typed row keyed by its id
    pub async fn insert_property(
        &self,
        datatype: &datatype::Model,
        fact: &Fact,
    ) -> CatalogResult<property::Model> {
        let table = TableName::for_datatype(datatype)?;
        match (datatype.kind, &fact.value) {
            (StructKind::Measure, FactValue::Number { .. })
            | (StructKind::Label, FactValue::Label(_)) => {}
            (StructKind::Timeseries, _) => {
                return Err(CatalogError::KindMismatch {
                    datatype: datatype.name.clone(),
                    expected: "MEASURE or LABEL",
                    actual: datatype.kind,
                })
            }
            (_, FactValue::Number { .. }) => {
                return Err(CatalogError::KindMismatch {
                    datatype: datatype.name.clone(),
                    expected: "MEASURE",
                    actual: datatype.kind,
                })
            }
            (_, FactValue::Label(_)) => {
                return Err(CatalogError::KindMismatch {
                    datatype: datatype.name.clone(),
                    expected: "LABEL",
                    actual: datatype.kind,
                })
            }
        }

        let key = &fact.key;
        let property = property::ActiveModel {
            star_id: Set(key.star_id),
            datatype_id: Set(datatype.id),
            source_id: Set(key.source_id),
            reference_id: Set(key.reference_id),
            instrument_id: Set(key.instrument_id),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        let mut params = Params::new(self.db.get_database_backend());
        let mut columns = vec![
            ("property_id", params.bind(property.id)),
            ("star_id", params.bind(key.star_id)),
            ("source_id", params.bind(key.source_id)),
        ];
        match &fact.value {
            FactValue::Number { value, errors } => {
                columns.push(("value", params.bind(*value)));
                bind_errors(&mut params, &mut columns, errors);
                bind_time(&mut params, &mut columns, fact.time.as_ref());
            }
            FactValue::Label(label) => {
                columns.push(("value", params.bind(label.as_str())));
            }
        }
        columns.push(("meta", params.bind(fact.meta.clone())));

        self.db
            .execute(params.statement(insert_sql(&table, &columns)))
            .await?;
        debug!(
            "Inserted property {} of '{}' for star {}",
            property.id, datatype.name, key.star_id
        );
        Ok(property)
    }

    /// Append one timepoint to the stream keyed by the fact, creating the
    /// stream header on first use. The header's `last_appended` marker is
    /// advanced on every append and never moves backwards.
    pub async fn append_timeseries(
        &self,
        datatype: &datatype::Model,
        fact: &Fact,
    ) -> CatalogResult<AppendOutcome> {
        if datatype.kind != StructKind::Timeseries {
            return Err(CatalogError::KindMismatch {
                datatype: datatype.name.clone(),
                expected: "TIMESERIES",
                actual: datatype.kind,
            });
        }
        let (value, errors) = match &fact.value {
            FactValue::Number { value, errors } => (*value, errors),
            FactValue::Label(_) => {
                return Err(CatalogError::MissingRequiredField {
                    operation: "append_timeseries",
                    field: "val",
                })
            }
        };
        let time = fact.time.as_ref().ok_or(CatalogError::MissingRequiredField {
            operation: "append_timeseries",
            field: "obs_time",
        })?;
        let table = TableName::for_datatype(datatype)?;
        let key = &fact.key;

        // Stored timestamps keep microsecond precision on every backend
        let now = Utc::now().trunc_subsecs(6);
        let header = timeseries::Entity::find()
            .filter(timeseries::Column::StarId.eq(key.star_id))
            .filter(timeseries::Column::DatatypeId.eq(datatype.id))
            .filter(timeseries::Column::SourceId.eq(key.source_id))
            .filter(timeseries::Column::ReferenceId.eq(key.reference_id))
            .filter(match key.instrument_id {
                Some(id) => timeseries::Column::InstrumentId.eq(id),
                None => timeseries::Column::InstrumentId.is_null(),
            })
            .one(self.db)
            .await?;

        let (header, appended_at, created_header) = match header {
            Some(header) => {
                let appended_at = now.max(header.last_appended);
                (header, appended_at, false)
            }
            None => {
                let header = timeseries::ActiveModel {
                    star_id: Set(key.star_id),
                    datatype_id: Set(datatype.id),
                    source_id: Set(key.source_id),
                    reference_id: Set(key.reference_id),
                    instrument_id: Set(key.instrument_id),
                    last_appended: Set(now),
                    ..Default::default()
                }
                .insert(self.db)
                .await?;
                debug!(
                    "Created timeseries {} of '{}' for star {}",
                    header.id, datatype.name, key.star_id
                );
                (header, now, true)
            }
        };

        let mut params = Params::new(self.db.get_database_backend());
        let mut columns = vec![
            ("timeseries_id", params.bind(header.id)),
            ("star_id", params.bind(key.star_id)),
            ("source_id", params.bind(key.source_id)),
            ("value", params.bind(value)),
        ];
        bind_errors(&mut params, &mut columns, errors);
        bind_time(&mut params, &mut columns, Some(time));
        columns.push(("meta", params.bind(fact.meta.clone())));
        self.db
            .execute(params.statement(insert_sql(&table, &columns)))
            .await?;

        let timeseries_id = header.id;
        if header.last_appended != appended_at {
            let mut active: timeseries::ActiveModel = header.into();
            active.last_appended = Set(appended_at);
            active.update(self.db).await?;
        }

        Ok(AppendOutcome {
            timeseries_id,
            appended_at,
            created_header,
        })
    }
}

fn bind_errors(
    params: &mut Params,
    columns: &mut Vec<(&'static str, String)>,
    errors: &ErrorBounds,
) {
    columns.push(("errlo", params.bind(errors.errlo)));
    columns.push(("errhi", params.bind(errors.errhi)));
    columns.push(("errbound_lo", params.bind(errors.bound_lo)));
    columns.push(("errbound_hi", params.bind(errors.bound_hi)));
}

fn bind_time(
    params: &mut Params,
    columns: &mut Vec<(&'static str, String)>,
    time: Option<&ObservationTime>,
) {
    columns.push(("obs_time", params.bind(time.map(|t| t.instant))));
    columns.push(("obs_duration", params.bind(time.map(|t| t.duration))));
    columns.push(("obs_start", params.bind(time.map(|t| t.start))));
    columns.push(("obs_end", params.bind(time.map(|t| t.end))));
}

fn insert_sql(table: &TableName, columns: &[(&'static str, String)]) -> String {
    let (names, placeholders): (Vec<&str>, Vec<&str>) = columns
        .iter()
        .map(|(name, placeholder)| (*name, placeholder.as_str()))
        .unzip();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.quoted(),
        names.join(", "),
        placeholders.join(", ")
    )
}

#[derive(Debug, Clone, Copy)]
struct ResolvedContext {
    source_id: i32,
    reference_id: i32,
    instrument_id: Option<i32>,
}

/// One ingestion batch
pub struct IngestRun<'a, C: ConnectionTrait> {
    db: &'a C,
    authority: &'a dyn NameAuthority,
    create_stars: bool,
    stars: HashMap<String, star::Model>,
    datatypes: HashMap<String, datatype::Model>,
    context: Option<(IngestContext, ResolvedContext)>,
    report: IngestReport,
}

impl<'a, C: ConnectionTrait> IngestRun<'a, C> {
    /// Start a run. With `create_stars`, unknown star names are looked up
    /// at the name authority and inserted; otherwise they fail the datum.
    pub fn new(db: &'a C, authority: &'a dyn NameAuthority, create_stars: bool) -> Self {
        Self {
            db,
            authority,
            create_stars,
            stars: HashMap::new(),
            datatypes: HashMap::new(),
            context: None,
            report: IngestReport::default(),
        }
    }

    pub fn report(&self) -> &IngestReport {
        &self.report
    }

    async fn resolve_star(&mut self, name: &str) -> CatalogResult<star::Model> {
        let name = compress_space(name);
        if let Some(star) = self.stars.get(&name) {
            return Ok(star.clone());
        }
        let resolver = StarResolver::new(self.db, self.authority);
        let star = if self.create_stars {
            let resolved = resolver.resolve_or_create(&name).await?;
            if resolved.created {
                self.report.new_stars += 1;
            }
            resolved.star
        } else {
            resolver
                .fetch(&name)
                .await?
                .ok_or_else(|| CatalogError::missing("Star", &name))?
        };
        self.stars.insert(name, star.clone());
        self.report.stars = self.stars.len();
        Ok(star)
    }

    async fn resolve_datatype(&mut self, name: &str) -> CatalogResult<datatype::Model> {
        if let Some(model) = self.datatypes.get(name) {
            return Ok(model.clone());
        }
        let model = datatype::Entity::find()
            .filter(datatype::Column::Name.eq(name))
            .one(self.db)
            .await?
            .ok_or_else(|| CatalogError::UnknownDatatype(name.to_string()))?;
        self.datatypes.insert(name.to_string(), model.clone());
        Ok(model)
    }

    async fn resolve_context(&mut self, ctx: &IngestContext) -> CatalogResult<ResolvedContext> {
        if let Some((cached, resolved)) = &self.context {
            if cached == ctx {
                return Ok(*resolved);
            }
        }
        let provenance = Provenance::new(self.db);
        let source_id = match &ctx.source {
            EntityRef::Id(id) => *id,
            EntityRef::Name(name) => {
                provenance
                    .fetch_source(name, &VersionFilter::Any)
                    .await?
                    .ok_or_else(|| CatalogError::missing("Source", name))?
                    .id
            }
        };
        let reference_id = match &ctx.reference {
            EntityRef::Id(id) => *id,
            EntityRef::Name(name) => {
                provenance
                    .fetch_reference(name)
                    .await?
                    .ok_or_else(|| CatalogError::missing("Reference", name))?
                    .id
            }
        };
        let instrument_id = match &ctx.instrument {
            None => None,
            Some(EntityRef::Id(id)) => Some(*id),
            Some(EntityRef::Name(name)) => Some(
                provenance
                    .fetch_instrument(name)
                    .await?
                    .ok_or_else(|| CatalogError::missing("Instrument", name))?
                    .id,
            ),
        };
        let resolved = ResolvedContext {
            source_id,
            reference_id,
            instrument_id,
        };
        self.context = Some((ctx.clone(), resolved));
        Ok(resolved)
    }

    /// Ingest a single data point
    pub async fn ingest(
        &mut self,
        point: &DataPoint,
        ctx: &IngestContext,
    ) -> CatalogResult<IngestOutcome> {
        // RESOLVE_ENTITIES
        let resolved = self.resolve_context(ctx).await?;
        let datatype = self.resolve_datatype(&point.datatype).await?;
        let star = self.resolve_star(&point.star).await?;

        // NORMALIZE
        let time = normalize_time(&TimeInput::from_point(point))?;
        let value = if datatype.kind.is_numeric() {
            let value = point.val.ok_or(CatalogError::MissingRequiredField {
                operation: "ingest",
                field: "val",
            })?;
            let errors = normalize_error(Some(value), &ErrorInput::from_point(point))?;
            FactValue::Number { value, errors }
        } else {
            FactValue::Label(point.label.clone().ok_or(CatalogError::MissingRequiredField {
                operation: "ingest",
                field: "label",
            })?)
        };
        let fact = Fact {
            key: FactKey {
                star_id: star.id,
                datatype_id: datatype.id,
                source_id: resolved.source_id,
                reference_id: resolved.reference_id,
                instrument_id: resolved.instrument_id,
            },
            value,
            time,
            meta: point.meta.clone(),
        };

        // DISPATCH
        let writer = FactWriter::new(self.db);
        let outcome = if datatype.kind.is_property() {
            IngestOutcome::Property(writer.insert_property(&datatype, &fact).await?)
        } else {
            IngestOutcome::Timepoint(writer.append_timeseries(&datatype, &fact).await?)
        };
        self.report.data_points += 1;
        Ok(outcome)
    }

    /// Ingest a stream of records under one context
    pub async fn ingest_all<I>(
        &mut self,
        records: I,
        ctx: &IngestContext,
        policy: FailurePolicy,
    ) -> CatalogResult<IngestReport>
    where
        I: IntoIterator<Item = DataPkgResult<DataPoint>>,
    {
        for (index, record) in records.into_iter().enumerate() {
            let result = match record {
                Ok(point) => self.ingest(&point, ctx).await.map(|_| ()),
                Err(e) => Err(e.into()),
            };
            if let Err(err) = result {
                if policy == FailurePolicy::Skip && !err.is_database() {
                    warn!("Skipping data point #{}: {}", index, err);
                    self.report.failures += 1;
                    continue;
                }
                return Err(err);
            }
        }
        info!(
            "Ingested {} data points for {} stars ({} new, {} skipped)",
            self.report.data_points,
            self.report.stars,
            self.report.new_stars,
            self.report.failures
        );
        Ok(self.report.clone())
    }

    /// Register a package's provenance as a new source and ingest all of
    /// its records under it. The reference and origin are created when
    /// absent; a named instrument must already exist.
    pub async fn ingest_package(
        &mut self,
        reader: &dyn DataReader,
        policy: FailurePolicy,
    ) -> CatalogResult<(source::Model, IngestReport)> {
        let info = reader.info();
        let provenance = Provenance::new(self.db);

        let reference = provenance
            .ensure_reference(&NewReference::from_info(&info.reference)?)
            .await?;
        let origin = provenance
            .ensure_origin(&NewOrigin::from_info(&info.origin)?)
            .await?;
        let instrument = match &info.instrument {
            Some(instrument) => Some(
                provenance
                    .fetch_instrument(&instrument.name)
                    .await?
                    .ok_or_else(|| CatalogError::missing("Instrument", &instrument.name))?,
            ),
            None => None,
        };
        let source = provenance
            .insert_source(&NewSource::from_info(reader.source(), origin.id)?)
            .await?;
        info!(
            "Ingesting source '{}' (reference '{}', origin '{}')",
            source.name, reference.name, origin.name
        );

        let ctx = IngestContext {
            source: EntityRef::Id(source.id),
            reference: EntityRef::Id(reference.id),
            instrument: instrument.map(|i| EntityRef::Id(i.id)),
        };
        let report = self.ingest_all(reader.records(), &ctx, policy).await?;
        Ok((source, report))
    }
}
