mod common;

use common::{insert_source, Harness};
use stardb_catalog::{
    CatalogError, CellValue, EntityRef, IngestContext, SkyCoord, TableOptions,
};
use stardb_datapkg::{DataPoint, TimeValue};

/// teff for two stars near RA 0, sptype for one of them, Sirius elsewhere
async fn survey(h: &Harness) -> anyhow::Result<()> {
    h.datatype("teff", "MEASURE", "K").await?;
    h.datatype("sptype", "LABEL", "").await?;
    h.datatype("flux", "TIMESERIES", "Jy").await?;
    let (source, reference) = insert_source(h.db(), "survey").await?;
    let ctx = IngestContext {
        source: EntityRef::Id(source.id),
        reference: EntityRef::Id(reference.id),
        instrument: None,
    };

    let mut teff = DataPoint::measure("teff", "HD 1835", 5800.0);
    teff.errlo = Some(50.0);
    teff.errhi = Some(70.0);
    let mut run = h.catalog.ingest_run(h.db(), true);
    for point in [
        teff,
        DataPoint::measure("teff", "HD 224750", 6100.0),
        DataPoint::label("sptype", "HD 1835", "G2V"),
        DataPoint::measure("teff", "Sirius", 9940.0),
    ] {
        run.ingest(&point, &ctx).await?;
    }
    let mut flux = DataPoint::measure("flux", "Sirius", 1.0);
    flux.obs_time = Some(TimeValue::Jd { jd: 2_459_000.5 });
    run.ingest(&flux, &ctx).await?;

    h.catalog.datasets(h.db()).rebuild("survey").await?;
    Ok(())
}

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

#[tokio::test]
async fn test_table_with_and_without_nulls() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    survey(&h).await?;
    let query = h.catalog.query(h.db());

    let union = query
        .fetch_table("survey", &["teff", "sptype"], TableOptions::default())
        .await?;
    assert_eq!(union.columns, vec!["star", "teff", "sptype"]);
    assert_eq!(
        union.rows,
        vec![
            vec![text("* alf CMa"), CellValue::Number(9940.0), CellValue::Null],
            vec![text("HD 1835"), CellValue::Number(5800.0), text("G2V")],
            vec![text("HD 224750"), CellValue::Number(6100.0), CellValue::Null],
        ]
    );

    let complete = query
        .fetch_table(
            "survey",
            &["teff", "sptype"],
            TableOptions {
                include_nulls: false,
                include_errors: false,
            },
        )
        .await?;
    assert_eq!(complete.rows.len(), 1);
    assert_eq!(complete.rows[0][0], text("HD 1835"));
    Ok(())
}

#[tokio::test]
async fn test_table_error_columns_and_duplicates() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    survey(&h).await?;
    let query = h.catalog.query(h.db());

    let table = query
        .fetch_table(
            "survey",
            &["sptype", "teff", "sptype"],
            TableOptions {
                include_nulls: true,
                include_errors: true,
            },
        )
        .await?;
    // Labels carry no error columns
    assert_eq!(
        table.columns,
        vec!["star", "sptype", "teff", "teff_errlo", "teff_errhi"]
    );
    let hd1835 = table
        .rows
        .iter()
        .find(|row| row[0] == text("HD 1835"))
        .expect("HD 1835 row");
    assert_eq!(hd1835[3], CellValue::Number(50.0));
    assert_eq!(hd1835[4], CellValue::Number(70.0));

    let columns = query
        .fetch_columns("survey", &["teff"], TableOptions::default())
        .await?;
    assert_eq!(columns.len(), 2);
    assert_eq!(columns["teff"].len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_error_columns_follow_their_datatype() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    h.datatype("teff", "MEASURE", "K").await?;
    h.datatype("logg", "MEASURE", "dex").await?;
    let (source, reference) = insert_source(h.db(), "grid").await?;
    let ctx = IngestContext {
        source: EntityRef::Id(source.id),
        reference: EntityRef::Id(reference.id),
        instrument: None,
    };

    let measured = |datatype: &str, star: &str, val: f64, lo: f64, hi: f64| {
        let mut point = DataPoint::measure(datatype, star, val);
        point.errlo = Some(lo);
        point.errhi = Some(hi);
        point
    };
    let mut run = h.catalog.ingest_run(h.db(), true);
    for point in [
        measured("teff", "HD 1835", 5800.0, 50.0, 70.0),
        measured("logg", "HD 1835", 4.5, 0.25, 0.5),
        measured("teff", "Vega", 9600.0, 100.0, 120.0),
    ] {
        run.ingest(&point, &ctx).await?;
    }
    h.catalog.datasets(h.db()).rebuild("grid").await?;

    let options = TableOptions {
        include_nulls: true,
        include_errors: true,
    };
    let query = h.catalog.query(h.db());
    let table = query.fetch_table("grid", &["teff", "logg"], options).await?;
    assert_eq!(
        table.columns,
        vec!["star", "teff", "teff_errlo", "teff_errhi", "logg", "logg_errlo", "logg_errhi"]
    );
    let n = CellValue::Number;
    assert_eq!(
        table.rows,
        vec![
            vec![
                text("* alf Lyr"),
                n(9600.0),
                n(100.0),
                n(120.0),
                CellValue::Null,
                CellValue::Null,
                CellValue::Null,
            ],
            vec![text("HD 1835"), n(5800.0), n(50.0), n(70.0), n(4.5), n(0.25), n(0.5)],
        ]
    );

    let columns = query.fetch_columns("grid", &["teff", "logg"], options).await?;
    assert_eq!(columns["logg_errhi"], vec![CellValue::Null, n(0.5)]);
    assert_eq!(columns["teff_errlo"], vec![n(100.0), n(50.0)]);
    Ok(())
}

#[tokio::test]
async fn test_table_argument_errors() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    survey(&h).await?;
    let query = h.catalog.query(h.db());
    let none: [&str; 0] = [];

    assert!(matches!(
        query.fetch_table("survey", &none, TableOptions::default()).await,
        Err(CatalogError::MissingRequiredField { field: "datatypes", .. })
    ));
    assert!(matches!(
        query.fetch_table("survey", &["logg"], TableOptions::default()).await,
        Err(CatalogError::UnknownDatatype(_))
    ));
    assert!(matches!(
        query.fetch_table("survey", &["flux"], TableOptions::default()).await,
        Err(CatalogError::KindMismatch { .. })
    ));
    // Unknown datasets are just empty
    let empty = query
        .fetch_table("other", &["teff"], TableOptions::default())
        .await?;
    assert!(empty.rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_box_match_wraps_right_ascension() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    survey(&h).await?;
    let query = h.catalog.query(h.db());

    let near_zero = query
        .fetch_box_match("survey", &SkyCoord::new(0.1, 0.0)?, 1.0)
        .await?;
    let names: Vec<_> = near_zero.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["HD 224750"]);

    let sirius = query
        .fetch_box_match("survey", &SkyCoord::new(101.3, -16.7)?, 0.5)
        .await?;
    assert_eq!(sirius.len(), 1);
    assert_eq!(sirius[0].name, "* alf CMa");

    let wide = query
        .fetch_box_match("survey", &SkyCoord::new(3.0, -6.0)?, 20.0)
        .await?;
    assert_eq!(wide.len(), 2);

    assert!(query
        .fetch_box_match("other", &SkyCoord::new(0.1, 0.0)?, 1.0)
        .await?
        .is_empty());
    assert!(matches!(
        query
            .fetch_box_match("survey", &SkyCoord::new(0.1, 0.0)?, 0.0)
            .await,
        Err(CatalogError::InvalidCoordinate(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_fetch_data_carries_provenance() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    survey(&h).await?;

    let values = h.catalog.query(h.db()).fetch_data("teff").await?;
    assert_eq!(values.len(), 3);
    assert_eq!(values[0].star, "* alf CMa");
    assert!(values.iter().all(|v| v.reference == "survey paper"));
    assert!(values.iter().all(|v| v.origin_kind == "SURVEY"));
    assert!(values.iter().all(|v| v.instrument.is_none()));
    Ok(())
}

#[tokio::test]
async fn test_rebuild_is_idempotent() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    survey(&h).await?;
    let datasets = h.catalog.datasets(h.db());

    let first = datasets.rebuild("survey").await?;
    let second = datasets.rebuild("survey").await?;
    assert_eq!(first, second);
    // Timeseries are not properties and stay out of the dataset
    assert_eq!(second.mapped, 4);
    assert_eq!(h.test_db.count("dataset").await?, 1);
    assert_eq!(h.test_db.count("dataset_map").await?, 4);
    assert_eq!(
        second.dataset.description,
        "Dataset automatically generated from data source 'survey'"
    );

    assert!(matches!(
        datasets.rebuild("nowhere").await,
        Err(CatalogError::MissingData { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_delete_source_removes_derived_rows() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    survey(&h).await?;
    let (other, reference) = insert_source(h.db(), "other").await?;
    h.catalog
        .ingest_run(h.db(), true)
        .ingest(
            &DataPoint::measure("teff", "Vega", 9600.0),
            &IngestContext {
                source: EntityRef::Id(other.id),
                reference: EntityRef::Id(reference.id),
                instrument: None,
            },
        )
        .await?;

    let deletion = h.catalog.provenance(h.db()).delete_source("survey").await?;
    assert_eq!(deletion.sources, 1);
    assert_eq!(deletion.properties, 4);
    assert_eq!(deletion.timeseries, 1);
    assert_eq!(deletion.datasets, 1);

    assert_eq!(h.test_db.count("source").await?, 1);
    assert_eq!(h.test_db.count("property").await?, 1);
    assert_eq!(h.test_db.count("dat_teff").await?, 1);
    assert_eq!(h.test_db.count("dat_sptype").await?, 0);
    assert_eq!(h.test_db.count("dat_flux").await?, 0);
    assert_eq!(h.test_db.count("dataset").await?, 0);
    assert_eq!(h.test_db.count("dataset_map").await?, 0);
    // Stars outlive their sources
    assert_eq!(h.test_db.count("star").await?, 4);

    assert!(matches!(
        h.catalog.provenance(h.db()).delete_source("survey").await,
        Err(CatalogError::MissingData { .. })
    ));
    Ok(())
}
