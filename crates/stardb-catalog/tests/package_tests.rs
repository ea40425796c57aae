mod common;

use common::{FakeAuthority, Harness};
use stardb_catalog::{CatalogError, CellValue, FailurePolicy, NewInstrument, TableOptions};
use stardb_datapkg::{open_package, DataReader};
use std::fs;

const INFO: &str = r#"{
    "reference": {"name": "Smith 2001", "bibline": "Smith, J. 2001, ApJ, 1, 1", "bibcode": "2001ApJ.....1....1S"},
    "origin": {"kind": "paper"},
    "instrument": {"name": "HIRES"},
    "sanity_check": {"exists_all_stars": ["teff"]}
}"#;

const PROPERTIES: &str = r#"{
    "defaults": {"teff": {"err": "2%"}},
    "properties": {
        "teff": [
            {"star": "HD 1835", "val": 5800},
            {"star": "HD 10700", "val": 5300, "err": 40}
        ],
        "sptype": [
            {"star": "HD 1835", "label": "G2V"}
        ]
    }
}"#;

#[tokio::test]
async fn test_package_ingestion_end_to_end() -> anyhow::Result<()> {
    let h = Harness::with_authority(
        FakeAuthority::new()
            .with_object("HD 1835", 5.8, -12.2, &["HD 1835", "* 9 Cet"])
            .with_object("* tau Cet", 26.0, -15.9, &["* tau Cet", "HD 10700"]),
    )
    .await?;
    h.datatype("teff", "MEASURE", "K").await?;
    h.datatype("sptype", "LABEL", "").await?;

    let dir = tempfile::tempdir()?;
    let pkg = dir.path().join("smith2001");
    fs::create_dir(&pkg)?;
    fs::write(pkg.join("info.json"), INFO)?;
    fs::write(pkg.join("properties.json"), PROPERTIES)?;
    let reader = open_package(&pkg)?;

    // The instrument has to be declared first
    let mut run = h.catalog.ingest_run(h.db(), true);
    assert!(matches!(
        run.ingest_package(&reader, FailurePolicy::Abort).await,
        Err(CatalogError::MissingData { .. })
    ));
    h.catalog
        .provenance(h.db())
        .insert_instrument(&NewInstrument::new(
            "HIRES",
            "High Resolution Echelle Spectrometer",
            "https://www2.keck.hawaii.edu/inst/hires/",
            "Keck I echelle spectrograph",
        )?)
        .await?;

    let mut run = h.catalog.ingest_run(h.db(), true);
    let (source, report) = run
        .ingest_package(&reader, FailurePolicy::Abort)
        .await?;
    assert_eq!(source.name, "smith2001");
    assert_eq!(report.data_points, 3);
    assert_eq!(report.stars, 2);
    assert_eq!(report.new_stars, 2);

    let tasks = reader.info().sanity_check.clone().unwrap_or_default();
    h.catalog.sanity(h.db()).run(&tasks, &source).await?;

    h.catalog.datasets(h.db()).rebuild("smith2001").await?;
    let table = h
        .catalog
        .query(h.db())
        .fetch_table(
            "smith2001",
            &["teff", "sptype"],
            TableOptions {
                include_nulls: true,
                include_errors: true,
            },
        )
        .await?;
    assert_eq!(table.rows.len(), 2);
    let tau_cet = &table.rows[0];
    assert_eq!(tau_cet[0], CellValue::Text("* tau Cet".to_string()));
    assert_eq!(tau_cet[2], CellValue::Number(40.0));
    assert!(tau_cet[4].is_null());
    let hd1835 = &table.rows[1];
    assert_eq!(hd1835[0], CellValue::Text("HD 1835".to_string()));
    assert_eq!(hd1835[2], CellValue::Number(116.0));
    assert_eq!(hd1835[4], CellValue::Text("G2V".to_string()));

    let data = h.catalog.query(h.db()).fetch_data("teff").await?;
    assert!(data.iter().all(|v| v.origin == "Smith 2001"));
    assert!(data.iter().all(|v| v.instrument.as_deref() == Some("HIRES")));

    // A source is ingested once
    let mut again = h.catalog.ingest_run(h.db(), true);
    assert!(matches!(
        again
            .ingest_package(&reader, FailurePolicy::Abort)
            .await,
        Err(CatalogError::Duplicate { .. })
    ));
    Ok(())
}
