use stardb_datapkg::{open_package, DataPkgError, DataReader, ErrValue, JsonDataReader};
use std::fs;
use tempfile::TempDir;

const INFO: &str = r#"{
    "reference": {"name": "Smith 2001", "bibline": "Smith, J. 2001, ApJ, 1, 1", "bibcode": "2001ApJ.....1....1S"},
    "origin": {"kind": "PAPER"},
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

fn package_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let pkg = dir.path().join("smith2001");
    fs::create_dir(&pkg).unwrap();
    fs::write(pkg.join("info.json"), INFO).unwrap();
    fs::write(pkg.join("properties.json"), PROPERTIES).unwrap();
    dir
}

#[test]
fn test_directory_package_metadata() {
    let dir = package_dir();
    let reader = JsonDataReader::from_dir(&dir.path().join("smith2001")).unwrap();

    assert_eq!(reader.source().name, "smith2001");
    assert_eq!(reader.source().kind, "FILE");
    assert_eq!(reader.source().version, None);
    assert_eq!(reader.info().origin.name.as_deref(), Some("Smith 2001"));
    assert_eq!(reader.info().instrument.as_ref().map(|i| i.name.as_str()), Some("HIRES"));
}

#[test]
fn test_defaults_fill_missing_keys_only() {
    let dir = package_dir();
    let reader = JsonDataReader::from_dir(&dir.path().join("smith2001")).unwrap();
    let points: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();

    assert_eq!(points.len(), 3);
    let teff: Vec<_> = points.iter().filter(|p| p.datatype == "teff").collect();
    assert_eq!(teff[0].err, Some(ErrValue::Text("2%".to_string())));
    assert_eq!(teff[1].err, Some(ErrValue::Absolute(40.0)));

    let sptype = points.iter().find(|p| p.datatype == "sptype").unwrap();
    assert_eq!(sptype.label.as_deref(), Some("G2V"));
    assert_eq!(sptype.err, None);
}

#[test]
fn test_records_are_restartable() {
    let dir = package_dir();
    let reader = JsonDataReader::from_dir(&dir.path().join("smith2001")).unwrap();
    let first: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    let second: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_single_file_package() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("solar.json");
    fs::write(
        &file,
        r#"{
            "reference": {"name": "IAU 2015", "bibline": "IAU Resolution B3", "bibcode": "2015arXiv151007674M"},
            "origin": {"name": "IAU", "kind": "standard"},
            "properties": {"teff": [{"star": "Sun", "val": 5772}]}
        }"#,
    )
    .unwrap();

    let reader = open_package(&file).unwrap();
    assert_eq!(reader.source().name, "solar");
    assert_eq!(reader.info().origin.name.as_deref(), Some("IAU"));
    assert_eq!(reader.records().count(), 1);
}

#[test]
fn test_bad_point_reports_position() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("broken.json");
    fs::write(
        &file,
        r#"{
            "reference": {"name": "r", "bibline": "b", "bibcode": "c"},
            "origin": {"name": "o", "kind": "survey"},
            "properties": {"teff": [{"star": "Sun", "val": 1}, {"val": 2}]}
        }"#,
    )
    .unwrap();

    let reader = open_package(&file).unwrap();
    let results: Vec<_> = reader.records().collect();
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(DataPkgError::InvalidPoint { index: 1, .. })
    ));
}

#[test]
fn test_missing_info_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        JsonDataReader::from_dir(dir.path()),
        Err(DataPkgError::Io { .. })
    ));
}

#[test]
fn test_non_paper_origin_requires_name() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("anon.json");
    fs::write(
        &file,
        r#"{
            "reference": {"name": "r", "bibline": "b", "bibcode": "c"},
            "origin": {"kind": "survey"},
            "properties": {}
        }"#,
    )
    .unwrap();
    assert!(matches!(
        open_package(&file),
        Err(DataPkgError::MissingField { .. })
    ));
}
