//! External name authority
//!
//! Star identity comes from an astronomical name resolver. The default
//! implementation queries the SIMBAD TAP service with ADQL and reads the
//! JSON result format.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use stardb_core::{compress_space, NameAuthorityConfig};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::coords::SkyCoord;
use crate::error::{CatalogError, CatalogResult};

/// Descriptive record of an object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// Canonical identifier, whitespace-compressed
    pub main_id: String,
    /// Sexagesimal ICRS coordinates
    pub coord: String,
    pub ra: f64,
    pub dec: f64,
}

#[async_trait]
pub trait NameAuthority: Send + Sync {
    /// Every identifier of the object known as `name`, or `None` when the
    /// authority has never heard of it
    async fn lookup_ids(&self, name: &str) -> CatalogResult<Option<Vec<String>>>;

    /// Canonical identifier and coordinates of the object known as `name`
    async fn lookup_info(&self, name: &str) -> CatalogResult<Option<ObjectInfo>>;
}

/// SIMBAD TAP client
pub struct SimbadAuthority {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct TapColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TapResponse {
    metadata: Vec<TapColumn>,
    data: Vec<Vec<serde_json::Value>>,
}

impl TapResponse {
    fn column(&self, name: &str) -> Option<usize> {
        self.metadata
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Quote a string literal for ADQL
fn adql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn ids_query(name: &str) -> String {
    format!(
        "SELECT id2.id FROM ident AS id1 JOIN ident AS id2 USING(oidref) WHERE id1.id = {}",
        adql_literal(name)
    )
}

fn info_query(name: &str) -> String {
    format!(
        "SELECT basic.main_id, basic.ra, basic.dec FROM basic JOIN ident ON ident.oidref = basic.oid WHERE ident.id = {}",
        adql_literal(name)
    )
}

fn parse_ids(response: &TapResponse) -> Option<Vec<String>> {
    let col = response.column("id")?;
    let ids: Vec<String> = response
        .data
        .iter()
        .filter_map(|row| row.get(col).and_then(|v| v.as_str()))
        .map(compress_space)
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

fn parse_info(response: &TapResponse) -> CatalogResult<Option<ObjectInfo>> {
    let (Some(main_col), Some(ra_col), Some(dec_col)) = (
        response.column("main_id"),
        response.column("ra"),
        response.column("dec"),
    ) else {
        return Err(CatalogError::NameAuthority(
            "unexpected result columns".to_string(),
        ));
    };
    let Some(row) = response.data.first() else {
        return Ok(None);
    };
    let Some(main_id) = row.get(main_col).and_then(|v| v.as_str()) else {
        return Ok(None);
    };
    let main_id = compress_space(main_id);

    let ra = row.get(ra_col).and_then(|v| v.as_f64());
    let dec = row.get(dec_col).and_then(|v| v.as_f64());
    let (ra, dec) = match (ra, dec) {
        (Some(ra), Some(dec)) => (ra, dec),
        _ => {
            warn!("Name authority has no coordinates for '{}'", main_id);
            (0.0, 0.0)
        }
    };
    let coord = SkyCoord::new(ra, dec)?.to_sexagesimal();

    Ok(Some(ObjectInfo {
        main_id,
        coord,
        ra,
        dec,
    }))
}

impl SimbadAuthority {
    pub fn new(config: &NameAuthorityConfig) -> CatalogResult<Self> {
        let endpoint = Url::parse(&config.url).map_err(|e| {
            CatalogError::NameAuthority(format!("Invalid URL {}: {}", config.url, e))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CatalogError::NameAuthority(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, endpoint })
    }

    async fn query(&self, adql: &str) -> CatalogResult<TapResponse> {
        debug!("SIMBAD TAP query: {}", adql);

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[
                ("REQUEST", "doQuery"),
                ("LANG", "ADQL"),
                ("FORMAT", "json"),
                ("QUERY", adql),
            ])
            .send()
            .await
            .map_err(|e| CatalogError::NameAuthority(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::NameAuthority(format!(
                "SIMBAD returned status {}: {}",
                status, body
            )));
        }

        response
            .json::<TapResponse>()
            .await
            .map_err(|e| CatalogError::NameAuthority(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl NameAuthority for SimbadAuthority {
    async fn lookup_ids(&self, name: &str) -> CatalogResult<Option<Vec<String>>> {
        let response = self.query(&ids_query(&compress_space(name))).await?;
        Ok(parse_ids(&response))
    }

    async fn lookup_info(&self, name: &str) -> CatalogResult<Option<ObjectInfo>> {
        let response = self.query(&info_query(&compress_space(name))).await?;
        parse_info(&response)
    }
}
