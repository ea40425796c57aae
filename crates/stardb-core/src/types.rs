//! Shared type aliases

use chrono::{DateTime as ChronoDateTime, Utc};

/// Database DateTime type used across all StarDB crates
///
/// Every timestamp the catalog stores (source ingestion times, observation
/// instants, timeseries markers) is held in UTC.
pub type DBDateTime = ChronoDateTime<Utc>;

/// Standard UTC DateTime type used across all StarDB crates
pub type UtcDateTime = ChronoDateTime<Utc>;
