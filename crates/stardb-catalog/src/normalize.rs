//! Measurement Normalizer
//!
//! Pure functions turning the error and time forms accepted on input into
//! the single shape stored in per-datatype tables. Times are canonicalized
//! to UTC; Julian dates are converted on the UTC scale without leap-second
//! corrections.

use chrono::{DateTime, NaiveDateTime, Utc};
use stardb_datapkg::{DataPoint, ErrValue, TimeValue};

use crate::error::{CatalogError, CatalogResult};

/// Julian date of the Unix epoch
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Offset between Julian and modified Julian dates
const MJD_OFFSET: f64 = 2_400_000.5;
/// Julian date of epoch J2000.0
const J2000_JD: f64 = 2_451_545.0;
const DAYS_PER_JULIAN_YEAR: f64 = 365.25;
const MICROS_PER_DAY: f64 = 86_400_000_000.0;
/// Tolerance when a duration is given alongside an explicit range
const DURATION_TOLERANCE_SECS: f64 = 1e-3;

/// Error fields of one input datum
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorInput<'a> {
    pub err: Option<&'a ErrValue>,
    pub errlo: Option<f64>,
    pub errhi: Option<f64>,
    pub errbounds: Option<(f64, f64)>,
}

impl<'a> ErrorInput<'a> {
    pub fn from_point(point: &'a DataPoint) -> Self {
        Self {
            err: point.err.as_ref(),
            errlo: point.errlo,
            errhi: point.errhi,
            errbounds: point.errbounds,
        }
    }
}

/// Stored error shape: magnitudes below/above the value and the closed
/// interval they describe
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErrorBounds {
    pub errlo: Option<f64>,
    pub errhi: Option<f64>,
    pub bound_lo: Option<f64>,
    pub bound_hi: Option<f64>,
}

fn error_magnitude(val: Option<f64>, err: &ErrValue) -> CatalogResult<f64> {
    let magnitude = match err {
        ErrValue::Absolute(e) => *e,
        ErrValue::Text(text) => {
            let text = text.trim();
            match text.strip_suffix('%') {
                Some(percent) => {
                    let percent: f64 = percent
                        .trim()
                        .parse()
                        .map_err(|_| CatalogError::InvalidErrorRepresentation(text.to_string()))?;
                    let val = val.ok_or(CatalogError::MissingRequiredField {
                        operation: "normalize_error",
                        field: "val",
                    })?;
                    val.abs() * percent / 100.0
                }
                None => text
                    .parse()
                    .map_err(|_| CatalogError::InvalidErrorRepresentation(text.to_string()))?,
            }
        }
    };
    if !magnitude.is_finite() || magnitude < 0.0 {
        return Err(CatalogError::InvalidErrorRepresentation(format!(
            "{:?}",
            err
        )));
    }
    Ok(magnitude)
}

/// Canonicalize the error representation of a datum with value `val`
///
/// A symmetric `err`, absolute or percent of `|val|`, becomes equal
/// `errlo`/`errhi`. Without explicit `errbounds`, the interval
/// `[val - errlo, val + errhi]` is derived when both sides are known.
/// `err` may not be combined with `errlo`/`errhi`.
pub fn normalize_error(val: Option<f64>, input: &ErrorInput<'_>) -> CatalogResult<ErrorBounds> {
    if input.err.is_some() && (input.errlo.is_some() || input.errhi.is_some()) {
        return Err(CatalogError::AmbiguousError);
    }

    let (errlo, errhi) = match input.err {
        Some(err) => {
            let e = error_magnitude(val, err)?;
            (Some(e), Some(e))
        }
        None => (input.errlo, input.errhi),
    };

    let (bound_lo, bound_hi) = match (input.errbounds, val, errlo, errhi) {
        (Some((lo, hi)), _, _, _) => {
            if lo > hi {
                return Err(CatalogError::InvalidErrorRepresentation(format!(
                    "errbounds [{}, {}] is reversed",
                    lo, hi
                )));
            }
            (Some(lo), Some(hi))
        }
        (None, Some(v), Some(lo), Some(hi)) => (Some(v - lo), Some(v + hi)),
        _ => (None, None),
    };

    Ok(ErrorBounds {
        errlo,
        errhi,
        bound_lo,
        bound_hi,
    })
}

/// Time fields of one input datum
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeInput<'a> {
    pub obs_time: Option<&'a TimeValue>,
    /// Seconds
    pub obs_duration: Option<f64>,
    pub obs_start: Option<&'a TimeValue>,
    pub obs_end: Option<&'a TimeValue>,
}

impl<'a> TimeInput<'a> {
    pub fn from_point(point: &'a DataPoint) -> Self {
        Self {
            obs_time: point.obs_time.as_ref(),
            obs_duration: point.obs_duration,
            obs_start: point.obs_start.as_ref(),
            obs_end: point.obs_end.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.obs_time.is_none()
            && self.obs_duration.is_none()
            && self.obs_start.is_none()
            && self.obs_end.is_none()
    }
}

/// Stored observation time: instant, duration and the range they span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationTime {
    pub instant: DateTime<Utc>,
    /// Seconds
    pub duration: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn invalid_time(message: impl Into<String>) -> CatalogError {
    CatalogError::InvalidTimeRepresentation(message.into())
}

fn from_julian_date(jd: f64) -> CatalogResult<DateTime<Utc>> {
    if !jd.is_finite() {
        return Err(invalid_time(format!("non-finite Julian date {}", jd)));
    }
    let micros = ((jd - UNIX_EPOCH_JD) * MICROS_PER_DAY).round();
    DateTime::from_timestamp_micros(micros as i64)
        .ok_or_else(|| invalid_time(format!("Julian date {} out of range", jd)))
}

/// Convert one input time to UTC
pub fn parse_time(value: &TimeValue) -> CatalogResult<DateTime<Utc>> {
    match value {
        TimeValue::Text(text) => {
            let text = text.trim();
            if let Ok(t) = DateTime::parse_from_rfc3339(text) {
                return Ok(t.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(|| invalid_time(format!("'{}' is not an ISO 8601 timestamp", text)))
        }
        TimeValue::Jd { jd } => from_julian_date(*jd),
        TimeValue::Mjd { mjd } => from_julian_date(mjd + MJD_OFFSET),
        TimeValue::JulianYear { jyear } => {
            from_julian_date(J2000_JD + (jyear - 2000.0) * DAYS_PER_JULIAN_YEAR)
        }
        TimeValue::Other(raw) => Err(invalid_time(format!(
            "{} is not an absolute time; use an ISO timestamp or {{\"jd\"|\"mjd\"|\"jyear\": value}}",
            raw
        ))),
    }
}

fn duration_micros(seconds: f64) -> CatalogResult<chrono::Duration> {
    let micros = (seconds * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return Err(invalid_time(format!("duration {}s is out of range", seconds)));
    }
    Ok(chrono::Duration::microseconds(micros as i64))
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    delta.num_microseconds().map_or(delta.num_milliseconds() as f64 / 1e3, |us| us as f64 / 1e6)
}

/// Canonicalize the observation time of a datum
///
/// Either an instant with an optional duration, or an explicit start/end
/// range, must be given. The missing members are derived; the instant of a
/// range is its midpoint. Returns `None` when the datum carries no time.
pub fn normalize_time(input: &TimeInput<'_>) -> CatalogResult<Option<ObservationTime>> {
    if input.is_empty() {
        return Ok(None);
    }
    if let Some(d) = input.obs_duration {
        if !d.is_finite() || d < 0.0 {
            return Err(invalid_time(format!("duration {} must be non-negative", d)));
        }
    }

    let instant = input.obs_time.map(parse_time).transpose()?;
    let range = match (input.obs_start, input.obs_end) {
        (Some(start), Some(end)) => {
            let (start, end) = (parse_time(start)?, parse_time(end)?);
            if end < start {
                return Err(invalid_time(format!(
                    "observation ends ({}) before it starts ({})",
                    end, start
                )));
            }
            Some((start, end))
        }
        (None, None) => None,
        _ => return Err(invalid_time("observation range needs both start and end")),
    };

    let time = match (instant, range) {
        (Some(instant), None) => {
            let duration = input.obs_duration.unwrap_or(0.0);
            let half = duration_micros(duration / 2.0)?;
            let out_of_range = || {
                invalid_time(format!(
                    "duration {}s around {} is out of range",
                    duration, instant
                ))
            };
            ObservationTime {
                instant,
                duration,
                start: instant.checked_sub_signed(half).ok_or_else(out_of_range)?,
                end: instant.checked_add_signed(half).ok_or_else(out_of_range)?,
            }
        }
        (instant, Some((start, end))) => {
            let duration = seconds_between(start, end);
            if let Some(given) = input.obs_duration {
                if (given - duration).abs() > DURATION_TOLERANCE_SECS {
                    return Err(invalid_time(format!(
                        "duration {}s disagrees with range of {}s",
                        given, duration
                    )));
                }
            }
            let midpoint = start + (end - start) / 2;
            let instant = instant.unwrap_or(midpoint);
            if instant < start || instant > end {
                return Err(invalid_time(format!(
                    "instant {} lies outside its range",
                    instant
                )));
            }
            ObservationTime {
                instant,
                duration,
                start,
                end,
            }
        }
        (None, None) => return Err(invalid_time("duration given without an observation time")),
    };
    Ok(Some(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn text(s: &str) -> TimeValue {
        TimeValue::Text(s.to_string())
    }

    #[test]
    fn test_percent_error() {
        let err = ErrValue::Text("10%".to_string());
        let bounds = normalize_error(
            Some(5778.0),
            &ErrorInput {
                err: Some(&err),
                ..Default::default()
            },
        )
        .unwrap();
        let e = 5778.0 * 10.0 / 100.0;
        assert_eq!(bounds.errlo, Some(e));
        assert_eq!(bounds.errhi, bounds.errlo);
        assert_eq!(bounds.bound_lo, Some(5778.0 - e));
        assert_eq!(bounds.bound_hi, Some(5778.0 + e));
    }

    #[test]
    fn test_percent_of_negative_value_uses_magnitude() {
        let err = ErrValue::Text("5 %".to_string());
        let bounds = normalize_error(
            Some(-2.0),
            &ErrorInput {
                err: Some(&err),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bounds.errlo, Some(0.1));
        assert_eq!(bounds.errlo, bounds.errhi);
    }

    #[test]
    fn test_absolute_and_numeric_string_errors() {
        for err in [ErrValue::Absolute(40.0), ErrValue::Text("40".to_string())] {
            let bounds = normalize_error(
                Some(5300.0),
                &ErrorInput {
                    err: Some(&err),
                    ..Default::default()
                },
            )
            .unwrap();
            assert_eq!(bounds.errlo, Some(40.0));
            assert_eq!(bounds.errhi, Some(40.0));
        }
    }

    #[test]
    fn test_asymmetric_errors_derive_interval() {
        let bounds = normalize_error(
            Some(10.0),
            &ErrorInput {
                errlo: Some(1.0),
                errhi: Some(3.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bounds.bound_lo, Some(9.0));
        assert_eq!(bounds.bound_hi, Some(13.0));
    }

    #[test]
    fn test_explicit_bounds_are_kept() {
        let bounds = normalize_error(
            Some(10.0),
            &ErrorInput {
                errlo: Some(1.0),
                errhi: Some(3.0),
                errbounds: Some((8.0, 20.0)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bounds.bound_lo, Some(8.0));
        assert_eq!(bounds.bound_hi, Some(20.0));
    }

    #[test]
    fn test_one_sided_error_has_no_interval() {
        let bounds = normalize_error(
            Some(10.0),
            &ErrorInput {
                errhi: Some(3.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bounds.errhi, Some(3.0));
        assert_eq!(bounds.bound_lo, None);
    }

    #[test]
    fn test_err_with_lo_hi_is_ambiguous() {
        let err = ErrValue::Absolute(1.0);
        assert!(matches!(
            normalize_error(
                Some(1.0),
                &ErrorInput {
                    err: Some(&err),
                    errlo: Some(1.0),
                    ..Default::default()
                }
            ),
            Err(CatalogError::AmbiguousError)
        ));
    }

    #[test]
    fn test_bad_error_text() {
        for bad in ["ten percent", "x%", "-3"] {
            let err = ErrValue::Text(bad.to_string());
            assert!(matches!(
                normalize_error(
                    Some(1.0),
                    &ErrorInput {
                        err: Some(&err),
                        ..Default::default()
                    }
                ),
                Err(CatalogError::InvalidErrorRepresentation(_))
            ));
        }
    }

    #[test]
    fn test_percent_needs_value() {
        let err = ErrValue::Text("10%".to_string());
        assert!(matches!(
            normalize_error(
                None,
                &ErrorInput {
                    err: Some(&err),
                    ..Default::default()
                }
            ),
            Err(CatalogError::MissingRequiredField { field: "val", .. })
        ));
    }

    #[test]
    fn test_julian_forms_agree() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_time(&TimeValue::Jd { jd: 2_451_545.0 }).unwrap(), j2000);
        assert_eq!(parse_time(&TimeValue::Mjd { mjd: 51_544.5 }).unwrap(), j2000);
        assert_eq!(
            parse_time(&TimeValue::JulianYear { jyear: 2000.0 }).unwrap(),
            j2000
        );
        assert_eq!(
            parse_time(&TimeValue::Mjd { mjd: 40_587.0 }).unwrap(),
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[test]
    fn test_iso_forms() {
        let t = Utc.with_ymd_and_hms(2010, 6, 1, 3, 4, 5).unwrap();
        assert_eq!(parse_time(&text("2010-06-01T03:04:05Z")).unwrap(), t);
        assert_eq!(parse_time(&text("2010-06-01T05:04:05+02:00")).unwrap(), t);
        assert_eq!(parse_time(&text("2010-06-01T03:04:05")).unwrap(), t);
        assert_eq!(parse_time(&text("2010-06-01 03:04:05")).unwrap(), t);
    }

    #[test]
    fn test_rejects_non_absolute_times() {
        for value in [
            text("yesterday"),
            text("2010-06-01"),
            TimeValue::Other(serde_json::json!(2455000.5)),
        ] {
            assert!(matches!(
                parse_time(&value),
                Err(CatalogError::InvalidTimeRepresentation(_))
            ));
        }
    }

    #[test]
    fn test_instant_and_duration_derive_range() {
        let t = text("2010-06-01T00:00:00Z");
        let time = normalize_time(&TimeInput {
            obs_time: Some(&t),
            obs_duration: Some(600.0),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        assert_eq!(time.duration, 600.0);
        assert_eq!(time.end - time.start, chrono::Duration::seconds(600));
        assert_eq!(time.instant - time.start, chrono::Duration::seconds(300));
    }

    #[test]
    fn test_huge_duration_is_rejected() {
        let t = text("2010-06-01T00:00:00Z");
        // Too many microseconds for a TimeDelta, then a span past the calendar
        for duration in [1e18, 1.8e13] {
            let result = normalize_time(&TimeInput {
                obs_time: Some(&t),
                obs_duration: Some(duration),
                ..Default::default()
            });
            assert!(
                matches!(result, Err(CatalogError::InvalidTimeRepresentation(_))),
                "{} should be rejected",
                duration
            );
        }
    }

    #[test]
    fn test_bare_instant_has_zero_duration() {
        let t = text("2010-06-01T00:00:00Z");
        let time = normalize_time(&TimeInput {
            obs_time: Some(&t),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        assert_eq!(time.duration, 0.0);
        assert_eq!(time.start, time.instant);
        assert_eq!(time.end, time.instant);
    }

    #[test]
    fn test_range_derives_instant_and_duration() {
        let (start, end) = (text("2010-06-01T00:00:00Z"), text("2010-06-01T01:00:00Z"));
        let time = normalize_time(&TimeInput {
            obs_start: Some(&start),
            obs_end: Some(&end),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        assert_eq!(time.duration, 3600.0);
        assert_eq!(
            time.instant,
            Utc.with_ymd_and_hms(2010, 6, 1, 0, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_range_errors() {
        let (start, end) = (text("2010-06-01T01:00:00Z"), text("2010-06-01T00:00:00Z"));
        assert!(normalize_time(&TimeInput {
            obs_start: Some(&start),
            obs_end: Some(&end),
            ..Default::default()
        })
        .is_err());
        assert!(normalize_time(&TimeInput {
            obs_start: Some(&start),
            ..Default::default()
        })
        .is_err());
        assert!(normalize_time(&TimeInput {
            obs_duration: Some(5.0),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_no_time_is_none() {
        assert_eq!(normalize_time(&TimeInput::default()).unwrap(), None);
    }
}
