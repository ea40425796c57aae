//! Sky coordinates in decimal degrees (ICRS)

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

fn is_separator(c: char) -> bool {
    c == ' ' || c == ':'
}

fn invalid(input: &str) -> CatalogError {
    CatalogError::InvalidCoordinate(input.to_string())
}

/// Parse `h m s`, `h:m:s` or a single number into its components
fn sexagesimal_parts(input: &str) -> CatalogResult<(f64, f64, f64, bool)> {
    let trimmed = input.trim();
    let negative = trimmed.starts_with('-');
    let unsigned = trimmed.trim_start_matches(|c| c == '+' || c == '-');
    let parts: Vec<f64> = unsigned
        .split(is_separator)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f64>().map_err(|_| invalid(input)))
        .collect::<CatalogResult<_>>()?;
    match parts.as_slice() {
        [a] => Ok((*a, 0.0, 0.0, negative)),
        [a, b] => Ok((*a, *b, 0.0, negative)),
        [a, b, c] => Ok((*a, *b, *c, negative)),
        _ => Err(invalid(input)),
    }
}

fn sexagesimal(input: &str) -> CatalogResult<f64> {
    let (a, b, c, negative) = sexagesimal_parts(input)?;
    let value = a + b / 60.0 + c / 3600.0;
    Ok(if negative { -value } else { value })
}

impl SkyCoord {
    pub fn new(ra_deg: f64, dec_deg: f64) -> CatalogResult<Self> {
        if !(0.0..360.0).contains(&ra_deg) || !(-90.0..=90.0).contains(&dec_deg) {
            return Err(CatalogError::InvalidCoordinate(format!(
                "ra={} dec={}",
                ra_deg, dec_deg
            )));
        }
        Ok(Self { ra_deg, dec_deg })
    }

    /// Parse right ascension and declination given separately. Values with
    /// more than one component are sexagesimal (RA in hours, declination in
    /// degrees); single numbers are decimal degrees.
    pub fn parse(ra: &str, dec: &str) -> CatalogResult<Self> {
        let ra_deg = if ra.trim().contains(is_separator) {
            sexagesimal(ra)? * 15.0
        } else {
            ra.trim().parse::<f64>().map_err(|_| invalid(ra))?
        };
        let dec_deg = if dec.trim().contains(is_separator) {
            sexagesimal(dec)?
        } else {
            dec.trim().parse::<f64>().map_err(|_| invalid(dec))?
        };
        Self::new(ra_deg, dec_deg)
    }

    /// Parse a combined coordinate: `"hh:mm:ss +dd:mm:ss"`,
    /// `"hh mm ss +dd mm ss"` or `"ra dec"` in decimal degrees.
    pub fn parse_pair(input: &str) -> CatalogResult<Self> {
        let fields: Vec<&str> = input.split_whitespace().collect();
        match fields.len() {
            2 => Self::parse(fields[0], fields[1]),
            6 => Self::parse(&fields[0..3].join(" "), &fields[3..6].join(" ")),
            _ => Err(invalid(input)),
        }
    }

    /// Sexagesimal form, `"hh mm ss.sss +dd mm ss.ss"`
    pub fn to_sexagesimal(&self) -> String {
        let hours = self.ra_deg / 15.0;
        let (h, m, s) = split_sexagesimal(hours, 3);
        let sign = if self.dec_deg < 0.0 { '-' } else { '+' };
        let (d, dm, ds) = split_sexagesimal(self.dec_deg.abs(), 2);
        format!(
            "{:02} {:02} {:06.3} {}{:02} {:02} {:05.2}",
            h, m, s, sign, d, dm, ds
        )
    }

    /// Whether `other` falls in the square box of side `side_deg` centered
    /// here. The RA half-width is widened by `1/cos(dec)` and wraps at 0/360.
    pub fn box_contains(&self, other: &SkyCoord, side_deg: f64) -> bool {
        let half = side_deg / 2.0;
        if (other.dec_deg - self.dec_deg).abs() > half {
            return false;
        }
        match ra_half_width(self.dec_deg, side_deg) {
            None => true,
            Some(half_ra) => {
                let diff = (other.ra_deg - self.ra_deg).rem_euclid(360.0);
                diff.min(360.0 - diff) <= half_ra
            }
        }
    }
}

/// RA half-width of a box in degrees, or `None` when the box spans every
/// right ascension
fn ra_half_width(dec_deg: f64, side_deg: f64) -> Option<f64> {
    let cos_dec = dec_deg.to_radians().cos();
    if cos_dec <= f64::EPSILON {
        return None;
    }
    let half_ra = side_deg / 2.0 / cos_dec;
    if half_ra >= 180.0 {
        None
    } else {
        Some(half_ra)
    }
}

fn split_sexagesimal(value: f64, decimals: i32) -> (u32, u32, f64) {
    let scale = 10f64.powi(decimals);
    let total = (value * 3600.0 * scale).round() / scale;
    let whole = total.trunc() as u64;
    let frac = total - whole as f64;
    let a = (whole / 3600) as u32;
    let b = ((whole % 3600) / 60) as u32;
    let c = (whole % 60) as f64 + frac;
    (a, b, c)
}
