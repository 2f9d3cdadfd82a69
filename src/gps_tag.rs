//! Conversion of raw GPS tag values into decimal degrees.
//!
//! Location metadata arrives in several shapes depending on which reader
//! produced it: a plain decimal, a degrees/minutes/seconds triple (as numbers
//! or as EXIF rational pairs), a free-form string, or a wrapper exposing one
//! of those under a `value`/`description` field. Each shape is a [`RawGpsTag`]
//! variant and [`to_decimal_degrees`] is the single exhaustive conversion.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum RawGpsTag {
    /// Already in decimal degrees.
    Decimal(f64),
    /// Degrees, minutes, seconds as plain numbers. Trailing elements may be
    /// omitted and default to zero.
    Dms(Vec<f64>),
    /// Degrees, minutes, seconds as (numerator, denominator) pairs, the
    /// common EXIF encoding.
    DmsRational(Vec<(i64, i64)>),
    /// Free-form text, e.g. `47°15'42.72"` or `47 15 42.72` or `47.26187`.
    Text(String),
    /// A wrapper exposing the actual payload under `value` or `description`.
    Tagged {
        value: Option<Box<RawGpsTag>>,
        description: Option<Box<RawGpsTag>>,
    },
}

#[derive(Error, Debug)]
pub enum GpsTagError {
    #[error("unsupported GPS tag shape: {0}")]
    UnsupportedFormat(String),
    #[error("unparsable GPS string: {0:?}")]
    UnparsableString(String),
    #[error("GPS tag reduced to a non-finite value")]
    NonFinite,
}

/// Converts a raw GPS tag to signed decimal degrees.
///
/// A hemisphere reference whose first character is `S` or `W` negates the
/// magnitude; anything else (including no reference) leaves it unchanged.
/// Never returns a non-finite number. Range checking against ±90/±180 is the
/// caller's job via [`crate::validate_coordinate`].
pub fn to_decimal_degrees(
    tag: &RawGpsTag,
    hemisphere_ref: Option<&str>,
) -> Result<f64, GpsTagError> {
    let magnitude = convert_magnitude(tag)?;
    if !magnitude.is_finite() {
        return Err(GpsTagError::NonFinite);
    }
    Ok(apply_hemisphere(magnitude, hemisphere_ref))
}

fn convert_magnitude(tag: &RawGpsTag) -> Result<f64, GpsTagError> {
    match tag {
        RawGpsTag::Decimal(v) => Ok(*v),
        RawGpsTag::Tagged {
            value: Some(inner), ..
        } => match inner.as_ref() {
            // A wrapper inside a wrapper is not a known encoding.
            RawGpsTag::Tagged { .. } => Err(unsupported(tag)),
            other => convert_magnitude(other),
        },
        RawGpsTag::Tagged {
            value: None,
            description: Some(inner),
        } => match inner.as_ref() {
            RawGpsTag::Decimal(v) => Ok(*v),
            RawGpsTag::Text(s) => parse_gps_string(s),
            _ => Err(unsupported(tag)),
        },
        RawGpsTag::Tagged {
            value: None,
            description: None,
        } => Err(unsupported(tag)),
        RawGpsTag::DmsRational(parts) => dms_from_rationals(parts),
        RawGpsTag::Dms(parts) => dms_from_numbers(parts),
        RawGpsTag::Text(s) => parse_gps_string(s),
    }
}

fn dms_from_rationals(parts: &[(i64, i64)]) -> Result<f64, GpsTagError> {
    if parts.is_empty() || parts.len() > 3 {
        return Err(GpsTagError::UnsupportedFormat(format!("{parts:?}")));
    }
    let mut dms = [0.0; 3];
    for (slot, &(num, den)) in dms.iter_mut().zip(parts) {
        if den == 0 {
            return Err(GpsTagError::NonFinite);
        }
        *slot = num as f64 / den as f64;
    }
    Ok(combine_dms(dms[0], dms[1], dms[2]))
}

fn dms_from_numbers(parts: &[f64]) -> Result<f64, GpsTagError> {
    if parts.is_empty() || parts.len() > 3 {
        return Err(GpsTagError::UnsupportedFormat(format!("{parts:?}")));
    }
    let mut dms = [0.0; 3];
    dms[..parts.len()].copy_from_slice(parts);
    Ok(combine_dms(dms[0], dms[1], dms[2]))
}

fn combine_dms(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

// Degree symbol is required here so a bare "47 15" still falls through to the
// whitespace-token branch. "deg" is the exiftool spelling.
static DMS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)^\s*
        ([+-]?\d+(?:\.\d+)?)\s*(?:[°º]|deg)\s*
        (?:(\d+(?:\.\d+)?)\s*['′]\s*)?
        (?:(\d+(?:\.\d+)?)\s*["″]\s*)?
        $"#,
    )
    .expect("DMS pattern is a valid regex")
});

/// Parses a textual GPS value: a plain decimal first, then a `D° M' S"`
/// pattern, then up to three whitespace-separated numeric tokens.
fn parse_gps_string(raw: &str) -> Result<f64, GpsTagError> {
    let trimmed = raw.trim();

    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_finite() {
            return Ok(v);
        }
    }

    if let Some(caps) = DMS_PATTERN.captures(trimmed) {
        let part = |idx: usize| -> f64 {
            caps.get(idx)
                .map(|m| m.as_str().parse::<f64>().unwrap_or(0.0))
                .unwrap_or(0.0)
        };
        return Ok(combine_dms(part(1), part(2), part(3)));
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if (1..=3).contains(&tokens.len()) {
        let mut dms = [0.0; 3];
        let mut all_numeric = true;
        for (slot, token) in dms.iter_mut().zip(&tokens) {
            match token.parse::<f64>() {
                Ok(v) => *slot = v,
                Err(_) => {
                    all_numeric = false;
                    break;
                }
            }
        }
        if all_numeric {
            return Ok(combine_dms(dms[0], dms[1], dms[2]));
        }
    }

    Err(GpsTagError::UnparsableString(raw.to_string()))
}

fn apply_hemisphere(magnitude: f64, reference: Option<&str>) -> f64 {
    match reference.and_then(|r| r.trim().chars().next()) {
        Some('S') | Some('s') | Some('W') | Some('w') => -magnitude,
        _ => magnitude,
    }
}

fn unsupported(tag: &RawGpsTag) -> GpsTagError {
    GpsTagError::UnsupportedFormat(format!("{tag:?}"))
}
