//! Extracts an embedded GPS location from image bytes.

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};
use log::debug;
use thiserror::Error;

use crate::coordinate::{Coordinate, CoordinateSource};
use crate::gps_tag::{self, GpsTagError, RawGpsTag};

#[derive(Error, Debug)]
pub enum PhotoLocationError {
    #[error("image metadata could not be read")]
    Metadata(#[from] exif::Error),
    /// Recoverable: the caller should prompt for another coordinate source.
    #[error("image has no embedded GPS location")]
    NoGpsData,
    #[error("failed to convert embedded GPS tags")]
    Conversion(#[from] GpsTagError),
    /// Conversion produced a number, but it is out of range or the `(0, 0)`
    /// no-fix sentinel.
    #[error("GPS tags decode to an unusable coordinate ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },
}

/// Reads the GPS latitude/longitude tags from the image's metadata and
/// converts them to a validated [`Coordinate`] tagged with
/// [`CoordinateSource::Photo`]. Pure over the supplied bytes.
pub fn extract_location(image_bytes: &[u8]) -> Result<Coordinate, PhotoLocationError> {
    let exif = Reader::new().read_from_container(&mut Cursor::new(image_bytes))?;

    let lat_tag = raw_tag(&exif, Tag::GPSLatitude).ok_or(PhotoLocationError::NoGpsData)?;
    let lng_tag = raw_tag(&exif, Tag::GPSLongitude).ok_or(PhotoLocationError::NoGpsData)?;
    let lat_ref = hemisphere(&exif, Tag::GPSLatitudeRef);
    let lng_ref = hemisphere(&exif, Tag::GPSLongitudeRef);

    let lat = gps_tag::to_decimal_degrees(&lat_tag, lat_ref.as_deref())?;
    let lng = gps_tag::to_decimal_degrees(&lng_tag, lng_ref.as_deref())?;

    let coord = Coordinate::new(lat, lng).with_source(CoordinateSource::Photo);
    if !coord.is_valid() || coord.is_null_island() {
        return Err(PhotoLocationError::InvalidCoordinates { lat, lng });
    }
    debug!("photo GPS resolved to {}", coord.format(6));
    Ok(coord)
}

fn raw_tag(exif: &exif::Exif, tag: Tag) -> Option<RawGpsTag> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(parts) => Some(RawGpsTag::DmsRational(
            parts
                .iter()
                .map(|r| (i64::from(r.num), i64::from(r.denom)))
                .collect(),
        )),
        Value::SRational(parts) => Some(RawGpsTag::DmsRational(
            parts
                .iter()
                .map(|r| (i64::from(r.num), i64::from(r.denom)))
                .collect(),
        )),
        // Some writers store coordinates as text; let the string parser try.
        _ => Some(RawGpsTag::Text(field.display_value().to_string())),
    }
}

fn hemisphere(exif: &exif::Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY)
        .map(|field| field.display_value().to_string())
}
