//! Normalizes heterogeneous raw location inputs — EXIF GPS tags, device
//! fixes, free-text addresses, raw lat/lng pairs — into one canonical,
//! validated [`Coordinate`] in decimal degrees.
//!
//! Every entry point is a single-shot call with no shared mutable state:
//! [`photo::extract_location`] for image bytes, [`device::current_location`]
//! for a device fix, [`Geocoder::geocode`] / [`Geocoder::reverse`] for the
//! geocoding service, and [`gps_tag::to_decimal_degrees`] for raw tag values.

pub use cache::Cache;
pub use coordinate::{
    format_coordinate, haversine_distance_km, validate_coordinate, Coordinate, CoordinateSource,
};
pub use device::{current_location, DeviceLocationError, LocationProvider, PositionFix};
pub use geocode::{GeocodeError, Geocoder, GeocoderConfig, ResolvedAddress};
pub use gps_tag::{to_decimal_degrees, GpsTagError, RawGpsTag};
pub use photo::{extract_location, PhotoLocationError};

pub mod cache;
pub mod coordinate;
pub mod device;
pub mod geocode;
pub mod gps_tag;
pub mod photo;
