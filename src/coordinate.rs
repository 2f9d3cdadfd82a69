use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers, used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Where a coordinate came from. Stored alongside the value so downstream
/// consumers can rank or display provenance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinateSource {
    Photo,
    CurrentDevice,
    MapClick,
    TextSearch,
    ManualEntry,
    AddressLookup,
}

/// A resolved geographic position in decimal degrees.
///
/// Constructed transiently by one of the resolver entry points and handed to
/// the caller; this crate never persists or mutates it afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<CoordinateSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Coordinate {
        Coordinate {
            lat,
            lng,
            accuracy_m: None,
            source: None,
            captured_at: None,
        }
    }

    pub fn with_source(mut self, source: CoordinateSource) -> Coordinate {
        self.source = Some(source);
        self
    }

    pub fn is_valid(&self) -> bool {
        validate_coordinate(self.lat, self.lng)
    }

    /// Exactly `(0, 0)` — the common "no GPS fix" sentinel. Not out of range,
    /// so `validate_coordinate` accepts it; call sites that treat it as
    /// missing data must check this explicitly.
    pub fn is_null_island(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    /// `"{lat}, {lng}"` with the given number of decimal places.
    pub fn format(&self, precision: usize) -> String {
        format_coordinate(self, precision)
    }
}

/// True iff both values are finite and within [-90, 90] / [-180, 180].
pub fn validate_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Great-circle distance between two points via the haversine formula.
pub fn haversine_distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

pub fn format_coordinate(coord: &Coordinate, precision: usize) -> String {
    format!(
        "{:.prec$}, {:.prec$}",
        coord.lat,
        coord.lng,
        prec = precision
    )
}
