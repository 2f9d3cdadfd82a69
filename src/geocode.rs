//! Forward and reverse geocoding against a Nominatim-compatible service.
//!
//! One outbound request per call, no internal retries. Forward lookups fail
//! explicitly; reverse lookups are display-string enrichment only and degrade
//! to `None`.

use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

use crate::cache::Cache;
use crate::coordinate::{validate_coordinate, Coordinate, CoordinateSource};

/// Explicit service configuration; the library never reads ambient
/// environment state.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    /// Sent on every request. Nominatim's usage policy requires an
    /// identifying agent, so there is no anonymous default.
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> GeocoderConfig {
        GeocoderConfig {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("whereabouts/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    /// Caller-side check; no request is issued.
    #[error("address is empty")]
    EmptyAddress,
    /// Service reached, zero candidates. Recoverable by refining the query.
    #[error("no match for the given address")]
    AddressNotFound,
    #[error("geocoding service error")]
    Service(#[from] reqwest::Error),
    #[error("invalid geocoder configuration: {0}")]
    Config(String),
    #[error("service returned an out-of-range coordinate ({lat}, {lng})")]
    InvalidResult { lat: f64, lng: f64 },
}

/// A forward-geocoding hit: the coordinate plus the service's normalized
/// display address.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAddress {
    pub coordinate: Coordinate,
    pub display_name: Option<String>,
}

pub struct Geocoder {
    client: Client,
    config: GeocoderConfig,
    cache: Option<Cache>,
}

impl Geocoder {
    pub fn new(config: GeocoderConfig) -> Result<Geocoder, GeocodeError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Geocoder {
            client,
            config,
            cache: None,
        })
    }

    /// Attaches a response cache for forward lookups.
    pub fn with_cache(mut self, cache: Cache) -> Geocoder {
        self.cache = Some(cache);
        self
    }

    /// Resolves a free-text address to its highest-confidence coordinate.
    pub fn geocode(&self, address: &str) -> Result<ResolvedAddress, GeocodeError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }

        let json = match self.cache.as_ref().and_then(|c| c.read(address)) {
            Some(json) => json,
            None => {
                debug!("address cache miss, querying service for {address:?}");
                let json = self.request(
                    "search",
                    &[("q", address), ("format", "geojson"), ("limit", "1")],
                )?;
                if let Some(cache) = &self.cache {
                    cache.write(address, &json);
                }
                json
            }
        };

        resolve_search_json(&json)
    }

    /// Best-effort reverse lookup of a human-readable address. Logs and
    /// returns `None` on any failure; never blocks the primary flow.
    pub fn reverse(&self, coord: &Coordinate) -> Option<String> {
        let lat = format!("{:.7}", coord.lat);
        let lon = format!("{:.7}", coord.lng);
        let result = self.request(
            "reverse",
            &[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "geojson")],
        );
        match result {
            Ok(json) => display_name(&json),
            Err(e) => {
                warn!("reverse geocoding of {} failed: {e}", coord.format(6));
                None
            }
        }
    }

    fn request(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, GeocodeError> {
        let base = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let url = Url::parse_with_params(&base, params)
            .map_err(|e| GeocodeError::Config(format!("bad base URL {base:?}: {e}")))?;

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .send()?
            .error_for_status()?;
        Ok(response.json::<Value>()?)
    }
}

/// Decodes a Nominatim GeoJSON search response, taking the first (highest
/// confidence) feature.
fn resolve_search_json(json: &Value) -> Result<ResolvedAddress, GeocodeError> {
    let feature = match json["features"].get(0) {
        Some(feature) => feature,
        None => return Err(GeocodeError::AddressNotFound),
    };

    // GeoJSON order is [lng, lat]
    let coords = &feature["geometry"]["coordinates"];
    let (lng, lat) = match (coords[0].as_f64(), coords[1].as_f64()) {
        (Some(lng), Some(lat)) => (lng, lat),
        _ => return Err(GeocodeError::AddressNotFound),
    };
    if !validate_coordinate(lat, lng) {
        return Err(GeocodeError::InvalidResult { lat, lng });
    }

    Ok(ResolvedAddress {
        coordinate: Coordinate::new(lat, lng).with_source(CoordinateSource::AddressLookup),
        display_name: feature["properties"]["display_name"]
            .as_str()
            .map(str::to_string),
    })
}

fn display_name(json: &Value) -> Option<String> {
    json["features"][0]["properties"]["display_name"]
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_response() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {
                        "place_id": 304848284,
                        "addresstype": "county",
                        "name": "Yellowstone County",
                        "display_name": "Yellowstone County, Montana, United States"
                    },
                    "geometry": {
                        "type": "Point",
                        "coordinates": [-108.276076, 45.9645464]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {
                        "place_id": 347170371,
                        "addresstype": "village",
                        "name": "Summer Village of Yellowstone",
                        "display_name": "Summer Village of Yellowstone, Alberta, Canada"
                    },
                    "geometry": {
                        "type": "Point",
                        "coordinates": [-114.3807141, 53.7335433]
                    }
                }
            ]
        })
    }

    #[test]
    fn first_feature_wins() {
        let resolved = resolve_search_json(&search_response()).unwrap();

        assert_eq!(resolved.coordinate.lat, 45.9645464);
        assert_eq!(resolved.coordinate.lng, -108.276076);
        assert_eq!(
            resolved.coordinate.source,
            Some(CoordinateSource::AddressLookup)
        );
        assert_eq!(
            resolved.display_name.as_deref(),
            Some("Yellowstone County, Montana, United States")
        );
    }

    #[test]
    fn empty_feature_set_is_not_found() {
        let err = resolve_search_json(&json!({"features": []})).unwrap_err();
        assert!(matches!(err, GeocodeError::AddressNotFound));
    }

    #[test]
    fn missing_features_key_is_not_found() {
        let err = resolve_search_json(&json!({})).unwrap_err();
        assert!(matches!(err, GeocodeError::AddressNotFound));
    }

    #[test]
    fn out_of_range_result_is_rejected() {
        let json = json!({
            "features": [{
                "properties": {"display_name": "nowhere"},
                "geometry": {"type": "Point", "coordinates": [181.0, 12.0]}
            }]
        });
        let err = resolve_search_json(&json).unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::InvalidResult { lat, lng } if lat == 12.0 && lng == 181.0
        ));
    }

    #[test]
    fn reverse_display_name_decoding() {
        let json = json!({
            "features": [{
                "properties": {"display_name": "Yellowstone County, Montana, United States"},
                "geometry": {"type": "Point", "coordinates": [-108.276076, 45.9645464]}
            }]
        });
        assert_eq!(
            display_name(&json).as_deref(),
            Some("Yellowstone County, Montana, United States")
        );
        // Nominatim reports unresolvable points as an error object
        assert_eq!(display_name(&json!({"error": "Unable to geocode"})), None);
    }

    #[test]
    fn blank_address_fails_before_any_request() {
        let geocoder = Geocoder::new(GeocoderConfig::default()).unwrap();
        for address in ["", "   ", "\t\n"] {
            let err = geocoder.geocode(address).unwrap_err();
            assert!(matches!(err, GeocodeError::EmptyAddress), "{address:?}");
        }
    }
}
