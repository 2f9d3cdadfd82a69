//! Single-shot position fixes from the host device's location service.
//!
//! The platform service sits behind [`LocationProvider`] so the resolution
//! policy (cached-fix reuse, timeout) is testable without real hardware.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use thiserror::Error;

use crate::coordinate::{validate_coordinate, Coordinate, CoordinateSource};

/// A raw fix as reported by the device.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

/// The three distinct failure reasons; callers map each to its own
/// user-facing message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceLocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    Unavailable,
    #[error("location request timed out")]
    TimedOut,
}

/// Seam for the platform location service.
pub trait LocationProvider: Send + Sync {
    /// Last known fix, if the platform keeps one.
    fn cached_fix(&self) -> Option<PositionFix>;

    /// Blocks until a fresh fix is available or the platform reports a
    /// failure. The caller enforces the timeout.
    fn request_fix(&self, high_accuracy: bool) -> Result<PositionFix, DeviceLocationError>;
}

/// Obtains one position fix, preferring a cached fix no older than `max_age`
/// and otherwise requesting a fresh high-accuracy one bounded by `timeout`.
///
/// Resolves to [`DeviceLocationError::TimedOut`] when the deadline passes;
/// never blocks past it.
pub fn current_location(
    provider: Arc<dyn LocationProvider>,
    timeout: Duration,
    max_age: Duration,
) -> Result<Coordinate, DeviceLocationError> {
    if let Some(fix) = provider.cached_fix() {
        if fix_age(&fix).map_or(false, |age| age <= max_age) {
            debug!("using cached device fix from {}", fix.captured_at);
            return fix_to_coordinate(fix);
        }
        debug!("cached device fix is stale, requesting a fresh one");
    }

    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(&provider);
    thread::spawn(move || {
        // The receiver may be gone after a timeout; nothing to do then.
        let _ = tx.send(worker.request_fix(true));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(fix)) => fix_to_coordinate(fix),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(DeviceLocationError::TimedOut),
    }
}

/// Age of the fix, or `None` when its timestamp lies in the future.
fn fix_age(fix: &PositionFix) -> Option<Duration> {
    Utc::now()
        .signed_duration_since(fix.captured_at)
        .to_std()
        .ok()
}

fn fix_to_coordinate(fix: PositionFix) -> Result<Coordinate, DeviceLocationError> {
    if !validate_coordinate(fix.lat, fix.lng) {
        warn!("device reported an invalid fix ({}, {})", fix.lat, fix.lng);
        return Err(DeviceLocationError::Unavailable);
    }
    Ok(Coordinate {
        lat: fix.lat,
        lng: fix.lng,
        accuracy_m: fix.accuracy_m,
        source: Some(CoordinateSource::CurrentDevice),
        captured_at: Some(fix.captured_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    struct FakeProvider {
        cached: Option<PositionFix>,
        fresh: Result<PositionFix, DeviceLocationError>,
    }

    impl LocationProvider for FakeProvider {
        fn cached_fix(&self) -> Option<PositionFix> {
            self.cached.clone()
        }

        fn request_fix(&self, _high_accuracy: bool) -> Result<PositionFix, DeviceLocationError> {
            self.fresh.clone()
        }
    }

    /// Never answers; exercises the timeout path.
    struct StalledProvider;

    impl LocationProvider for StalledProvider {
        fn cached_fix(&self) -> Option<PositionFix> {
            None
        }

        fn request_fix(&self, _high_accuracy: bool) -> Result<PositionFix, DeviceLocationError> {
            thread::sleep(Duration::from_secs(30));
            Err(DeviceLocationError::Unavailable)
        }
    }

    fn fix(lat: f64, lng: f64, age: ChronoDuration) -> PositionFix {
        PositionFix {
            lat,
            lng,
            accuracy_m: Some(12.0),
            captured_at: Utc::now() - age,
        }
    }

    #[test]
    fn fresh_cached_fix_is_used_without_a_request() {
        let provider = Arc::new(FakeProvider {
            cached: Some(fix(48.8566, 2.3522, ChronoDuration::seconds(5))),
            // Would fail if the request path were taken
            fresh: Err(DeviceLocationError::Unavailable),
        });

        let coord = current_location(
            provider,
            Duration::from_millis(100),
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(coord.lat, 48.8566);
        assert_eq!(coord.source, Some(CoordinateSource::CurrentDevice));
        assert_eq!(coord.accuracy_m, Some(12.0));
        assert!(coord.captured_at.is_some());
    }

    #[test]
    fn stale_cached_fix_triggers_a_fresh_request() {
        let provider = Arc::new(FakeProvider {
            cached: Some(fix(1.0, 1.0, ChronoDuration::hours(3))),
            fresh: Ok(fix(48.8566, 2.3522, ChronoDuration::zero())),
        });

        let coord = current_location(
            provider,
            Duration::from_millis(500),
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(coord.lat, 48.8566);
        assert_eq!(coord.lng, 2.3522);
    }

    #[test]
    fn permission_denied_is_surfaced_distinctly() {
        let provider = Arc::new(FakeProvider {
            cached: None,
            fresh: Err(DeviceLocationError::PermissionDenied),
        });

        let err = current_location(
            provider,
            Duration::from_millis(500),
            Duration::from_secs(60),
        )
        .unwrap_err();
        assert_eq!(err, DeviceLocationError::PermissionDenied);
    }

    #[test]
    fn unanswered_request_times_out() {
        let err = current_location(
            Arc::new(StalledProvider),
            Duration::from_millis(50),
            Duration::ZERO,
        )
        .unwrap_err();
        assert_eq!(err, DeviceLocationError::TimedOut);
    }

    #[test]
    fn invalid_fix_maps_to_unavailable() {
        let provider = Arc::new(FakeProvider {
            cached: None,
            fresh: Ok(fix(95.0, 0.0, ChronoDuration::zero())),
        });

        let err = current_location(
            provider,
            Duration::from_millis(500),
            Duration::from_secs(60),
        )
        .unwrap_err();
        assert_eq!(err, DeviceLocationError::Unavailable);
    }
}
