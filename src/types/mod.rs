pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Geodetic position: degrees, degrees, meters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl GeoPoint {
    /// Checked constructor for values coming from outside the core
    pub fn new(latitude: f64, longitude: f64) -> TrackerResult<Self> {
        let point = Self::new_unchecked(latitude, longitude);
        point.validate()?;
        Ok(point)
    }

    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, altitude: 0.0 }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(TrackerError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(TrackerError::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        if !self.altitude.is_finite() {
            return Err(TrackerError::InvalidCoordinate("altitude is not finite".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.1}m)", self.latitude, self.longitude, self.altitude)
    }
}

/// Point in the local tangent plane around some origin (meters, ENU)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl LocalPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_vector(self) -> EnuVec {
        EnuVec::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: &EnuVec) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

/// A committed sighting of the target
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub position: GeoPoint,
    /// Degrees clockwise from true north, [0, 360)
    pub heading: f64,
    /// Degrees above the horizon
    pub pitch: f64,
    /// Straight-line distance to the target (meters)
    pub slant_range: f64,
    /// Unix seconds
    pub captured_at: f64,
    pub observer_label: String,
}

impl Observation {
    pub fn new(
        id: &str,
        position: GeoPoint,
        heading: f64,
        pitch: f64,
        slant_range: f64,
        captured_at: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            position,
            heading,
            pitch,
            slant_range,
            captured_at,
            observer_label: String::new(),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.observer_label = label.to_string();
        self
    }

    /// Reject values the triangulation core treats as contract violations
    pub fn validate(&self) -> TrackerResult<()> {
        self.position.validate()?;
        if !self.heading.is_finite() || !(0.0..360.0).contains(&self.heading) {
            return Err(TrackerError::InvalidObservation(format!(
                "heading {} outside [0, 360)",
                self.heading
            )));
        }
        if !self.pitch.is_finite() || !(-90.0..=90.0).contains(&self.pitch) {
            return Err(TrackerError::InvalidObservation(format!(
                "pitch {} outside [-90, 90]",
                self.pitch
            )));
        }
        if !self.slant_range.is_finite() || self.slant_range < 0.0 {
            return Err(TrackerError::InvalidObservation(format!(
                "slant range {} is negative",
                self.slant_range
            )));
        }
        Ok(())
    }
}

/// Output of a multi-observer triangulation run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriangulationResult {
    pub target: GeoPoint,
    /// Mean angular residual in [0, 1]; relative quality signal only
    pub error_metric: f64,
    pub observer_count: usize,
    pub per_observer_residuals: Vec<f64>,
}

/// Output of the two-observer great-circle intersection
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub target: GeoPoint,
    pub distance_from_observer1: f64,
    pub distance_from_observer2: f64,
}

/// Raw 3-axis magnetometer sample (uT)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MagSample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub magnitude: f64,
}

impl MagSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: f64) -> Self {
        Self {
            timestamp,
            x,
            y,
            z,
            magnitude: (x * x + y * y + z * z).sqrt(),
        }
    }
}

/// Position fix delivered by the platform location service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixSample {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub accuracy: f64,
    /// Milliseconds, same clock as the monitor ticks
    pub timestamp_ms: u64,
}

impl FixSample {
    pub fn new(latitude: f64, longitude: f64, altitude: f64, timestamp_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            accuracy: 0.0,
            timestamp_ms,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new_unchecked(self.latitude, self.longitude).with_altitude(self.altitude)
    }
}
