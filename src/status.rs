use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::fix_monitor::FixHealth;
use crate::triangulation::ObservationSession;

/// Flat snapshot of the tracker for host display
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrackerStatus {
    pub timestamp: f64,
    // Compass
    pub heading_deg: f64,
    pub raw_heading_deg: f64,
    pub declination_deg: f64,
    pub calibrating: bool,
    pub calibration_window: usize,
    pub calibration_sample_count: usize,
    pub mag_samples: u64,
    pub mag_discarded: u64,
    // Fix source
    pub fix_health: FixHealth,
    pub fixes: u64,
    pub restart_count: u32,
    pub last_fix_lat: Option<f64>,
    pub last_fix_lon: Option<f64>,
    pub last_fix_accuracy: Option<f64>,
    pub last_fix_age_ms: Option<u64>,
    // Triangulation
    pub observation_count: usize,
    pub error_metric: Option<f64>,
    pub target_lat: Option<f64>,
    pub target_lon: Option<f64>,
}

impl TrackerStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            heading_deg: 0.0,
            raw_heading_deg: 0.0,
            declination_deg: 0.0,
            calibrating: false,
            calibration_window: 0,
            calibration_sample_count: 0,
            mag_samples: 0,
            mag_discarded: 0,
            fix_health: FixHealth::Live,
            fixes: 0,
            restart_count: 0,
            last_fix_lat: None,
            last_fix_lon: None,
            last_fix_accuracy: None,
            last_fix_age_ms: None,
            observation_count: 0,
            error_metric: None,
            target_lat: None,
            target_lon: None,
        }
    }

    /// Fill in the triangulation fields from the active session
    pub fn with_session(mut self, session: &ObservationSession) -> Self {
        self.observation_count = session.len();
        match session.result() {
            Some(result) => {
                self.error_metric = Some(result.error_metric);
                self.target_lat = Some(result.target.latitude);
                self.target_lon = Some(result.target.longitude);
            }
            None => {
                self.error_metric = None;
                self.target_lat = None;
                self.target_lon = None;
            }
        }
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for TrackerStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
