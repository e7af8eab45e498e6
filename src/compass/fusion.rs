//! Magnetometer to true heading
//!
//! `CompassFusion` is a two-state machine. In `Live` every accepted sample
//! becomes a heading (hard-iron offsets removed, declination and manual offset
//! applied, then smoothed). In `Calibrating` accepted samples only fill the
//! calibration window; no heading is produced until the window is finalized
//! or cancelled.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::compass::declination::DeclinationProvider;
use crate::compass::smoothing::HeadingSmoother;
use crate::config::CompassConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::geodesy::normalize_degrees;
use crate::types::MagSample;

/// Per-axis hard-iron bias, replaced wholesale by each calibration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOffsets {
    pub offset_x: f64,
    pub offset_y: f64,
    pub offset_z: f64,
    pub sample_count: usize,
    /// RFC 3339
    pub computed_at: String,
}

impl Default for CalibrationOffsets {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            offset_z: 0.0,
            sample_count: 0,
            computed_at: String::new(),
        }
    }
}

impl CalibrationOffsets {
    /// Midpoint of the observed min/max on each axis
    pub fn from_samples<'a, I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MagSample>,
    {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        let mut count = 0;
        for s in samples {
            for (axis, value) in [s.x, s.y, s.z].into_iter().enumerate() {
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            offset_x: (max[0] + min[0]) / 2.0,
            offset_y: (max[1] + min[1]) / 2.0,
            offset_z: (max[2] + min[2]) / 2.0,
            sample_count: count,
            computed_at: Utc::now().to_rfc3339(),
        })
    }
}

#[derive(Clone, Debug)]
pub enum CompassMode {
    Live,
    Calibrating { window: VecDeque<MagSample> },
}

/// Read-only view of the compass for the host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompassState {
    pub raw_heading_deg: f64,
    pub smoothed_heading_deg: f64,
    pub declination_deg: f64,
    pub calibrating: bool,
    pub window_len: usize,
}

/// What happened to one magnetometer sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MagOutcome {
    /// Live mode: new smoothed heading
    Heading(f64),
    /// Calibrating: window size after the append
    Collected(usize),
    /// Magnitude outside the accepted band
    Discarded(f64),
}

pub struct CompassFusion {
    config: CompassConfig,
    mode: CompassMode,
    offsets: CalibrationOffsets,
    declination_deg: f64,
    raw_heading_deg: f64,
    smoother: HeadingSmoother,
}

impl Default for CompassFusion {
    fn default() -> Self {
        Self::new(CompassConfig::default())
    }
}

impl CompassFusion {
    pub fn new(config: CompassConfig) -> Self {
        let smoother = HeadingSmoother::new(config.smoothing_alpha);
        Self {
            config,
            mode: CompassMode::Live,
            offsets: CalibrationOffsets::default(),
            declination_deg: 0.0,
            raw_heading_deg: 0.0,
            smoother,
        }
    }

    // ─── Calibration ─────────────────────────────────────────────────────────

    /// Enter Calibrating with an empty window (restarts a running calibration)
    pub fn start_calibration(&mut self) {
        log::info!("Compass calibration started");
        self.mode = CompassMode::Calibrating {
            window: VecDeque::with_capacity(self.config.window_capacity),
        };
    }

    /// Drop the window and go back to Live; installed offsets are untouched
    pub fn cancel_calibration(&mut self) {
        if let CompassMode::Calibrating { window } = &self.mode {
            log::info!("Compass calibration cancelled ({} samples dropped)", window.len());
        }
        self.mode = CompassMode::Live;
    }

    /// Compute hard-iron offsets from the window, install them and return to Live
    ///
    /// With too few samples the compass stays in Calibrating so the host can
    /// keep collecting.
    pub fn finalize_calibration(&mut self) -> TrackerResult<CalibrationOffsets> {
        let window = match &self.mode {
            CompassMode::Calibrating { window } => window,
            CompassMode::Live => return Err(TrackerError::NotCalibrating),
        };

        let required = self.config.min_calibration_samples;
        if window.len() < required {
            return Err(TrackerError::InsufficientSamples {
                collected: window.len(),
                required,
            });
        }

        let offsets = CalibrationOffsets::from_samples(window).ok_or(TrackerError::InsufficientSamples {
            collected: 0,
            required,
        })?;

        log::info!(
            "Compass calibrated from {} samples: offset ({:.2}, {:.2}, {:.2}) uT",
            offsets.sample_count,
            offsets.offset_x,
            offsets.offset_y,
            offsets.offset_z
        );
        self.offsets = offsets.clone();
        self.mode = CompassMode::Live;
        Ok(offsets)
    }

    /// Install offsets from a previous session
    pub fn apply_calibration(&mut self, offsets: CalibrationOffsets) {
        self.offsets = offsets;
    }

    pub fn offsets(&self) -> &CalibrationOffsets {
        &self.offsets
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.mode, CompassMode::Calibrating { .. })
    }

    pub fn mode(&self) -> &CompassMode {
        &self.mode
    }

    // ─── Samples ─────────────────────────────────────────────────────────────

    pub fn on_magnetometer_sample(&mut self, x: f64, y: f64, z: f64, timestamp: f64) -> MagOutcome {
        let sample = MagSample::new(x, y, z, timestamp);
        if !self.accepts(sample.magnitude) {
            log::debug!("Discarding mag sample, magnitude {:.1} uT", sample.magnitude);
            return MagOutcome::Discarded(sample.magnitude);
        }

        let capacity = self.config.window_capacity;
        if let CompassMode::Calibrating { window } = &mut self.mode {
            window.push_back(sample);
            while window.len() > capacity {
                window.pop_front();
            }
            return MagOutcome::Collected(window.len());
        }

        MagOutcome::Heading(self.update_heading(&sample))
    }

    fn accepts(&self, magnitude: f64) -> bool {
        magnitude.is_finite() && magnitude >= self.config.min_magnitude_ut && magnitude <= self.config.max_magnitude_ut
    }

    fn update_heading(&mut self, sample: &MagSample) -> f64 {
        let x = sample.x - self.offsets.offset_x;
        let y = sample.y - self.offsets.offset_y;

        self.raw_heading_deg = normalize_degrees(360.0 - normalize_degrees(x.atan2(y).to_degrees()));
        let true_heading = normalize_degrees(self.raw_heading_deg - self.declination_deg - self.config.manual_offset_deg);
        self.smoother.apply(true_heading)
    }

    // ─── Declination ─────────────────────────────────────────────────────────

    pub fn set_declination(&mut self, declination_deg: f64) {
        if declination_deg.is_finite() {
            self.declination_deg = declination_deg;
        } else {
            log::warn!("Ignoring non-finite declination");
        }
    }

    /// Ask the active provider for the declination at a location
    pub fn update_declination(&mut self, provider: &DeclinationProvider, latitude: f64, longitude: f64) -> f64 {
        let declination = provider.declination_deg(latitude, longitude);
        log::debug!("Declination {:.2} deg from {} provider", declination, provider.name());
        self.set_declination(declination);
        self.declination_deg
    }

    pub fn declination(&self) -> f64 {
        self.declination_deg
    }

    pub fn set_manual_offset(&mut self, offset_deg: f64) {
        self.config.manual_offset_deg = offset_deg;
    }

    // ─── Output ──────────────────────────────────────────────────────────────

    pub fn smoothed_heading(&self) -> f64 {
        self.smoother.current()
    }

    pub fn state(&self) -> CompassState {
        let window_len = match &self.mode {
            CompassMode::Calibrating { window } => window.len(),
            CompassMode::Live => 0,
        };
        CompassState {
            raw_heading_deg: self.raw_heading_deg,
            smoothed_heading_deg: self.smoother.current(),
            declination_deg: self.declination_deg,
            calibrating: self.is_calibrating(),
            window_len,
        }
    }
}
