use serde::{Deserialize, Serialize};

// ─── Triangulation ───────────────────────────────────────────────────────────

/// Upper bound on observations per triangulation; `max_observations` is clamped to it
pub const MAX_OBSERVATIONS: usize = 5;

/// How the multi-observer fuser turns N sightlines into one estimate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuserStrategy {
    /// Extrapolate along the first observer's sightline by the mean slant range
    ReferenceExtrapolation,
    /// Least-squares point closest to every sightline
    ClosestApproach,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriangulationConfig {
    /// Observer separation below which two sightlines share an origin (radians)
    pub coincident_tolerance_rad: f64,
    /// |sin| below which an adjusted bearing counts as zero
    pub parallel_tolerance: f64,
    /// Observation session capacity
    pub max_observations: usize,
    pub fuser_strategy: FuserStrategy,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            coincident_tolerance_rad: 1e-10,
            parallel_tolerance: 1e-10,
            max_observations: 5,
            fuser_strategy: FuserStrategy::ReferenceExtrapolation,
        }
    }
}

// ─── Compass ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompassConfig {
    // ── Magnitude gate (uT, Earth field is ~25-65) ──
    pub min_magnitude_ut: f64,
    pub max_magnitude_ut: f64,

    // ── Calibration window ──
    pub window_capacity: usize,
    pub min_calibration_samples: usize,

    // ── Heading ──
    pub smoothing_alpha: f64,
    pub manual_offset_deg: f64,
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            min_magnitude_ut: 20.0,
            max_magnitude_ut: 80.0,
            window_capacity: 200,
            min_calibration_samples: 30,
            smoothing_alpha: 0.15,
            manual_offset_deg: 0.0,
        }
    }
}

// ─── Fix health ──────────────────────────────────────────────────────────────

/// Location accuracy mode the fix source runs in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccuracyMode {
    Precise,
    Normal,
    Eco,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GpsMonitorConfig {
    pub mode: AccuracyMode,

    // ── Per-mode staleness thresholds ──
    pub precise_threshold_ms: u64,
    pub normal_threshold_ms: u64,
    pub eco_threshold_ms: u64,
    pub grace_multiplier: f64,

    // ── Grace windows ──
    pub startup_grace_ms: u64,
    pub recovery_grace_ms: u64,

    // ── Restart policy ──
    pub min_restart_gap_ms: u64,
    pub max_stale_cycle_ms: u64,
}

impl Default for GpsMonitorConfig {
    fn default() -> Self {
        Self {
            mode: AccuracyMode::Normal,
            precise_threshold_ms: 6_000,
            normal_threshold_ms: 10_000,
            eco_threshold_ms: 15_000,
            grace_multiplier: 1.5,
            startup_grace_ms: 15_000,
            recovery_grace_ms: 7_500,
            min_restart_gap_ms: 20_000,
            max_stale_cycle_ms: 60_000,
        }
    }
}

impl GpsMonitorConfig {
    pub fn with_mode(mut self, mode: AccuracyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Expected fix interval for the active mode
    pub fn threshold_ms(&self) -> u64 {
        match self.mode {
            AccuracyMode::Precise => self.precise_threshold_ms,
            AccuracyMode::Normal => self.normal_threshold_ms,
            AccuracyMode::Eco => self.eco_threshold_ms,
        }
    }

    /// Silence longer than this marks the source stale
    pub fn stale_after_ms(&self) -> u64 {
        (self.threshold_ms() as f64 * self.grace_multiplier).round() as u64
    }
}
