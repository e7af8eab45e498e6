//! Single-writer event loop for the stateful sensor components
//!
//! Sensor callbacks may fire on any thread. They push `SensorEvent`s through a
//! cloned `SensorSender`; the thread that owns the `SensorHub` drains the queue
//! and applies events one at a time to `CompassFusion` and `FixHealthMonitor`.

use crossbeam::channel::{self, Receiver, Sender};

use crate::compass::{CalibrationOffsets, CompassFusion, MagOutcome};
use crate::config::{CompassConfig, GpsMonitorConfig};
use crate::error::{TrackerError, TrackerResult};
use crate::fix_monitor::{FixHealthMonitor, MonitorCommand};
use crate::status::TrackerStatus;
use crate::types::{FixSample, Observation};

/// Backlog above which new magnetometer samples are shed
const QUEUE_CAPACITY: usize = 1024;

#[derive(Clone, Debug, PartialEq)]
pub enum SensorEvent {
    Magnetometer { x: f64, y: f64, z: f64, timestamp: f64 },
    Fix(FixSample),
    Tick { now_ms: u64 },
    /// Result of an asynchronous declination lookup
    Declination(f64),
    StartCalibration,
    FinalizeCalibration,
    CancelCalibration,
}

/// Things the host has to act on
#[derive(Clone, Debug, PartialEq)]
pub enum HubOutput {
    RestartFixSource,
    CalibrationFinished(TrackerResult<CalibrationOffsets>),
}

/// Producer handle; cheap to clone, one per sensor callback
#[derive(Clone)]
pub struct SensorSender {
    tx: Sender<SensorEvent>,
}

impl SensorSender {
    /// Queue an event without blocking.
    ///
    /// Magnetometer samples are shed once the backlog reaches the queue
    /// capacity; every other event is always queued, in order. Returns false
    /// when the event was not queued (shed sample or hub gone).
    pub fn send(&self, event: SensorEvent) -> bool {
        if matches!(event, SensorEvent::Magnetometer { .. }) && self.tx.len() >= QUEUE_CAPACITY {
            log::debug!("Sensor queue full, dropping {:?}", event);
            return false;
        }

        match self.tx.send(event) {
            Ok(_) => true,
            Err(_) => {
                log::warn!("Sensor hub closed");
                false
            }
        }
    }
}

pub struct SensorHub {
    compass: CompassFusion,
    monitor: FixHealthMonitor,
    last_fix: Option<FixSample>,
    tx: Sender<SensorEvent>,
    rx: Receiver<SensorEvent>,
    mag_samples: u64,
    mag_discarded: u64,
    fixes: u64,
    restart_count: u32,
}

impl SensorHub {
    pub fn new(compass_config: CompassConfig, monitor_config: GpsMonitorConfig, now_ms: u64) -> Self {
        let (tx, rx) = channel::unbounded();
        SensorHub {
            compass: CompassFusion::new(compass_config),
            monitor: FixHealthMonitor::new(monitor_config, now_ms),
            last_fix: None,
            tx,
            rx,
            mag_samples: 0,
            mag_discarded: 0,
            fixes: 0,
            restart_count: 0,
        }
    }

    pub fn sender(&self) -> SensorSender {
        SensorSender { tx: self.tx.clone() }
    }

    /// Apply every queued event in arrival order
    pub fn drain(&mut self) -> Vec<HubOutput> {
        let mut outputs = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            if let Some(output) = self.handle(event) {
                outputs.push(output);
            }
        }
        outputs
    }

    /// Apply one event directly (same thread as the owner)
    pub fn handle(&mut self, event: SensorEvent) -> Option<HubOutput> {
        match event {
            SensorEvent::Magnetometer { x, y, z, timestamp } => {
                self.mag_samples += 1;
                if let MagOutcome::Discarded(_) = self.compass.on_magnetometer_sample(x, y, z, timestamp) {
                    self.mag_discarded += 1;
                }
                None
            }
            SensorEvent::Fix(fix) => {
                if let Err(e) = fix.position().validate() {
                    log::warn!("Ignoring fix: {}", e);
                    return None;
                }
                self.monitor.on_fix(fix.timestamp_ms);
                self.fixes += 1;
                self.last_fix = Some(fix);
                None
            }
            SensorEvent::Tick { now_ms } => match self.monitor.tick(now_ms)? {
                MonitorCommand::RestartFixSource => {
                    self.restart_count += 1;
                    Some(HubOutput::RestartFixSource)
                }
            },
            SensorEvent::Declination(deg) => {
                self.compass.set_declination(deg);
                None
            }
            SensorEvent::StartCalibration => {
                self.compass.start_calibration();
                None
            }
            SensorEvent::FinalizeCalibration => {
                Some(HubOutput::CalibrationFinished(self.compass.finalize_calibration()))
            }
            SensorEvent::CancelCalibration => {
                self.compass.cancel_calibration();
                None
            }
        }
    }

    /// Build an observation from the current smoothed heading and last good fix
    pub fn commit_observation(
        &self,
        id: &str,
        observer_label: &str,
        pitch: f64,
        slant_range: f64,
        captured_at: f64,
    ) -> TrackerResult<Observation> {
        let fix = self
            .last_fix
            .as_ref()
            .ok_or_else(|| TrackerError::InvalidObservation("no position fix yet".to_string()))?;

        let observation = Observation::new(
            id,
            fix.position(),
            self.compass.smoothed_heading(),
            pitch,
            slant_range,
            captured_at,
        )
        .with_label(observer_label);
        observation.validate()?;
        Ok(observation)
    }

    pub fn last_fix(&self) -> Option<&FixSample> {
        self.last_fix.as_ref()
    }

    pub fn compass(&self) -> &CompassFusion {
        &self.compass
    }

    pub fn compass_mut(&mut self) -> &mut CompassFusion {
        &mut self.compass
    }

    pub fn monitor(&self) -> &FixHealthMonitor {
        &self.monitor
    }

    pub fn status(&self, now_ms: u64) -> TrackerStatus {
        let compass = self.compass.state();
        let mut status = TrackerStatus::new();
        status.heading_deg = compass.smoothed_heading_deg;
        status.raw_heading_deg = compass.raw_heading_deg;
        status.declination_deg = compass.declination_deg;
        status.calibrating = compass.calibrating;
        status.calibration_window = compass.window_len;
        status.calibration_sample_count = self.compass.offsets().sample_count;
        status.mag_samples = self.mag_samples;
        status.mag_discarded = self.mag_discarded;

        status.fix_health = self.monitor.health();
        status.fixes = self.fixes;
        status.restart_count = self.restart_count;
        if let Some(fix) = &self.last_fix {
            status.last_fix_lat = Some(fix.latitude);
            status.last_fix_lon = Some(fix.longitude);
            status.last_fix_accuracy = Some(fix.accuracy);
            status.last_fix_age_ms = Some(now_ms.saturating_sub(fix.timestamp_ms));
        }
        status
    }
}
