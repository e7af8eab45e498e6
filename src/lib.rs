// Plume Tracker core
// Locates a distant target from ground sightings and keeps the position and
// heading sensors in a known-good state

pub mod compass;
pub mod config;
pub mod error;
pub mod fix_monitor;
pub mod geodesy;
pub mod hub;
pub mod status;
pub mod storage;
pub mod triangulation;
pub mod types;

pub use compass::{
    CalibrationOffsets, CompassFusion, CompassState, DeclinationError, DeclinationProvider, MagOutcome,
    RemoteDeclination,
};
pub use config::{AccuracyMode, CompassConfig, FuserStrategy, GpsMonitorConfig, TriangulationConfig};
pub use error::{TrackerError, TrackerResult};
pub use fix_monitor::{FixHealth, FixHealthMonitor, FixHealthState, MonitorCommand};
pub use hub::{HubOutput, SensorEvent, SensorHub, SensorSender};
pub use status::TrackerStatus;
pub use storage::PersistedState;
pub use triangulation::{MultiObserverFuser, ObservationSession, Sightline, TwoObserverIntersector};
pub use types::{FixSample, GeoPoint, Intersection, LocalPoint, MagSample, Observation, TriangulationResult};
