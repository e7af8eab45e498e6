pub mod declination;
pub mod fusion;
pub mod smoothing;

pub use declination::{offline_declination, DeclinationError, DeclinationProvider, RemoteDeclination};
pub use fusion::{CalibrationOffsets, CompassFusion, CompassMode, CompassState, MagOutcome};
pub use smoothing::HeadingSmoother;
