use thiserror::Error;

/// Plume tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Observers are at the same position")]
    CoincidentObservers,

    #[error("Sightlines are parallel or collinear")]
    ParallelOrCollinearSightlines,

    #[error("Sightlines diverge, no intersection ahead of both observers")]
    DivergentSightlines,

    #[error("Need at least 2 observations, got {got}")]
    InsufficientObservations { got: usize },

    #[error("At most {max} observations per triangulation, got {got}")]
    TooManyObservations { got: usize, max: usize },

    #[error("Calibration needs {required} samples, collected {collected}")]
    InsufficientSamples { collected: usize, required: usize },

    #[error("Compass is not calibrating")]
    NotCalibrating,

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    /// Errors the host can recover from by asking the user to re-observe or keep sampling
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TrackerError::CoincidentObservers
                | TrackerError::ParallelOrCollinearSightlines
                | TrackerError::DivergentSightlines
                | TrackerError::InsufficientObservations { .. }
                | TrackerError::InsufficientSamples { .. }
        )
    }
}
