pub mod fuser;
pub mod intersect;
pub mod session;

pub use fuser::{sight_direction, MultiObserverFuser};
pub use intersect::{Sightline, TwoObserverIntersector};
pub use session::ObservationSession;
