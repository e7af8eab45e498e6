//! Linear algebra aliases for the local tangent plane
//!
//! Axes follow East-North-Up: x grows east, y grows north, z grows up.

use nalgebra::{Matrix3, Vector3};

/// Position in the local tangent plane (meters)
pub type EnuVec = Vector3<f64>;

/// Unit sight direction in the local tangent plane
pub type SightVec = Vector3<f64>;

/// Normal-equation matrix for ray intersection
pub type NormalMat3 = Matrix3<f64>;
