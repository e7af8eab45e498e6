//! Two-observer great-circle intersection
//!
//! Each observer defines a great circle through its position along its
//! bearing. The target is where the two circles cross ahead of both
//! observers, found by solving the spherical triangle
//! (observer 1, observer 2, target).

use std::f64::consts::FRAC_PI_2;

use crate::config::TriangulationConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::geodesy::{self, EARTH_RADIUS_M};
use crate::types::{GeoPoint, Intersection};

/// A single sightline: where the observer stood and which way they looked
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sightline {
    pub position: GeoPoint,
    /// Degrees in [0, 360)
    pub bearing: f64,
}

impl Sightline {
    pub fn new(position: GeoPoint, bearing: f64) -> Self {
        Self { position, bearing }
    }
}

pub struct TwoObserverIntersector {
    coincident_tolerance_rad: f64,
    parallel_tolerance: f64,
}

impl Default for TwoObserverIntersector {
    fn default() -> Self {
        Self::new(&TriangulationConfig::default())
    }
}

impl TwoObserverIntersector {
    pub fn new(config: &TriangulationConfig) -> Self {
        Self {
            coincident_tolerance_rad: config.coincident_tolerance_rad,
            parallel_tolerance: config.parallel_tolerance,
        }
    }

    pub fn intersect(&self, first: &Sightline, second: &Sightline) -> TrackerResult<Intersection> {
        let p1 = &first.position;
        let p2 = &second.position;

        let delta12 = geodesy::angular_distance(p1, p2);
        if delta12 < self.coincident_tolerance_rad {
            return Err(TrackerError::CoincidentObservers);
        }

        // Bearings of the baseline, then the triangle's interior angles at each observer
        let theta12 = geodesy::bearing(p1, p2).to_radians();
        let theta21 = geodesy::bearing(p2, p1).to_radians();
        let theta13 = first.bearing.to_radians();
        let theta23 = second.bearing.to_radians();

        let alpha1 = theta13 - theta12;
        let alpha2 = theta21 - theta23;
        let (sin_a1, sin_a2) = (alpha1.sin(), alpha2.sin());

        let on_baseline1 = sin_a1.abs() < self.parallel_tolerance;
        let on_baseline2 = sin_a2.abs() < self.parallel_tolerance;
        if on_baseline1 && on_baseline2 {
            return Err(TrackerError::ParallelOrCollinearSightlines);
        }

        // One observer sights the other: the circles cross at that observer
        if on_baseline1 {
            return Self::at_observer(p1, p2, *p2, alpha1.cos());
        }
        if on_baseline2 {
            return Self::at_observer(p1, p2, *p1, alpha2.cos());
        }

        if sin_a1 * sin_a2 < 0.0 {
            return Err(TrackerError::DivergentSightlines);
        }

        let cos_a3 = (-alpha1.cos() * alpha2.cos() + sin_a1 * sin_a2 * delta12.cos()).clamp(-1.0, 1.0);
        let alpha3 = cos_a3.acos();
        let delta13 = (delta12.sin() * sin_a1 * sin_a2).atan2(alpha2.cos() + alpha1.cos() * alpha3.cos());

        // Great circles cross twice; the far crossing means the sightlines spread apart
        if delta13 <= 0.0 || delta13 >= FRAC_PI_2 {
            return Err(TrackerError::DivergentSightlines);
        }

        let target = geodesy::destination(p1, delta13 * EARTH_RADIUS_M, first.bearing);
        let intersection = Intersection {
            target,
            distance_from_observer1: geodesy::distance(p1, &target),
            distance_from_observer2: geodesy::distance(p2, &target),
        };

        log::debug!(
            "Sightlines intersect at {} ({:.0} m / {:.0} m)",
            intersection.target,
            intersection.distance_from_observer1,
            intersection.distance_from_observer2
        );

        Ok(intersection)
    }

    /// `facing` is the cosine of the sighting observer's angle to the baseline;
    /// looking away from the other observer puts the crossing behind it
    fn at_observer(p1: &GeoPoint, p2: &GeoPoint, target: GeoPoint, facing: f64) -> TrackerResult<Intersection> {
        if facing <= 0.0 {
            return Err(TrackerError::DivergentSightlines);
        }
        Ok(Intersection {
            target,
            distance_from_observer1: geodesy::distance(p1, &target),
            distance_from_observer2: geodesy::distance(p2, &target),
        })
    }
}
