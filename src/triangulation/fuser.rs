//! Multi-observer target estimate
//!
//! Works in the tangent plane of the first observation. The default strategy
//! walks the mean slant range down the first observer's sightline and uses the
//! other observers only to score that estimate; `ClosestApproach` instead
//! solves for the point nearest to every sightline.

use nalgebra::Matrix3;

use crate::config::{FuserStrategy, TriangulationConfig, MAX_OBSERVATIONS};
use crate::error::{TrackerError, TrackerResult};
use crate::geodesy;
use crate::types::{EnuVec, LocalPoint, NormalMat3, Observation, SightVec, TriangulationResult};

/// Unit sight direction (ENU) for a heading/pitch pair in degrees
pub fn sight_direction(heading_deg: f64, pitch_deg: f64) -> SightVec {
    let (h, p) = (heading_deg.to_radians(), pitch_deg.to_radians());
    SightVec::new(h.sin() * p.cos(), h.cos() * p.cos(), p.sin())
}

/// Cosine deviation between where the observer looked and where the estimate is,
/// mapped to [0, 1] (0 = dead on, 1 = opposite)
pub fn angular_residual(observer: &EnuVec, observed: &SightVec, estimate: &EnuVec) -> f64 {
    let to_estimate = estimate - observer;
    let norm = to_estimate.norm();
    if norm < 1e-9 {
        // Estimate sits on the observer; no direction to disagree with
        return 0.0;
    }
    let cos_sim = (to_estimate / norm).dot(observed).clamp(-1.0, 1.0);
    ((1.0 - cos_sim) / 2.0).clamp(0.0, 1.0)
}

pub struct MultiObserverFuser {
    strategy: FuserStrategy,
}

impl Default for MultiObserverFuser {
    fn default() -> Self {
        Self::new(&TriangulationConfig::default())
    }
}

impl MultiObserverFuser {
    pub fn new(config: &TriangulationConfig) -> Self {
        Self { strategy: config.fuser_strategy }
    }

    pub fn strategy(&self) -> FuserStrategy {
        self.strategy
    }

    pub fn fuse(&self, observations: &[Observation]) -> TrackerResult<TriangulationResult> {
        if observations.len() < 2 {
            return Err(TrackerError::InsufficientObservations { got: observations.len() });
        }
        if observations.len() > MAX_OBSERVATIONS {
            return Err(TrackerError::TooManyObservations {
                got: observations.len(),
                max: MAX_OBSERVATIONS,
            });
        }

        let origin = observations[0].position;
        let positions: Vec<EnuVec> = observations
            .iter()
            .map(|obs| geodesy::to_local_cartesian(&obs.position, &origin).to_vector())
            .collect();
        let directions: Vec<SightVec> = observations
            .iter()
            .map(|obs| sight_direction(obs.heading, obs.pitch))
            .collect();

        let estimate = match self.strategy {
            FuserStrategy::ReferenceExtrapolation => Self::extrapolate(observations, &positions, &directions),
            FuserStrategy::ClosestApproach => Self::closest_approach(&positions, &directions)
                .unwrap_or_else(|| {
                    log::warn!("Sightlines are all parallel, falling back to reference extrapolation");
                    Self::extrapolate(observations, &positions, &directions)
                }),
        };

        let per_observer_residuals: Vec<f64> = positions
            .iter()
            .zip(directions.iter())
            .map(|(p, d)| angular_residual(p, d, &estimate))
            .collect();
        let error_metric = per_observer_residuals.iter().sum::<f64>() / per_observer_residuals.len() as f64;

        let target = geodesy::from_local_cartesian(&LocalPoint::from_vector(&estimate), &origin);

        Ok(TriangulationResult {
            target,
            error_metric,
            observer_count: observations.len(),
            per_observer_residuals,
        })
    }

    fn extrapolate(observations: &[Observation], positions: &[EnuVec], directions: &[SightVec]) -> EnuVec {
        let mean_range = observations.iter().map(|o| o.slant_range).sum::<f64>() / observations.len() as f64;
        positions[0] + directions[0] * mean_range
    }

    /// Minimise the summed squared perpendicular distance to every sightline:
    /// sum_i (I - d_i d_i^T) x = sum_i (I - d_i d_i^T) p_i
    fn closest_approach(positions: &[EnuVec], directions: &[SightVec]) -> Option<EnuVec> {
        let mut a = NormalMat3::zeros();
        let mut b = EnuVec::zeros();
        for (p, d) in positions.iter().zip(directions.iter()) {
            let projector = Matrix3::identity() - d * d.transpose();
            a += projector;
            b += projector * p;
        }
        // Near-singular when every ray points the same way
        if a.determinant().abs() < 1e-9 {
            return None;
        }
        a.lu().solve(&b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FuserStrategy;
    use crate::geodesy::{distance, from_local_cartesian};
    use crate::types::GeoPoint;
    use approx::assert_abs_diff_eq;

    /// Observation at local offset `at` (relative to `origin`) looking exactly at local `target`
    fn sighting(id: &str, origin: &GeoPoint, at: EnuVec, target: EnuVec) -> Observation {
        let v = target - at;
        let range = v.norm();
        let heading = geodesy::normalize_degrees(v.x.atan2(v.y).to_degrees());
        let pitch = (v.z / range).asin().to_degrees();
        let position = from_local_cartesian(&LocalPoint::from_vector(&at), origin);
        Observation::new(id, position, heading, pitch, range, 0.0)
    }

    #[test]
    fn test_sight_direction_axes() {
        let north = sight_direction(0.0, 0.0);
        assert_abs_diff_eq!(north, SightVec::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        let east = sight_direction(90.0, 0.0);
        assert_abs_diff_eq!(east, SightVec::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        let up = sight_direction(123.0, 90.0);
        assert_abs_diff_eq!(up.z, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sight_direction(217.0, 12.0).norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_residual_range() {
        let observer = EnuVec::zeros();
        let looking_north = sight_direction(0.0, 0.0);
        assert_abs_diff_eq!(
            angular_residual(&observer, &looking_north, &EnuVec::new(0.0, 100.0, 0.0)),
            0.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            angular_residual(&observer, &looking_north, &EnuVec::new(0.0, -100.0, 0.0)),
            1.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            angular_residual(&observer, &looking_north, &EnuVec::new(100.0, 0.0, 0.0)),
            0.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rejects_single_observation() {
        let origin = GeoPoint::new_unchecked(45.0, 7.0);
        let obs = sighting("a", &origin, EnuVec::zeros(), EnuVec::new(0.0, 1000.0, 50.0));
        let result = MultiObserverFuser::default().fuse(&[obs]);
        assert_eq!(result, Err(TrackerError::InsufficientObservations { got: 1 }));
    }

    #[test]
    fn test_rejects_more_than_five_observations() {
        let origin = GeoPoint::new_unchecked(45.0, 7.0);
        let target = EnuVec::new(0.0, 3000.0, 100.0);
        let observations: Vec<Observation> = (0..6)
            .map(|i| sighting(&format!("o{}", i), &origin, EnuVec::new(i as f64 * 300.0, 0.0, 0.0), target))
            .collect();

        let fuser = MultiObserverFuser::default();
        assert_eq!(
            fuser.fuse(&observations),
            Err(TrackerError::TooManyObservations { got: 6, max: 5 })
        );
        assert_eq!(fuser.fuse(&observations[..5]).unwrap().observer_count, 5);
    }

    #[test]
    fn test_agreeing_observers_have_zero_error() {
        let origin = GeoPoint::new_unchecked(45.0, 7.0).with_altitude(200.0);
        let target = EnuVec::new(600.0, 800.0, 0.0);
        // Both observers exactly 1000 m from the target
        let a = sighting("a", &origin, EnuVec::zeros(), target);
        let b = sighting("b", &origin, EnuVec::new(1200.0, 0.0, 0.0), target);
        assert_abs_diff_eq!(a.slant_range, b.slant_range, epsilon = 1e-9);

        let result = MultiObserverFuser::default().fuse(&[a, b]).unwrap();
        assert!(result.error_metric < 1e-9);
        assert_eq!(result.observer_count, 2);
        assert_eq!(result.per_observer_residuals.len(), 2);

        let expected = from_local_cartesian(&LocalPoint::from_vector(&target), &origin);
        assert!(distance(&result.target, &expected) < 0.01);
        assert_abs_diff_eq!(result.target.altitude, 200.0, epsilon = 1e-6);
    }

    #[test]
    fn test_estimate_follows_first_sightline() {
        let origin = GeoPoint::new_unchecked(-20.0, 130.0);
        let target = EnuVec::new(0.0, 2000.0, 300.0);
        let a = sighting("a", &origin, EnuVec::zeros(), target);
        let mut b = sighting("b", &origin, EnuVec::new(1500.0, 0.0, 0.0), target);
        // Second observer overestimates range; the estimate slides along the first sightline
        b.slant_range += 400.0;

        let result = MultiObserverFuser::default().fuse(&[a.clone(), b]).unwrap();
        let local = geodesy::to_local_cartesian(&result.target, &origin).to_vector();
        let along = sight_direction(a.heading, a.pitch);
        assert_abs_diff_eq!(local.normalize().dot(&along), 1.0, epsilon = 1e-6);
        assert!(result.per_observer_residuals[0] < 1e-9);
        assert!(result.per_observer_residuals[1] > 0.0);
    }

    #[test]
    fn test_disagreeing_observers_raise_error_metric() {
        let origin = GeoPoint::new_unchecked(45.0, 7.0);
        let target = EnuVec::new(0.0, 3000.0, 100.0);
        let a = sighting("a", &origin, EnuVec::zeros(), target);
        let good = sighting("b", &origin, EnuVec::new(2000.0, 0.0, 0.0), target);
        let mut bad = good.clone();
        bad.heading = geodesy::normalize_degrees(bad.heading + 90.0);

        let fuser = MultiObserverFuser::default();
        let agree = fuser.fuse(&[a.clone(), good]).unwrap();
        let disagree = fuser.fuse(&[a, bad]).unwrap();
        assert!(disagree.error_metric > agree.error_metric + 0.05);
        assert!(disagree.error_metric <= 1.0);
    }

    #[test]
    fn test_closest_approach_recovers_target() {
        let origin = GeoPoint::new_unchecked(37.0, -122.0);
        let target = EnuVec::new(-400.0, 2500.0, 250.0);
        let mut observations = vec![
            sighting("a", &origin, EnuVec::zeros(), target),
            sighting("b", &origin, EnuVec::new(1800.0, 200.0, 10.0), target),
            sighting("c", &origin, EnuVec::new(-1500.0, -300.0, -5.0), target),
        ];
        // Ranges are wrong on purpose; the least-squares solver ignores them
        for obs in observations.iter_mut() {
            obs.slant_range *= 1.3;
        }

        let config = TriangulationConfig {
            fuser_strategy: FuserStrategy::ClosestApproach,
            ..Default::default()
        };
        let result = MultiObserverFuser::new(&config).fuse(&observations).unwrap();
        let expected = from_local_cartesian(&LocalPoint::from_vector(&target), &origin);
        assert!(distance(&result.target, &expected) < 0.5);
        assert!(result.error_metric < 1e-6);
    }

    #[test]
    fn test_closest_approach_parallel_falls_back() {
        let origin = GeoPoint::new_unchecked(10.0, 10.0);
        let a = Observation::new("a", origin, 0.0, 0.0, 1000.0, 0.0);
        let b_pos = from_local_cartesian(&LocalPoint::new(500.0, 0.0, 0.0), &origin);
        let b = Observation::new("b", b_pos, 0.0, 0.0, 1000.0, 0.0);

        let config = TriangulationConfig {
            fuser_strategy: FuserStrategy::ClosestApproach,
            ..Default::default()
        };
        let fallback = MultiObserverFuser::new(&config).fuse(&[a.clone(), b.clone()]).unwrap();
        let reference = MultiObserverFuser::default().fuse(&[a, b]).unwrap();
        assert_eq!(fallback, reference);
    }
}
