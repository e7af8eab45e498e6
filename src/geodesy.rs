//! Spherical-earth geodesy helpers
//!
//! Everything here works on a sphere of mean radius `EARTH_RADIUS_M`. The
//! tangent-plane conversions are equirectangular: fine within a few hundred
//! kilometres of the origin, increasingly wrong beyond that.

use crate::types::{GeoPoint, LocalPoint};

/// Mean Earth radius (m)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Wrap an angle in degrees into [0, 360)
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap a longitude difference or longitude into [-180, 180)
pub fn wrap_longitude(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Haversine great-circle distance in meters
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    EARTH_RADIUS_M * angular_distance(a, b)
}

/// Central angle between two points (radians)
pub fn angular_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// Point reached by travelling `distance_m` from `origin` along initial bearing `bearing_deg`
///
/// The altitude of `origin` is carried over unchanged.
pub fn destination(origin: &GeoPoint, distance_m: f64, bearing_deg: f64) -> GeoPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.latitude.to_radians();
    let lambda1 = origin.longitude.to_radians();

    let sin_phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).clamp(-1.0, 1.0);
    let phi2 = sin_phi2.asin();
    let y = theta.sin() * delta.sin() * phi1.cos();
    let x = delta.cos() - phi1.sin() * sin_phi2;
    let lambda2 = lambda1 + y.atan2(x);

    GeoPoint {
        latitude: phi2.to_degrees(),
        longitude: wrap_longitude(lambda2.to_degrees()),
        altitude: origin.altitude,
    }
}

/// Initial great-circle bearing from `a` to `b`, degrees in [0, 360)
pub fn bearing(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let y = d_lon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lon.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Project `p` onto the tangent plane centred at `origin` (ENU meters)
pub fn to_local_cartesian(p: &GeoPoint, origin: &GeoPoint) -> LocalPoint {
    let d_lat = (p.latitude - origin.latitude).to_radians();
    let d_lon = wrap_longitude(p.longitude - origin.longitude).to_radians();
    LocalPoint {
        x: EARTH_RADIUS_M * d_lon * origin.latitude.to_radians().cos(),
        y: EARTH_RADIUS_M * d_lat,
        z: p.altitude - origin.altitude,
    }
}

/// Inverse of [`to_local_cartesian`]
pub fn from_local_cartesian(local: &LocalPoint, origin: &GeoPoint) -> GeoPoint {
    let d_lat = local.y / EARTH_RADIUS_M;
    let cos_lat = origin.latitude.to_radians().cos();
    // At the poles every longitude is the same place
    let d_lon = if cos_lat.abs() < 1e-12 {
        0.0
    } else {
        local.x / (EARTH_RADIUS_M * cos_lat)
    };
    GeoPoint {
        latitude: (origin.latitude + d_lat.to_degrees()).clamp(-90.0, 90.0),
        longitude: wrap_longitude(origin.longitude + d_lon.to_degrees()),
        altitude: origin.altitude + local.z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new_unchecked(0.0, 0.0),
            GeoPoint::new_unchecked(37.7749, -122.4194),
            GeoPoint::new_unchecked(-33.8688, 151.2093),
            GeoPoint::new_unchecked(64.1466, -21.9426),
            GeoPoint::new_unchecked(-54.8019, -68.3030),
            GeoPoint::new_unchecked(1.3521, 179.95),
        ]
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        for p in sample_points() {
            assert!(distance(&p, &p).abs() < 1e-6);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new_unchecked(45.0, 7.0);
        let b = GeoPoint::new_unchecked(45.3, 7.8);
        assert_abs_diff_eq!(distance(&a, &b), distance(&b, &a), epsilon = 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = GeoPoint::new_unchecked(10.0, 20.0);
        let b = GeoPoint::new_unchecked(11.0, 20.0);
        let expected = EARTH_RADIUS_M * 1f64.to_radians();
        assert_abs_diff_eq!(distance(&a, &b), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_destination_round_trip() {
        let distances = [1.0, 250.0, 5_000.0, 42_000.0, 300_000.0];
        let bearings = [0.0, 37.5, 90.0, 181.0, 270.0, 359.0];
        for origin in sample_points() {
            for &d in &distances {
                for &b in &bearings {
                    let dest = destination(&origin, d, b);
                    let back = distance(&origin, &dest);
                    assert!(
                        ((back - d) / d).abs() < 1e-4,
                        "origin {} d {} b {} -> {}",
                        origin,
                        d,
                        b,
                        back
                    );
                }
            }
        }
    }

    #[test]
    fn test_destination_keeps_altitude() {
        let origin = GeoPoint::new_unchecked(45.0, 7.0).with_altitude(812.0);
        assert_eq!(destination(&origin, 1000.0, 45.0).altitude, 812.0);
    }

    #[test]
    fn test_destination_wraps_antimeridian() {
        let origin = GeoPoint::new_unchecked(0.0, 179.99);
        let dest = destination(&origin, 5_000.0, 90.0);
        assert!(dest.longitude < -179.9 && dest.longitude >= -180.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new_unchecked(0.0, 0.0);
        assert_abs_diff_eq!(bearing(&origin, &GeoPoint::new_unchecked(1.0, 0.0)), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bearing(&origin, &GeoPoint::new_unchecked(0.0, 1.0)), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bearing(&origin, &GeoPoint::new_unchecked(-1.0, 0.0)), 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bearing(&origin, &GeoPoint::new_unchecked(0.0, -1.0)), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bearing_matches_destination() {
        let origin = GeoPoint::new_unchecked(48.85, 2.35);
        for b in [10.0, 95.0, 200.0, 333.0] {
            let dest = destination(&origin, 20_000.0, b);
            assert_abs_diff_eq!(bearing(&origin, &dest), b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_abs_diff_eq!(normalize_degrees(-90.0), 270.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_degrees(725.0), 5.0, epsilon = 1e-12);
        assert!(normalize_degrees(-1e-15) < 360.0);
    }

    #[test]
    fn test_local_cartesian_axes() {
        let origin = GeoPoint::new_unchecked(0.0, 0.0).with_altitude(100.0);
        let north = GeoPoint::new_unchecked(0.01, 0.0).with_altitude(150.0);
        let local = to_local_cartesian(&north, &origin);
        assert_abs_diff_eq!(local.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(local.y, EARTH_RADIUS_M * 0.01f64.to_radians(), epsilon = 1e-6);
        assert_abs_diff_eq!(local.z, 50.0, epsilon = 1e-12);

        let east = GeoPoint::new_unchecked(0.0, 0.01);
        assert!(to_local_cartesian(&east, &origin).x > 0.0);
    }

    #[test]
    fn test_local_cartesian_inverse() {
        let origin = GeoPoint::new_unchecked(45.0, 7.0).with_altitude(300.0);
        let p = GeoPoint::new_unchecked(45.02, 7.05).with_altitude(1200.0);
        let back = from_local_cartesian(&to_local_cartesian(&p, &origin), &origin);
        assert_abs_diff_eq!(back.latitude, p.latitude, epsilon = 1e-9);
        assert_abs_diff_eq!(back.longitude, p.longitude, epsilon = 1e-9);
        assert_abs_diff_eq!(back.altitude, p.altitude, epsilon = 1e-9);
    }

    #[test]
    fn test_local_cartesian_close_to_haversine_nearby() {
        let origin = GeoPoint::new_unchecked(40.0, -105.0);
        let p = destination(&origin, 3_000.0, 60.0);
        let local = to_local_cartesian(&p, &origin);
        let planar = local.x.hypot(local.y);
        assert!((planar - 3_000.0).abs() < 1.0);
    }
}
