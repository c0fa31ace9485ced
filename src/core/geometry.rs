//! Bearing math on the horizontal plane
//!
//! Yaw `0°` faces `+z` and yaw `90°` faces `-x`, so the unit direction of a
//! bearing `a` is `(-sin a, cos a)`.

use nalgebra::Vector2;

/// Wrap an angle in degrees into `(-180, 180]`
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Bearing in degrees from an origin to a target, `None` when they coincide
pub fn bearing_degrees(origin_x: f64, origin_z: f64, target_x: f64, target_z: f64) -> Option<f64> {
    let dx = target_x - origin_x;
    let dz = target_z - origin_z;
    if dx == 0.0 && dz == 0.0 {
        return None;
    }
    Some(normalize_angle((-dx).atan2(dz).to_degrees()))
}

/// Gradient of the bearing (radians) with respect to the target position (blocks)
pub fn bearing_gradient(origin_x: f64, origin_z: f64, target_x: f64, target_z: f64) -> Option<Vector2<f64>> {
    let dx = target_x - origin_x;
    let dz = target_z - origin_z;
    let dist_sq = dx * dx + dz * dz;
    if dist_sq == 0.0 {
        return None;
    }
    Some(Vector2::new(-dz / dist_sq, dx / dist_sq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalize_angle_range() {
        assert_abs_diff_eq!(normalize_angle(180.0), 180.0);
        assert_abs_diff_eq!(normalize_angle(-180.0), 180.0);
        assert_abs_diff_eq!(normalize_angle(190.0), -170.0);
        assert_abs_diff_eq!(normalize_angle(-190.0), 170.0);
        assert_abs_diff_eq!(normalize_angle(720.5), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(normalize_angle(0.0), 0.0);
    }

    #[test]
    fn test_bearing_axes() {
        // Facing +z is yaw 0, facing -x is yaw 90
        assert_abs_diff_eq!(bearing_degrees(0.0, 0.0, 0.0, 10.0).unwrap(), 0.0);
        assert_abs_diff_eq!(bearing_degrees(0.0, 0.0, -10.0, 0.0).unwrap(), 90.0);
        assert_abs_diff_eq!(bearing_degrees(0.0, 0.0, 10.0, 0.0).unwrap(), -90.0);
        assert_abs_diff_eq!(bearing_degrees(0.0, 0.0, 0.0, -10.0).unwrap(), 180.0);
        assert_abs_diff_eq!(bearing_degrees(0.0, 0.0, 50.0, 50.0).unwrap(), -45.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bearing_undefined_at_origin() {
        assert!(bearing_degrees(3.0, 4.0, 3.0, 4.0).is_none());
        assert!(bearing_gradient(3.0, 4.0, 3.0, 4.0).is_none());
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let (ox, oz, tx, tz) = (12.0, -40.0, 310.0, 95.0);
        let grad = bearing_gradient(ox, oz, tx, tz).unwrap();
        let h = 1e-4;
        let base = bearing_degrees(ox, oz, tx, tz).unwrap().to_radians();
        let along_x = bearing_degrees(ox, oz, tx + h, tz).unwrap().to_radians();
        let along_z = bearing_degrees(ox, oz, tx, tz + h).unwrap().to_radians();
        assert_abs_diff_eq!((along_x - base) / h, grad.x, epsilon = 1e-8);
        assert_abs_diff_eq!((along_z - base) / h, grad.y, epsilon = 1e-8);
    }
}
