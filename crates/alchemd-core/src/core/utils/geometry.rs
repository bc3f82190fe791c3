use nalgebra::Point3;
use std::f64::consts::{PI, TAU};

pub fn distance(p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
    (p2 - p1).norm()
}

/// Angle p1-p2-p3 at the vertex `p2`, in radians within `[0, π]`.
///
/// Returns `None` if either arm has zero length.
pub fn angle(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> Option<f64> {
    let v1 = p1 - p2;
    let v2 = p3 - p2;
    let norms = v1.norm() * v2.norm();
    if norms == 0.0 {
        return None;
    }
    Some((v1.dot(&v2) / norms).clamp(-1.0, 1.0).acos())
}

/// Dihedral angle p1-p2-p3-p4 in radians within `(-π, π]` (IUPAC sign convention).
///
/// Returns `None` if three consecutive points are collinear.
pub fn dihedral(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    p4: &Point3<f64>,
) -> Option<f64> {
    let b1 = p2 - p1;
    let b2 = p3 - p2;
    let b3 = p4 - p3;

    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    if n1.norm_squared() == 0.0 || n2.norm_squared() == 0.0 {
        return None;
    }

    let y = b2.norm() * b1.dot(&n2);
    let x = n1.dot(&n2);
    Some(y.atan2(x))
}

/// Shortest separation of two angles on the circle, in `[0, π]`.
pub fn periodic_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_angle(a: f64) -> f64 {
    let wrapped = (a + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI { PI } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn distance_is_euclidean() {
        let d = distance(&Point3::new(0.0, 0.0, 0.0), &Point3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(d, 5.0);
    }

    #[test]
    fn angle_is_measured_at_the_middle_point() {
        let a = angle(
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::origin(),
            &Point3::new(0.0, 2.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(a, FRAC_PI_2, epsilon = 1e-12);

        let straight = angle(
            &Point3::new(-1.0, 0.0, 0.0),
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(straight, PI, epsilon = 1e-12);
    }

    #[test]
    fn angle_with_degenerate_arm_is_none() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(angle(&p, &p, &Point3::origin()).is_none());
    }

    #[test]
    fn dihedral_follows_iupac_sign_convention() {
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::origin();
        let p3 = Point3::new(0.0, 0.0, 1.0);

        let plus = dihedral(&p1, &p2, &p3, &Point3::new(0.0, 1.0, 1.0)).unwrap();
        let minus = dihedral(&p1, &p2, &p3, &Point3::new(0.0, -1.0, 1.0)).unwrap();
        let trans = dihedral(&p1, &p2, &p3, &Point3::new(-1.0, 0.0, 1.0)).unwrap();
        let cis = dihedral(&p1, &p2, &p3, &Point3::new(1.0, 0.0, 1.0)).unwrap();

        assert_relative_eq!(plus, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(minus, -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(trans.abs(), PI, epsilon = 1e-12);
        assert_relative_eq!(cis, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn dihedral_with_collinear_points_is_none() {
        let d = dihedral(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0),
            &Point3::new(2.0, 1.0, 0.0),
        );
        assert!(d.is_none());
    }

    #[test]
    fn periodic_difference_wraps_around() {
        assert_relative_eq!(periodic_difference(3.0, -3.0), TAU - 6.0, epsilon = 1e-12);
        assert_relative_eq!(periodic_difference(0.5, 0.2), 0.3, epsilon = 1e-12);
        assert_relative_eq!(periodic_difference(-0.2, 0.5), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn wrap_angle_maps_into_half_open_interval() {
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(0.25), 0.25, epsilon = 1e-12);
    }
}
