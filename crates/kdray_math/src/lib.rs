// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod axis;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use axis::Axis;
pub use interval::Interval;
pub use ray::{DifferentialRay, Ray};

/// Builds two unit vectors completing an orthonormal basis with `n`.
///
/// `n` must be normalized.
pub fn orthonormal_basis(n: DVec3) -> (DVec3, DVec3) {
    if n.x == 0.0 && n.y == 0.0 {
        let u = if n.z < 0.0 { DVec3::NEG_X } else { DVec3::X };
        return (u, DVec3::Y);
    }
    let d = 1.0 / (n.x * n.x + n.y * n.y).sqrt();
    let u = DVec3::new(n.y * d, -n.x * d, 0.0);
    (u, n.cross(u))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dvec3_operations() {
        let a = DVec3::new(1.0, 2.0, 3.0);
        let b = DVec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, DVec3::new(5.0, 7.0, 9.0));
    }

    #[test]
    fn test_orthonormal_basis() {
        for n in [
            DVec3::Z,
            DVec3::NEG_Z,
            DVec3::X,
            DVec3::new(1.0, 2.0, 3.0).normalize(),
        ] {
            let (u, v) = orthonormal_basis(n);
            assert!((u.length() - 1.0).abs() < 1e-12);
            assert!((v.length() - 1.0).abs() < 1e-12);
            assert!(u.dot(n).abs() < 1e-12);
            assert!(v.dot(n).abs() < 1e-12);
            assert!(u.dot(v).abs() < 1e-12);
        }
    }
}
