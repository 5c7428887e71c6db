//! Analytic spheres.

use std::f64::consts::FRAC_1_PI;
use std::sync::Arc;

use kdray_core::{Collision, Material, Primitive, RayHit, SurfacePoint};
use kdray_math::{Aabb, DVec3, Ray};

/// Radius scale applied to bounds.
const BOUND_PAD: f64 = 1.0001;

pub struct Sphere {
    center: DVec3,
    radius: f64,
    material: Arc<dyn Material>,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64, material: Arc<dyn Material>) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            material,
        }
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Primitive for Sphere {
    fn bound(&self) -> Aabb {
        let r = DVec3::splat(self.radius * BOUND_PAD);
        Aabb::new(self.center - r, self.center + r)
    }

    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let half_b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        let near = (-half_b - sqrtd) / a;
        if near > ray.t_min {
            return Some(RayHit::new(near));
        }
        let far = (-half_b + sqrtd) / a;
        (far > ray.t_min).then(|| RayHit::new(far))
    }

    fn surface(&self, collision: &Collision<'_>) -> SurfacePoint {
        let position = collision.point();
        let offset = position - self.center;
        let normal = offset.try_normalize().unwrap_or(DVec3::Z);

        let mut sp = SurfacePoint::new(Arc::clone(&self.material), position, normal);
        sp.has_orco = true;
        sp.orco_position = offset;
        sp.orco_normal = normal;
        sp.has_uv = true;
        sp.u = normal.y.atan2(normal.x) * FRAC_1_PI + 1.0;
        sp.v = 1.0 - normal.z.clamp(-1.0, 1.0).acos() * FRAC_1_PI;
        sp
    }

    fn material(&self) -> Arc<dyn Material> {
        Arc::clone(&self.material)
    }
}
