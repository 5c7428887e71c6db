//! Minimal collaborators for unit tests.

use std::sync::Arc;

use kdray_math::{Aabb, DVec3, Ray};
use rand::rngs::StdRng;
use rand::Rng;

use crate::camera::Camera;
use crate::color::Color;
use crate::material::Material;
use crate::primitive::{Collision, Primitive, RayHit, SurfacePoint};
use crate::state::RenderState;

pub(crate) struct FlatMaterial;

impl Material for FlatMaterial {
    fn eval(&self, _state: &RenderState, _sp: &SurfacePoint, _wo: DVec3, _wl: DVec3) -> Color {
        Color::splat(0.5)
    }
}

pub(crate) struct TestSphere {
    center: DVec3,
    radius: f64,
    material: Arc<dyn Material>,
}

impl TestSphere {
    pub(crate) fn new(center: DVec3, radius: f64) -> Self {
        Self {
            center,
            radius,
            material: Arc::new(FlatMaterial),
        }
    }
}

impl Primitive for TestSphere {
    fn bound(&self) -> Aabb {
        Aabb::new(self.center - self.radius, self.center + self.radius)
    }

    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let half_b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = half_b * half_b - a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let near = (-half_b - root) / a;
        let far = (-half_b + root) / a;
        [near, far]
            .into_iter()
            .find(|&t| t > ray.t_min)
            .map(RayHit::new)
    }

    fn surface(&self, collision: &Collision<'_>) -> SurfacePoint {
        let p = collision.point();
        SurfacePoint::new(self.material(), p, (p - self.center).normalize())
    }

    fn material(&self) -> Arc<dyn Material> {
        Arc::clone(&self.material)
    }
}

pub(crate) fn random_spheres(rng: &mut StdRng, n: usize) -> Vec<Arc<TestSphere>> {
    (0..n)
        .map(|_| {
            let c = DVec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            Arc::new(TestSphere::new(c, rng.gen_range(0.1..0.8)))
        })
        .collect()
}

/// Pinhole looking down -Z from `(0, 0, 5)`.
pub(crate) struct TestCamera {
    pub(crate) width: usize,
    pub(crate) height: usize,
}

impl Camera for TestCamera {
    fn resolution_x(&self) -> usize {
        self.width
    }

    fn resolution_y(&self) -> usize {
        self.height
    }

    fn sample_lens(&self) -> bool {
        false
    }

    fn shoot_ray(&self, x: f64, y: f64, _lens_u: f64, _lens_v: f64) -> (Ray, f64) {
        let u = x / self.width as f64 - 0.5;
        let v = 0.5 - y / self.height as f64;
        let dir = DVec3::new(u, v, -1.0).normalize();
        (Ray::new(DVec3::new(0.0, 0.0, 5.0), dir), 1.0)
    }
}
