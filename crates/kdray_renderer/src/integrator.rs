//! Integrators: map a camera ray to the color it carries back.

use std::f64::consts::{FRAC_1_PI, PI};
use std::sync::Arc;

use kdray_core::{Color, Integrator, Light, PhotonMap, RenderState, Rgba, Scene, SurfacePoint};
use kdray_math::{orthonormal_basis, DifferentialRay, DVec3, Ray};
use rand::Rng;

use crate::camera::concentric_disk;

/// Ray offset applied to secondary rays, relative to the scene's size.
const SCENE_BIAS: f64 = 5e-4;
const PDF_CUTOFF: f64 = 1e-6;

/// White where anything is hit, dim transparent gray elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrivialIntegrator;

impl Integrator for TrivialIntegrator {
    fn integrate(&self, scene: &Scene, _state: &mut RenderState, ray: &DifferentialRay) -> Rgba {
        match scene.intersect(&ray.ray, -1.0) {
            Some(_) => Rgba::new(1.0, 1.0, 1.0, 1.0),
            None => Rgba::new(0.1, 0.1, 0.1, 0.0),
        }
    }
}

/// Gray level `1 / t` of the nearest hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthIntegrator;

impl Integrator for DepthIntegrator {
    fn integrate(&self, scene: &Scene, _state: &mut RenderState, ray: &DifferentialRay) -> Rgba {
        match scene.intersect(&ray.ray, -1.0) {
            Some(hit) if hit.t > 0.0 => {
                let depth = (1.0 / (hit.t * ray.ray.direction.length())).min(1.0);
                Rgba::new(depth, depth, depth, 1.0)
            }
            _ => Rgba::TRANSPARENT,
        }
    }
}

/// Emission plus shadow-tested direct light from every light, with perfect
/// mirror recursion. Optionally adds ambient occlusion and a caustic photon
/// density estimate.
#[derive(Debug, Clone)]
pub struct DirectLightIntegrator {
    /// Deepest mirror bounce followed.
    pub ray_depth: u32,
    pub ambient_occlusion: Option<AmbientOcclusion>,
    caustics: Option<Arc<PhotonMap>>,
    /// Photons gathered per caustic lookup.
    pub caustic_search: usize,
    pub kernel: PhotonKernel,
    bias: f64,
}

/// Hemisphere visibility sampling around each diffuse hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientOcclusion {
    pub samples: u32,
    /// Occluders farther than this are ignored.
    pub distance: f64,
    pub color: Color,
}

impl AmbientOcclusion {
    pub fn new(samples: u32, distance: f64, color: Color) -> Self {
        Self {
            samples,
            distance,
            color,
        }
    }
}

/// Density estimation kernel over the gather disc. Both integrate to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhotonKernel {
    /// `3 / (pi r^2) * (1 - d^2 / r^2)^2`
    #[default]
    Smooth,
    /// `3 / (pi r^2) * (1 - d / r)`
    Cone,
}

impl PhotonKernel {
    /// Weight of a photon at squared distance `distance_sq` inside a disc of
    /// squared radius `radius_sq`.
    pub fn weight(self, distance_sq: f64, radius_sq: f64) -> f64 {
        let falloff = match self {
            PhotonKernel::Smooth => {
                let s = 1.0 - distance_sq / radius_sq;
                s * s
            }
            PhotonKernel::Cone => 1.0 - (distance_sq / radius_sq).sqrt(),
        };
        3.0 * FRAC_1_PI / radius_sq * falloff.max(0.0)
    }
}

impl Default for DirectLightIntegrator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl DirectLightIntegrator {
    pub fn new(ray_depth: u32) -> Self {
        Self {
            ray_depth,
            ambient_occlusion: None,
            caustics: None,
            caustic_search: 100,
            kernel: PhotonKernel::default(),
            bias: 1e-6,
        }
    }

    pub fn with_ambient_occlusion(mut self, ao: AmbientOcclusion) -> Self {
        self.ambient_occlusion = Some(ao);
        self
    }

    /// Adds the density estimate of a built caustic photon map. Lookups use
    /// the map's search radius.
    pub fn with_caustics(mut self, map: Arc<PhotonMap>, search: usize) -> Self {
        self.caustics = Some(map);
        self.caustic_search = search;
        self
    }

    fn trace(&self, scene: &Scene, state: &mut RenderState, ray: &Ray) -> Rgba {
        let Some(hit) = scene.intersect(ray, -1.0) else {
            return match scene.background() {
                Some(bg) => Rgba::from_color(bg.color(ray, state), 1.0),
                None => Rgba::TRANSPARENT,
            };
        };
        state.traveled += hit.t;

        let sp = hit.surface();
        let material = &sp.material;
        let wo = -ray.direction.normalize();
        let mut color = material.emit(state, &sp, wo);

        for light in scene.lights() {
            color += self.direct(scene, state, light.as_ref(), &sp, wo);
        }
        if let Some(light) = scene.background().and_then(|bg| bg.light()) {
            color += self.direct(scene, state, light, &sp, wo);
        }
        if let Some(map) = &self.caustics {
            color += self.estimate_photons(map, state, &sp, wo);
        }
        if let Some(ao) = &self.ambient_occlusion {
            color += self.occlusion(scene, state, ao, &sp, wo);
        }

        if state.ray_level < self.ray_depth {
            if let Some((dir, weight)) = material.specular(state, &sp, wo) {
                state.ray_level += 1;
                let reflected = Ray::new(sp.position, dir)
                    .with_range(self.bias, -1.0)
                    .with_time(ray.time);
                color += weight * self.trace(scene, state, &reflected).color();
                state.ray_level -= 1;
            }
        }

        Rgba::from_color(color, material.alpha(state, &sp, wo))
    }

    fn direct(
        &self,
        scene: &Scene,
        state: &RenderState,
        light: &dyn Light,
        sp: &SurfacePoint,
        wo: DVec3,
    ) -> Color {
        let Some(sample) = light.illuminate(sp) else {
            return Color::ZERO;
        };
        let far = sample.ray.max_distance() - self.bias;
        let shadow = sample.ray.with_range(self.bias, far.max(self.bias));
        if scene.shadowed(&shadow, -1.0) {
            return Color::ZERO;
        }
        sp.material.eval(state, sp, wo, sample.ray.direction) * sample.color
    }

    /// Reflected photon power around `sp`, per light path shot.
    fn estimate_photons(
        &self,
        map: &PhotonMap,
        state: &RenderState,
        sp: &SurfacePoint,
        wo: DVec3,
    ) -> Color {
        if !map.is_ready() || map.num_paths() == 0 {
            return Color::ZERO;
        }
        let radius = map.search_radius();
        let radius_sq = radius * radius;
        let mut sum = Color::ZERO;
        for found in map.gather(sp.position, self.caustic_search, radius) {
            let wl = found.photon.direction;
            let cos = sp.normal.dot(wl).abs();
            if cos <= PDF_CUTOFF {
                continue;
            }
            // Material evaluation carries the cosine; photon power already has it.
            let f = sp.material.eval(state, sp, wo, wl) / cos;
            sum += f * found.photon.color * self.kernel.weight(found.distance_sq, radius_sq);
        }
        sum / map.num_paths() as f64
    }

    /// Unoccluded fraction of the hemisphere facing `wo`, weighted by the
    /// material and tinted by the occlusion color.
    fn occlusion(
        &self,
        scene: &Scene,
        state: &mut RenderState,
        ao: &AmbientOcclusion,
        sp: &SurfacePoint,
        wo: DVec3,
    ) -> Color {
        let n = (ao.samples / state.ray_division.max(1)).max(1);
        let normal = if sp.normal.dot(wo) < 0.0 {
            -sp.normal
        } else {
            sp.normal
        };
        let (nu, nv) = orthonormal_basis(normal);

        let mut sum = Color::ZERO;
        for _ in 0..n {
            let disk = concentric_disk(state.rng.gen(), state.rng.gen());
            let cos = (1.0 - disk.length_squared()).max(0.0).sqrt();
            if cos <= PDF_CUTOFF {
                continue;
            }
            let dir = nu * disk.x + nv * disk.y + normal * cos;
            let ray = Ray::new(sp.position, dir)
                .with_range(self.bias, ao.distance)
                .with_time(state.time);
            if scene.shadowed(&ray, -1.0) {
                continue;
            }
            // Cosine-weighted directions: pdf = cos / pi.
            sum += sp.material.eval(state, sp, wo, dir) * (PI / cos);
        }
        ao.color * sum / n as f64
    }
}

impl Integrator for DirectLightIntegrator {
    fn preprocess(&mut self, scene: &Scene) {
        let size = scene.bound().size().length();
        if size > 0.0 {
            self.bias = size * SCENE_BIAS;
        }
    }

    fn integrate(&self, scene: &Scene, state: &mut RenderState, ray: &DifferentialRay) -> Rgba {
        self.trace(scene, state, &ray.ray)
    }
}
