use kdray_math::Ray;

use crate::color::Color;
use crate::primitive::SurfacePoint;
use crate::scene::Scene;

/// Light arriving at a surface point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Radiance reaching the point, falloff included.
    pub color: Color,
    /// Shadow ray from the point toward the light, `t_max` at the light.
    pub ray: Ray,
}

pub trait Light: Send + Sync {
    /// Called by [`Scene::update`] whenever the light set changed, so the
    /// light can derive scene-dependent quantities.
    fn set_scene(&mut self, _scene: &Scene) {}

    fn num_samples(&self) -> usize {
        1
    }

    /// Total emitted power.
    fn total_energy(&self) -> Color;

    /// Illumination of `sp`, or `None` if the light cannot reach it.
    fn illuminate(&self, sp: &SurfacePoint) -> Option<LightSample>;
}
