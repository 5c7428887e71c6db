use kdray_math::DifferentialRay;

use crate::color::Rgba;
use crate::scene::Scene;
use crate::state::RenderState;

/// Maps a camera ray to the color it carries back.
pub trait Integrator: Send + Sync {
    /// Runs once per render, after [`Scene::update`], before any `integrate`.
    fn preprocess(&mut self, _scene: &Scene) {}

    /// `state` is owned by the calling task for the duration of the call.
    fn integrate(&self, scene: &Scene, state: &mut RenderState, ray: &DifferentialRay) -> Rgba;
}
