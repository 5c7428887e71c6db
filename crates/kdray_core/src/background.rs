use kdray_math::Ray;

use crate::color::Color;
use crate::light::Light;
use crate::state::RenderState;

/// What a ray sees when it leaves the scene.
pub trait Background: Send + Sync {
    fn color(&self, ray: &Ray, state: &RenderState) -> Color;

    /// A light standing in for the background, if it illuminates the scene.
    fn light(&self) -> Option<&dyn Light> {
        None
    }

    fn light_mut(&mut self) -> Option<&mut dyn Light> {
        None
    }
}
