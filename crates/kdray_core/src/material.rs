use glam::DVec3;

use crate::color::Color;
use crate::primitive::SurfacePoint;
use crate::state::RenderState;

/// Surface shading.
///
/// Directions point away from the surface: `wo` toward the viewer, `wl`
/// toward the light.
pub trait Material: Send + Sync {
    /// Light reflected toward `wo` for unit light arriving along `wl`.
    fn eval(&self, state: &RenderState, sp: &SurfacePoint, wo: DVec3, wl: DVec3) -> Color;

    /// Light emitted toward `wo`.
    fn emit(&self, _state: &RenderState, _sp: &SurfacePoint, _wo: DVec3) -> Color {
        Color::ZERO
    }

    /// Perfect mirror direction and its weight, for reflective materials.
    fn specular(&self, _state: &RenderState, _sp: &SurfacePoint, _wo: DVec3) -> Option<(DVec3, Color)> {
        None
    }

    fn alpha(&self, _state: &RenderState, _sp: &SurfacePoint, _wo: DVec3) -> f64 {
        1.0
    }
}
