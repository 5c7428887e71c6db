//! Surface materials.

use std::f64::consts::FRAC_1_PI;

use kdray_core::{Color, Material, RenderState, SurfacePoint};
use kdray_math::DVec3;

/// Normal flipped to the side `wo` lies on.
#[inline]
fn facing_normal(sp: &SurfacePoint, wo: DVec3) -> DVec3 {
    if sp.normal.dot(wo) < 0.0 {
        -sp.normal
    } else {
        sp.normal
    }
}

/// Shows the shading normal as a color, independent of lighting.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugMaterial;

impl Material for DebugMaterial {
    fn eval(&self, _state: &RenderState, _sp: &SurfacePoint, _wo: DVec3, _wl: DVec3) -> Color {
        Color::ZERO
    }

    fn emit(&self, _state: &RenderState, sp: &SurfacePoint, _wo: DVec3) -> Color {
        sp.normal * 0.5 + 0.5
    }
}

/// Lambertian diffuse with an optional perfect mirror layer.
#[derive(Debug, Clone, Copy)]
pub struct Lambert {
    pub color: Color,
    /// Fraction of light mirrored, in `[0, 1]`.
    pub reflectivity: f64,
}

impl Lambert {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            reflectivity: 0.0,
        }
    }

    pub fn with_reflectivity(mut self, reflectivity: f64) -> Self {
        self.reflectivity = reflectivity.clamp(0.0, 1.0);
        self
    }
}

impl Material for Lambert {
    fn eval(&self, _state: &RenderState, sp: &SurfacePoint, wo: DVec3, wl: DVec3) -> Color {
        let n = facing_normal(sp, wo);
        let cos = n.dot(wl);
        if cos <= 0.0 {
            return Color::ZERO;
        }
        self.color * ((1.0 - self.reflectivity) * FRAC_1_PI * cos)
    }

    fn specular(&self, _state: &RenderState, sp: &SurfacePoint, wo: DVec3) -> Option<(DVec3, Color)> {
        if self.reflectivity <= 0.0 {
            return None;
        }
        let n = facing_normal(sp, wo);
        let dir = 2.0 * n.dot(wo) * n - wo;
        Some((dir.normalize(), Color::splat(self.reflectivity)))
    }
}
