//! Light sources and backgrounds.

use std::f64::consts::PI;

use kdray_core::{Background, Color, Light, LightSample, RenderState, SurfacePoint};
use kdray_math::{DVec3, Ray};

/// Isotropic point light with inverse-square falloff.
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: DVec3,
    pub color: Color,
    pub power: f64,
}

impl PointLight {
    pub fn new(position: DVec3, color: Color, power: f64) -> Self {
        Self {
            position,
            color,
            power,
        }
    }
}

impl Light for PointLight {
    fn total_energy(&self) -> Color {
        self.color * (self.power * 4.0 * PI)
    }

    fn illuminate(&self, sp: &SurfacePoint) -> Option<LightSample> {
        let to_light = self.position - sp.position;
        let dist_sq = to_light.length_squared();
        if dist_sq == 0.0 {
            return None;
        }
        let dist = dist_sq.sqrt();
        Some(LightSample {
            color: self.color * (self.power / dist_sq),
            ray: Ray::new(sp.position, to_light / dist).with_range(0.0, dist),
        })
    }
}

/// A single color in every direction.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBackground {
    pub color: Color,
}

impl ConstantBackground {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Background for ConstantBackground {
    fn color(&self, _ray: &Ray, _state: &RenderState) -> Color {
        self.color
    }
}
