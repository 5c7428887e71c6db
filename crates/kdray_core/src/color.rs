//! Color values.

use std::ops::{Add, AddAssign, Div, Mul};

use glam::DVec3;

/// Linear RGB color.
pub type Color = DVec3;

/// Linear RGB color with alpha, as produced by integrators.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_color(color: Color, alpha: f64) -> Self {
        Self::new(color.x, color.y, color.z, alpha)
    }

    pub fn color(&self) -> Color {
        Color::new(self.r, self.g, self.b)
    }
}

impl Add for Rgba {
    type Output = Rgba;

    fn add(self, o: Rgba) -> Rgba {
        Rgba::new(self.r + o.r, self.g + o.g, self.b + o.b, self.a + o.a)
    }
}

impl AddAssign for Rgba {
    fn add_assign(&mut self, o: Rgba) {
        *self = *self + o;
    }
}

impl Mul<f64> for Rgba {
    type Output = Rgba;

    fn mul(self, s: f64) -> Rgba {
        Rgba::new(self.r * s, self.g * s, self.b * s, self.a * s)
    }
}

impl Div<f64> for Rgba {
    type Output = Rgba;

    fn div(self, s: f64) -> Rgba {
        Rgba::new(self.r / s, self.g / s, self.b / s, self.a / s)
    }
}
