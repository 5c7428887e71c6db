use kdray_math::{Aabb, Ray};

use crate::color::Color;

/// A participating medium occupying part of the scene.
pub trait VolumeRegion: Send + Sync {
    fn bound(&self) -> Aabb;

    /// Fraction of light surviving along `ray` up to its `t_max`.
    fn transmittance(&self, _ray: &Ray) -> Color {
        Color::ONE
    }
}
