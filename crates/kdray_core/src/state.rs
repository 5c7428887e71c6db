//! Per-sample render state and the fragments a render produces.

use std::any::Any;

use glam::DVec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::color::Rgba;

/// Mutable bundle handed to the integrator for one pixel sample.
///
/// Never shared: every render task owns its state, PRNG included.
pub struct RenderState {
    /// Recursion level of the current ray.
    pub ray_level: u32,
    pub depth: u32,
    pub contribution: f64,
    pub current_pass: u32,
    pub pixel_sample: u32,
    pub ray_division: u32,
    pub ray_offset: u32,
    pub dc1: f64,
    pub dc2: f64,
    pub traveled: f64,
    pub pixel_number: usize,
    pub sampling_offset: u32,
    /// Pixel position in normalized device coordinates.
    pub screen_pos: DVec3,
    pub chromatic: bool,
    pub include_lights: bool,
    pub wavelength: f64,
    pub time: f64,
    pub rng: StdRng,
    /// Scratch space for the material being evaluated.
    pub material_data: Option<Box<dyn Any + Send>>,
}

impl RenderState {
    pub fn new(seed: u64) -> Self {
        Self {
            ray_level: 0,
            depth: 0,
            contribution: 1.0,
            current_pass: 0,
            pixel_sample: 0,
            ray_division: 1,
            ray_offset: 0,
            dc1: 0.0,
            dc2: 0.0,
            traveled: 0.0,
            pixel_number: 0,
            sampling_offset: 0,
            screen_pos: DVec3::ZERO,
            chromatic: true,
            include_lights: false,
            wavelength: 0.0,
            time: 0.0,
            rng: StdRng::seed_from_u64(seed),
            material_data: None,
        }
    }

    /// Restores per-ray defaults between samples, keeping the PRNG and pixel.
    pub fn reset(&mut self) {
        self.ray_level = 0;
        self.depth = 0;
        self.contribution = 1.0;
        self.ray_division = 1;
        self.ray_offset = 0;
        self.dc1 = 0.0;
        self.dc2 = 0.0;
        self.traveled = 0.0;
        self.chromatic = true;
        self.include_lights = false;
        self.wavelength = 0.0;
        self.material_data = None;
    }
}

/// One finished pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub x: usize,
    pub y: usize,
    pub color: Rgba,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_state_defaults_and_reset() {
        let mut state = RenderState::new(7);
        assert_eq!(state.ray_division, 1);
        assert!(state.chromatic);

        state.ray_level = 3;
        state.chromatic = false;
        state.material_data = Some(Box::new(1.5f64));
        state.pixel_number = 12;
        state.reset();
        assert_eq!(state.ray_level, 0);
        assert!(state.chromatic);
        assert!(state.material_data.is_none());
        assert_eq!(state.pixel_number, 12);
    }

    #[test]
    fn test_state_rng_is_seeded() {
        let mut a = RenderState::new(42);
        let mut b = RenderState::new(42);
        let xs: Vec<f64> = (0..4).map(|_| a.rng.gen()).collect();
        let ys: Vec<f64> = (0..4).map(|_| b.rng.gen()).collect();
        assert_eq!(xs, ys);
    }
}
