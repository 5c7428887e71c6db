//! Cameras for primary ray generation.
//!
//! Image coordinates run from `(0, 0)` at the top-left corner to
//! `(width, height)` at the bottom-right; the driver passes pixel centers as
//! `x + 0.5`.

use std::f64::consts::FRAC_PI_4;

use kdray_core::Camera;
use kdray_math::{DVec2, DVec3, Ray};

/// Right-handed view basis.
#[derive(Debug, Clone, Copy)]
struct Basis {
    forward: DVec3,
    right: DVec3,
    up: DVec3,
}

impl Basis {
    fn looking(from: DVec3, at: DVec3, vup: DVec3) -> Self {
        let forward = (at - from).normalize();
        let right = forward.cross(vup).normalize();
        let up = right.cross(forward);
        Self { forward, right, up }
    }
}

/// Maps image coordinates to `[-1, 1]` screen space, `y` up.
#[inline]
fn screen(x: f64, y: f64, width: usize, height: usize) -> DVec2 {
    DVec2::new(2.0 * x / width as f64 - 1.0, 1.0 - 2.0 * y / height as f64)
}

/// Pinhole or thin-lens perspective camera.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub width: usize,
    pub height: usize,

    look_from: DVec3,
    look_at: DVec3,
    vup: DVec3,

    /// Vertical field of view in radians.
    vfov: f64,
    /// Width over height of a pixel.
    pixel_aspect: f64,
    aperture: f64,
    focus_dist: f64,

    basis: Basis,
    half_height: f64,
    half_width: f64,
}

impl PerspectiveCamera {
    /// Camera at the origin looking down -Z with a 45 degree field of view.
    pub fn new(width: usize, height: usize) -> Self {
        let mut cam = Self {
            width,
            height,
            look_from: DVec3::ZERO,
            look_at: DVec3::NEG_Z,
            vup: DVec3::Y,
            vfov: FRAC_PI_4,
            pixel_aspect: 1.0,
            aperture: 0.0,
            focus_dist: 1.0,
            basis: Basis::looking(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y),
            half_height: 0.0,
            half_width: 0.0,
        };
        cam.initialize();
        cam
    }

    pub fn with_position(mut self, look_from: DVec3, look_at: DVec3, vup: DVec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    /// `vfov` in degrees.
    pub fn with_fov(mut self, vfov: f64) -> Self {
        self.vfov = vfov.to_radians();
        self.initialize();
        self
    }

    pub fn with_aspect(mut self, pixel_aspect: f64) -> Self {
        self.pixel_aspect = pixel_aspect;
        self.initialize();
        self
    }

    /// Lens radius and the distance of the plane in perfect focus.
    pub fn with_lens(mut self, aperture: f64, focus_dist: f64) -> Self {
        self.aperture = aperture.max(0.0);
        self.focus_dist = focus_dist;
        self
    }

    pub fn position(&self) -> DVec3 {
        self.look_from
    }

    fn initialize(&mut self) {
        self.basis = Basis::looking(self.look_from, self.look_at, self.vup);
        self.half_height = (self.vfov / 2.0).tan();
        self.half_width =
            self.half_height * self.pixel_aspect * self.width as f64 / self.height.max(1) as f64;
    }
}

impl Camera for PerspectiveCamera {
    fn resolution_x(&self) -> usize {
        self.width
    }

    fn resolution_y(&self) -> usize {
        self.height
    }

    fn sample_lens(&self) -> bool {
        self.aperture > 0.0
    }

    fn shoot_ray(&self, x: f64, y: f64, lens_u: f64, lens_v: f64) -> (Ray, f64) {
        let s = screen(x, y, self.width, self.height);
        let b = &self.basis;
        let dir = (b.forward + b.right * (s.x * self.half_width) + b.up * (s.y * self.half_height))
            .normalize();
        if self.aperture <= 0.0 {
            return (Ray::new(self.look_from, dir), 1.0);
        }

        let focus = self.look_from + dir * (self.focus_dist / dir.dot(b.forward));
        let lens = concentric_disk(lens_u, lens_v) * self.aperture;
        let origin = self.look_from + b.right * lens.x + b.up * lens.y;
        (Ray::new(origin, (focus - origin).normalize()), 1.0)
    }
}

/// Parallel projection covering `scale` world units vertically.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    pub width: usize,
    pub height: usize,
    position: DVec3,
    basis: Basis,
    half_height: f64,
    half_width: f64,
}

impl OrthographicCamera {
    pub fn new(
        width: usize,
        height: usize,
        look_from: DVec3,
        look_at: DVec3,
        vup: DVec3,
        scale: f64,
    ) -> Self {
        let half_height = scale / 2.0;
        Self {
            width,
            height,
            position: look_from,
            basis: Basis::looking(look_from, look_at, vup),
            half_height,
            half_width: half_height * width as f64 / height.max(1) as f64,
        }
    }
}

impl Camera for OrthographicCamera {
    fn resolution_x(&self) -> usize {
        self.width
    }

    fn resolution_y(&self) -> usize {
        self.height
    }

    fn sample_lens(&self) -> bool {
        false
    }

    fn shoot_ray(&self, x: f64, y: f64, _lens_u: f64, _lens_v: f64) -> (Ray, f64) {
        let s = screen(x, y, self.width, self.height);
        let b = &self.basis;
        let origin = self.position + b.right * (s.x * self.half_width) + b.up * (s.y * self.half_height);
        (Ray::new(origin, b.forward), 1.0)
    }
}

/// Shirley-Chiu map from the unit square to the unit disk.
pub fn concentric_disk(u: f64, v: f64) -> DVec2 {
    let a = 2.0 * u - 1.0;
    let b = 2.0 * v - 1.0;
    if a == 0.0 && b == 0.0 {
        return DVec2::ZERO;
    }
    let (r, phi) = if a * a > b * b {
        (a, FRAC_PI_4 * (b / a))
    } else {
        (b, 2.0 * FRAC_PI_4 - FRAC_PI_4 * (a / b))
    };
    DVec2::new(r * phi.cos(), r * phi.sin())
}
