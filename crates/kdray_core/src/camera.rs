use kdray_math::Ray;

/// Produces primary rays for image-plane positions.
pub trait Camera: Send + Sync {
    fn resolution_x(&self) -> usize;

    fn resolution_y(&self) -> usize;

    /// Whether `shoot_ray` uses its lens coordinates.
    fn sample_lens(&self) -> bool;

    /// Ray through pixel position `(x, y)`, with `(lens_u, lens_v)` in `[0, 1)`.
    /// The weight scales the radiance carried back along the ray.
    fn shoot_ray(&self, x: f64, y: f64, lens_u: f64, lens_v: f64) -> (Ray, f64);
}
