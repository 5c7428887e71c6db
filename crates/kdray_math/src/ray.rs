use crate::DVec3;

/// A ray in 3D space with origin, direction, valid parameter range and time.
///
/// `t_max < 0` means the ray is unbounded. The direction is not required to be
/// unit length for bound tests; primitives that need it normalize themselves.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
    pub t_min: f64,
    pub t_max: f64,
    pub time: f64,
}

impl Ray {
    /// Create an unbounded ray starting at `t = 0`.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction,
            t_min: 0.0,
            t_max: -1.0,
            time: 0.0,
        }
    }

    /// Sets the accepted parameter range.
    pub fn with_range(mut self, t_min: f64, t_max: f64) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Far limit, with a negative `t_max` read as infinity.
    #[inline]
    pub fn max_distance(&self) -> f64 {
        if self.t_max < 0.0 {
            f64::INFINITY
        } else {
            self.t_max
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

/// A primary ray with optional offsets for the neighbouring pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DifferentialRay {
    pub ray: Ray,
    pub from_x: DVec3,
    pub from_y: DVec3,
    pub dir_x: DVec3,
    pub dir_y: DVec3,
    pub has_differentials: bool,
}

impl DifferentialRay {
    /// Wraps a ray without differentials.
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            from_x: DVec3::ZERO,
            from_y: DVec3::ZERO,
            dir_x: DVec3::ZERO,
            dir_y: DVec3::ZERO,
            has_differentials: false,
        }
    }

    /// Attaches the rays through the pixel one step right and one step down.
    pub fn with_differentials(mut self, x: &Ray, y: &Ray) -> Self {
        self.from_x = x.origin;
        self.dir_x = x.direction;
        self.from_y = y.origin;
        self.dir_y = y.direction;
        self.has_differentials = true;
        self
    }
}

impl From<Ray> for DifferentialRay {
    fn from(ray: Ray) -> Self {
        DifferentialRay::new(ray)
    }
}
