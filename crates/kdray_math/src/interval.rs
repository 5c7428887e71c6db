/// A closed range of ray parameters or coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Splits the interval at `t`, returning `[min, t]` and `[t, max]`.
    pub fn split_at(&self, t: f64) -> (Interval, Interval) {
        (Interval::new(self.min, t), Interval::new(t, self.max))
    }
}
