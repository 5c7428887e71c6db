//! Bucket decomposition of the image.
//!
//! The image is cut into square buckets that are rendered independently.
//! Buckets are ordered from the center outward.

/// A rectangular region of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Top-left corner
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    /// Position in render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: usize, y: usize, width: usize, height: usize, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Pixel coordinates in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Default bucket edge in pixels.
pub const DEFAULT_BUCKET_SIZE: usize = 32;

/// Covers a `width` x `height` image with buckets, center first.
pub fn generate_buckets(width: usize, height: usize, bucket_size: usize) -> Vec<Bucket> {
    let size = bucket_size.max(1);
    let mut buckets = Vec::new();
    for y in (0..height).step_by(size) {
        for x in (0..width).step_by(size) {
            let bw = size.min(width - x);
            let bh = size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, buckets.len()));
        }
    }

    sort_spiral(&mut buckets, width, height);
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }
    buckets
}

/// Orders buckets by distance of their centers from the image center.
/// The sort is stable, so equidistant buckets keep row-major order.
fn sort_spiral(buckets: &mut [Bucket], width: usize, height: usize) {
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let dist = |b: &Bucket| {
        let bx = b.x as f64 + b.width as f64 / 2.0;
        let by = b.y as f64 + b.height as f64 / 2.0;
        (bx - cx).powi(2) + (by - cy).powi(2)
    };
    buckets.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_buckets_exact_fit() {
        let buckets = generate_buckets(128, 128, 64);
        assert_eq!(buckets.len(), 4);
        let total: usize = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total, 128 * 128);
    }

    #[test]
    fn test_generate_buckets_partial_fit() {
        let buckets = generate_buckets(100, 70, 64);
        assert_eq!(buckets.len(), 4);
        let total: usize = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total, 100 * 70);
    }

    #[test]
    fn test_spiral_order() {
        let buckets = generate_buckets(192, 192, 64);
        assert_eq!(buckets.len(), 9);
        assert_eq!((buckets[0].x, buckets[0].y), (64, 64));
        assert!(buckets.iter().enumerate().all(|(i, b)| b.index == i));
    }

    #[test]
    fn test_every_pixel_once() {
        let mut seen = vec![0u8; 37 * 23];
        for bucket in generate_buckets(37, 23, 8) {
            for (x, y) in bucket.pixels() {
                seen[y * 37 + x] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_empty_image() {
        assert!(generate_buckets(0, 10, 8).is_empty());
    }
}
