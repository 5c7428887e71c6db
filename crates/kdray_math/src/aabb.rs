use std::fmt;

use crate::{Axis, DVec3, Interval};

/// Axis-Aligned Bounding Box used by the kd-tree and by every primitive.
///
/// The all-zero box is a sentinel meaning "empty/unset": [`Aabb::union`]
/// against it adopts the other operand.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Aabb {
    /// The empty/unset sentinel.
    pub const ZERO: Aabb = Aabb {
        min: DVec3::ZERO,
        max: DVec3::ZERO,
    };

    /// Create an AABB from two corner points, in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// A degenerate box containing a single point.
    pub fn from_point(p: DVec3) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box containing every point, or the zero box for none.
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::ZERO;
        };
        iter.fold(Self::from_point(first), |b, p| b.include(p))
    }

    /// Returns true for the zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.min == DVec3::ZERO && self.max == DVec3::ZERO
    }

    /// Create an AABB that surrounds two other AABBs. The zero box is the identity.
    pub fn union(&self, other: &Aabb) -> Aabb {
        if self.is_zero() {
            return *other;
        }
        if other.is_zero() {
            return *self;
        }
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Create an AABB that surrounds two other AABBs, with no zero-box special case.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Aabb {
        Aabb {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Extends the box to contain `p`.
    pub fn include(&self, p: DVec3) -> Aabb {
        Aabb {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    /// Returns true if the closed boxes share at least one point.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// The common part of two boxes, or `None` if they are disjoint.
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        })
    }

    /// Slab test (Smits' method) against a ray segment starting at `origin`.
    ///
    /// Returns the parametric `[enter, exit]` range where the ray overlaps the
    /// box, or `None` when the box is behind the ray, beyond `dist`, or missed.
    /// `enter` may be negative when the origin is inside the box.
    pub fn cross(&self, origin: DVec3, direction: DVec3, dist: f64) -> Option<Interval> {
        let p = origin - self.min;
        let extent = self.max - self.min;
        let mut lmin = f64::NEG_INFINITY;
        let mut lmax = f64::INFINITY;

        for axis in Axis::ALL {
            let d = direction[axis];
            if d == 0.0 {
                // Parallel to this slab.
                if p[axis] < 0.0 || p[axis] > extent[axis] {
                    return None;
                }
                continue;
            }
            let mut t1 = -p[axis] / d;
            let mut t2 = (extent[axis] - p[axis]) / d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            lmin = lmin.max(t1);
            lmax = lmax.min(t2);
            if lmax < 0.0 || lmin > dist {
                return None;
            }
        }

        if lmin <= lmax && lmax >= 0.0 && lmin <= dist {
            Some(Interval::new(lmin, lmax))
        } else {
            None
        }
    }

    /// Extent along each axis.
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Grows every face outward by `d`.
    pub fn grow(&self, d: f64) -> Aabb {
        self.grow_by(DVec3::splat(d))
    }

    /// Grows the faces outward by a per-axis amount.
    pub fn grow_by(&self, d: DVec3) -> Aabb {
        Aabb {
            min: self.min - d,
            max: self.max + d,
        }
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {}, {}), ({}, {}, {})]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
