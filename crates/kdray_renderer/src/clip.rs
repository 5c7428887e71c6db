//! Sutherland-Hodgman clipping of convex polygons against axis planes.
//!
//! Polygons are stored open: the last vertex connects back to the first.

use kdray_math::{Aabb, Axis, DVec3};

/// A triangle clipped against six planes has at most nine vertices.
pub const MAX_VERTICES: usize = 9;

pub type Polygon = Vec<DVec3>;

#[derive(Debug, Clone, PartialEq)]
pub enum PolyClip {
    /// Nothing remains.
    Empty,
    /// Too few or too many vertices survived for the result to be trusted.
    Degenerate,
    Clipped(Polygon, Aabb),
}

/// Keeps the part of `poly` with `p[axis] <= pos` (`keep_below`) or
/// `p[axis] >= pos`.
pub fn clip_plane(poly: &[DVec3], axis: Axis, pos: f64, keep_below: bool) -> PolyClip {
    finish(clip_once(poly, axis, pos, keep_below))
}

/// Clips `poly` against all six faces of `bound`.
pub fn clip_box(poly: &[DVec3], bound: &Aabb) -> PolyClip {
    let mut current: Polygon = poly.to_vec();
    for axis in Axis::ALL {
        for (pos, keep_below) in [(bound.min[axis], false), (bound.max[axis], true)] {
            current = clip_once(&current, axis, pos, keep_below);
            if current.is_empty() {
                return PolyClip::Empty;
            }
            if current.len() > MAX_VERTICES {
                return PolyClip::Degenerate;
            }
        }
    }
    finish(current)
}

fn finish(poly: Polygon) -> PolyClip {
    match poly.len() {
        0 => PolyClip::Empty,
        n if !(3..=MAX_VERTICES).contains(&n) => PolyClip::Degenerate,
        _ => {
            let bound = Aabb::from_points(poly.iter().copied());
            PolyClip::Clipped(poly, bound)
        }
    }
}

fn clip_once(poly: &[DVec3], axis: Axis, pos: f64, keep_below: bool) -> Polygon {
    let inside = |p: &DVec3| {
        if keep_below {
            p[axis] <= pos
        } else {
            p[axis] >= pos
        }
    };
    let crossing = |a: DVec3, b: DVec3| {
        let t = (pos - a[axis]) / (b[axis] - a[axis]);
        let mut p = a + (b - a) * t;
        // Exact on the plane regardless of rounding.
        p[axis] = pos;
        p
    };

    let mut out = Vec::with_capacity(poly.len() + 1);
    for (i, &cur) in poly.iter().enumerate() {
        let next = poly[(i + 1) % poly.len()];
        match (inside(&cur), inside(&next)) {
            (true, true) => out.push(cur),
            (true, false) => {
                out.push(cur);
                out.push(crossing(cur, next));
            }
            (false, true) => out.push(crossing(cur, next)),
            (false, false) => {}
        }
    }
    out
}
