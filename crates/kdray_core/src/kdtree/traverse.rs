//! Ordered ray descent through a built tree.

use kdray_math::{Interval, Ray};

use super::{KdData, KdTree, Node, NodeId};
use crate::primitive::RayHit;

const STACK_DEPTH: usize = 64;

impl<D: KdData> KdTree<D> {
    /// Nearest value hit by `ray` with `t_min < t <= dist`.
    ///
    /// `intersect` is called for every value in each visited leaf and returns
    /// the value's hit along the ray, if any. Cells are visited front to back,
    /// so the walk stops at the first leaf whose exit lies beyond the best hit.
    pub fn nearest<F>(&self, ray: &Ray, dist: f64, mut intersect: F) -> Option<(u32, RayHit)>
    where
        F: FnMut(usize, &Ray) -> Option<RayHit>,
    {
        if self.data.is_empty() {
            return None;
        }
        let span = self.bound.cross(ray.origin, ray.direction, dist)?;

        let mut best: Option<(u32, RayHit)> = None;
        let mut best_t = dist;
        let mut stack: Vec<(NodeId, Interval)> = Vec::with_capacity(STACK_DEPTH);
        stack.push((self.root, span));

        while let Some((id, span)) = stack.pop() {
            if span.min > best_t {
                continue;
            }
            let (leaf, span) = self.descend(ray, id, span, &mut stack);
            for &i in self.leaf_indices(leaf) {
                if let Some(hit) = intersect(i as usize, ray) {
                    let closer = hit.t < best_t || (best.is_none() && hit.t == best_t);
                    if hit.t > ray.t_min && closer {
                        best_t = hit.t;
                        best = Some((i, hit));
                    }
                }
            }
            if best.is_some() && best_t <= span.max {
                break;
            }
        }
        best
    }

    /// Returns true as soon as any value is hit with `t_min < t < dist`.
    pub fn any_hit<F>(&self, ray: &Ray, dist: f64, mut intersect: F) -> bool
    where
        F: FnMut(usize, &Ray) -> Option<RayHit>,
    {
        if self.data.is_empty() {
            return false;
        }
        let Some(span) = self.bound.cross(ray.origin, ray.direction, dist) else {
            return false;
        };

        let mut stack: Vec<(NodeId, Interval)> = Vec::with_capacity(STACK_DEPTH);
        stack.push((self.root, span));
        while let Some((id, span)) = stack.pop() {
            let (leaf, _) = self.descend(ray, id, span, &mut stack);
            for &i in self.leaf_indices(leaf) {
                if let Some(hit) = intersect(i as usize, ray) {
                    if hit.t > ray.t_min && hit.t < dist {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Follows near children from `id` down to a leaf, pushing far children
    /// that the ray also crosses. Returns the leaf and the span inside it.
    fn descend(
        &self,
        ray: &Ray,
        mut id: NodeId,
        mut span: Interval,
        stack: &mut Vec<(NodeId, Interval)>,
    ) -> (NodeId, Interval) {
        loop {
            let Node::Interior {
                axis,
                pivot,
                left,
                right,
            } = *self.node(id)
            else {
                return (id, span);
            };

            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            if dir == 0.0 {
                // Parallel to the plane: stays on the origin's side.
                if origin < pivot {
                    id = left;
                } else if origin > pivot {
                    id = right;
                } else {
                    stack.push((right, span));
                    id = left;
                }
                continue;
            }

            let (near, far) = if dir > 0.0 { (left, right) } else { (right, left) };
            let t_split = (pivot - origin) / dir;
            if t_split > span.max {
                id = near;
            } else if t_split < span.min {
                id = far;
            } else {
                let (near_span, far_span) = span.split_at(t_split);
                stack.push((far, far_span));
                id = near;
                span = near_span;
            }
        }
    }
}
