//! Ray queries against a scene's primitives.

use std::sync::Arc;

use kdray_math::{Aabb, Ray};
use serde::{Deserialize, Serialize};

use crate::kdtree::{BuildResult, CellSplit, ClipOutcome, KdData, KdOptions, KdTree};
use crate::primitive::{AsPrimitive, ClipData, Collision, Primitive};

/// Nearest-hit and occlusion queries.
pub trait Intersecter: Send + Sync {
    fn bound(&self) -> Aabb;

    /// Closest hit with `ray.t_min < t <= dist`.
    fn intersect(&self, ray: &Ray, dist: f64) -> Option<Collision<'_>>;

    /// Whether anything is hit with `ray.t_min < t < dist`.
    fn is_shadowed(&self, ray: &Ray, dist: f64) -> bool;
}

/// How the scene organizes its primitives for ray queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Partitioner {
    KdTree(KdOptions),
    /// Tests every primitive; for debugging.
    Simple,
}

impl Default for Partitioner {
    fn default() -> Self {
        Partitioner::KdTree(KdOptions::default())
    }
}

impl Partitioner {
    pub fn build(&self, primitives: Vec<Arc<dyn Primitive>>) -> BuildResult<Box<dyn Intersecter>> {
        Ok(match self {
            Partitioner::KdTree(options) => Box::new(KdIntersecter::new(primitives, options)?),
            Partitioner::Simple => Box::new(SimpleIntersecter::new(primitives)),
        })
    }
}

/// Primitives as seen by the kd-tree builder.
pub struct PrimitiveList<P: ?Sized = dyn Primitive>(pub Vec<Arc<P>>);

impl<P: Primitive + ?Sized> KdData for PrimitiveList<P> {
    type ClipData = ClipData;

    fn len(&self) -> usize {
        self.0.len()
    }

    fn bound(&self, index: usize) -> Aabb {
        self.0[index].bound()
    }

    fn clips(&self) -> bool {
        true
    }

    fn clip(
        &self,
        index: usize,
        cell: &Aabb,
        split: Option<CellSplit>,
        prior: Option<&ClipData>,
    ) -> ClipOutcome<ClipData> {
        self.0[index].clip(cell, split, prior)
    }
}

/// kd-tree backed intersecter.
///
/// Generic over the primitive type so single-type scenes avoid dynamic
/// dispatch in the leaf loop; mixed scenes use `dyn Primitive`.
pub struct KdIntersecter<P: ?Sized = dyn Primitive> {
    tree: KdTree<PrimitiveList<P>>,
}

impl<P: Primitive + ?Sized> KdIntersecter<P> {
    pub fn new(primitives: Vec<Arc<P>>, options: &KdOptions) -> BuildResult<Self> {
        Ok(Self {
            tree: KdTree::build(PrimitiveList(primitives), options)?,
        })
    }

    pub fn tree(&self) -> &KdTree<PrimitiveList<P>> {
        &self.tree
    }

    pub fn primitives(&self) -> &[Arc<P>] {
        &self.tree.data().0
    }
}

impl<P: Primitive + AsPrimitive + ?Sized> Intersecter for KdIntersecter<P> {
    fn bound(&self) -> Aabb {
        self.tree.bound()
    }

    fn intersect(&self, ray: &Ray, dist: f64) -> Option<Collision<'_>> {
        let prims = self.primitives();
        let (index, hit) = self.tree.nearest(ray, dist, |i, r| prims[i].intersect(r))?;
        let index = index as usize;
        Some(Collision::new(prims[index].as_primitive(), index, *ray, hit))
    }

    fn is_shadowed(&self, ray: &Ray, dist: f64) -> bool {
        let prims = self.primitives();
        self.tree.any_hit(ray, dist, |i, r| prims[i].intersect(r))
    }
}

/// Linear scan over every primitive.
pub struct SimpleIntersecter {
    primitives: Vec<Arc<dyn Primitive>>,
    bound: Aabb,
}

impl SimpleIntersecter {
    pub fn new(primitives: Vec<Arc<dyn Primitive>>) -> Self {
        let bound = primitives
            .iter()
            .map(|p| p.bound())
            .reduce(|acc, b| Aabb::surrounding(&acc, &b))
            .unwrap_or(Aabb::ZERO);
        Self { primitives, bound }
    }
}

impl Intersecter for SimpleIntersecter {
    fn bound(&self) -> Aabb {
        self.bound
    }

    fn intersect(&self, ray: &Ray, dist: f64) -> Option<Collision<'_>> {
        let mut best: Option<Collision<'_>> = None;
        let mut best_t = dist;
        for (index, prim) in self.primitives.iter().enumerate() {
            if let Some(hit) = prim.intersect(ray) {
                let closer = hit.t < best_t || (best.is_none() && hit.t == best_t);
                if hit.t > ray.t_min && closer {
                    best_t = hit.t;
                    best = Some(Collision::new(prim.as_ref(), index, *ray, hit));
                }
            }
        }
        best
    }

    fn is_shadowed(&self, ray: &Ray, dist: f64) -> bool {
        self.primitives.iter().any(|prim| {
            prim.intersect(ray)
                .is_some_and(|hit| hit.t > ray.t_min && hit.t < dist)
        })
    }
}
