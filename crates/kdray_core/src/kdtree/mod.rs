//! Axis-aligned kd-tree over an indexed set of bounded values.
//!
//! The same tree serves the scene's primitives (boxes, optionally clipped
//! against each cell during the build) and the photon map (points). Splits are
//! chosen with the surface area heuristic, exact for small nodes and binned
//! for large ones.

mod build;
mod pool;
mod split;
mod traverse;

use std::fmt;

use kdray_math::{Aabb, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use pool::NodeId;

/// Errors raised while building a tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The SAH sweep did not account for every value exactly once.
    #[error("SAH sweep on {axis} ended with {below} below and {above} above for {total} values")]
    CostInvariant {
        axis: Axis,
        below: i64,
        above: i64,
        total: usize,
    },
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Tuning knobs for the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdOptions {
    /// Hard recursion limit.
    pub max_depth: usize,
    /// Target number of values per leaf.
    pub leaf_size: usize,
    /// Consecutive bad splits that force a leaf.
    pub fault_tolerance: u32,
    /// Largest node population eligible for clipping.
    pub clip_threshold: usize,
    pub empty_bonus: f64,
    /// Traversal to intersection cost ratio.
    pub cost_ratio: f64,
    /// Nodes with at least this many values use the binned SAH.
    pub pigeon_threshold: usize,
    pub pigeon_bins: usize,
}

impl Default for KdOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            leaf_size: 2,
            fault_tolerance: 2,
            clip_threshold: 32,
            empty_bonus: 0.33,
            cost_ratio: 0.35,
            pigeon_threshold: 128,
            pigeon_bins: 1024,
        }
    }
}

impl KdOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    pub fn with_fault_tolerance(mut self, fault_tolerance: u32) -> Self {
        self.fault_tolerance = fault_tolerance;
        self
    }

    pub fn with_clip_threshold(mut self, clip_threshold: usize) -> Self {
        self.clip_threshold = clip_threshold;
        self
    }

    pub fn with_pigeon_threshold(mut self, pigeon_threshold: usize) -> Self {
        self.pigeon_threshold = pigeon_threshold;
        self
    }
}

/// Which half of its parent a cell is, recorded for clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSplit {
    pub axis: Axis,
    /// The cell lies below the split plane, so the plane is its `max[axis]`.
    pub lower_half: bool,
}

impl CellSplit {
    /// Coordinate of the split plane bounding `cell`.
    pub fn plane(&self, cell: &Aabb) -> f64 {
        if self.lower_half {
            cell.max[self.axis]
        } else {
            cell.min[self.axis]
        }
    }
}

/// Result of clipping one value against a cell.
#[derive(Debug, Clone)]
pub enum ClipOutcome<T> {
    /// The value does not support clipping; its plain bound is used.
    Unsupported,
    /// Nothing of the value lies inside the cell.
    Empty,
    /// Tight bound of the part inside the cell, plus state for further clips.
    Clipped(Aabb, T),
}

/// The builder's view of the values it partitions.
pub trait KdData: Sync {
    /// Carried from a clip to the clips of descendant cells.
    type ClipData: Clone + Send + Sync;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bound(&self, index: usize) -> Aabb;

    /// Range covered along `axis`.
    fn dimension(&self, index: usize, axis: Axis) -> (f64, f64) {
        let b = self.bound(index);
        (b.min[axis], b.max[axis])
    }

    /// Whether the builder should attempt clipping at all.
    fn clips(&self) -> bool {
        false
    }

    /// Clips value `index` against `cell`.
    ///
    /// `split` names the plane the cell was cut from; `prior` is the state
    /// returned by the clip at the nearest clipped ancestor, if any.
    fn clip(
        &self,
        _index: usize,
        _cell: &Aabb,
        _split: Option<CellSplit>,
        _prior: Option<&Self::ClipData>,
    ) -> ClipOutcome<Self::ClipData> {
        ClipOutcome::Unsupported
    }
}

/// A tree node. Interior nodes own both children through the tree's pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Interior {
        axis: Axis,
        pivot: f64,
        /// Values whose low bound is below the pivot.
        left: NodeId,
        right: NodeId,
    },
    Leaf {
        start: u32,
        len: u32,
    },
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// An immutable kd-tree, safe to share between threads once built.
pub struct KdTree<D> {
    data: D,
    nodes: Vec<Node>,
    indices: Vec<u32>,
    root: NodeId,
    bound: Aabb,
}

impl<D: KdData> KdTree<D> {
    /// Union of every value's bound. The zero box for an empty tree.
    pub fn bound(&self) -> Aabb {
        self.bound
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Hands back the values the tree was built over.
    pub fn into_data(self) -> D {
        self.data
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Value indices stored in a leaf. Empty for interior nodes.
    pub fn leaf_indices(&self, id: NodeId) -> &[u32] {
        match *self.node(id) {
            Node::Leaf { start, len } => &self.indices[start as usize..(start + len) as usize],
            Node::Interior { .. } => &[],
        }
    }

    /// Number of interior levels between the root and the deepest leaf.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            match *self.node(id) {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Interior { left, right, .. } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        deepest
    }

    /// Every leaf with the cell it covers, left to right.
    pub fn leaves(&self) -> Vec<(Aabb, &[u32])> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, self.bound)];
        while let Some((id, cell)) = stack.pop() {
            match *self.node(id) {
                Node::Leaf { .. } => out.push((cell, self.leaf_indices(id))),
                Node::Interior {
                    axis,
                    pivot,
                    left,
                    right,
                } => {
                    let mut left_cell = cell;
                    left_cell.max[axis] = pivot;
                    let mut right_cell = cell;
                    right_cell.min[axis] = pivot;
                    stack.push((right, right_cell));
                    stack.push((left, left_cell));
                }
            }
        }
        out
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        match *self.node(id) {
            Node::Leaf { .. } => write!(f, "{:?}", self.leaf_indices(id)),
            Node::Interior {
                axis,
                pivot,
                left,
                right,
            } => {
                write!(f, "{{{axis} at {pivot:.2} L: ")?;
                self.fmt_node(f, left)?;
                write!(f, " R: ")?;
                self.fmt_node(f, right)?;
                write!(f, "}}")
            }
        }
    }
}

impl<D: KdData> fmt::Display for KdTree<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root)
    }
}

impl<D: KdData> fmt::Debug for KdTree<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdTree")
            .field("values", &self.data.len())
            .field("nodes", &self.nodes.len())
            .field("bound", &self.bound)
            .finish()
    }
}
