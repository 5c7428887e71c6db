//! Recursive SAH construction.

use kdray_math::{Aabb, DVec3};
use log::{debug, trace};

use super::pool::{NodeId, NodePool};
use super::split::find_split;
use super::{BuildError, BuildResult, CellSplit, ClipOutcome, KdData, KdOptions, KdTree};

/// Nodes with fewer values than this that get much worse are made leaves.
const SMALL_NODE: usize = 16;
const FAULT_RATIO: f64 = 1.6;

/// Per-value state carried down the build.
#[derive(Clone)]
struct Entry<C> {
    index: u32,
    /// Bound after the most recent clip, with the clipper's state.
    clipped: Option<(Aabb, C)>,
}

/// Per-node state threaded through the recursion.
#[derive(Debug, Clone, Copy)]
struct BuildState {
    depth: usize,
    depth_left: usize,
    old_cost: f64,
    bad_refines: u32,
    split: Option<CellSplit>,
}

struct Builder<'a, D: KdData> {
    data: &'a D,
    options: &'a KdOptions,
    pool: NodePool,
    tree_size: DVec3,
    parallel_depth: usize,
}

impl<D: KdData> KdTree<D> {
    /// Builds a tree over every value in `data`.
    pub fn build(data: D, options: &KdOptions) -> BuildResult<Self> {
        Self::try_build(data, options).map_err(|(err, _)| err)
    }

    /// Like [`build`](Self::build), but hands `data` back when the build fails.
    pub fn try_build(data: D, options: &KdOptions) -> Result<Self, (BuildError, D)> {
        let n = data.len();
        let bound = (0..n)
            .map(|i| data.bound(i))
            .reduce(|acc, b| Aabb::surrounding(&acc, &b))
            .unwrap_or(Aabb::ZERO);

        let threads = rayon::current_num_threads().max(1);
        let builder = Builder {
            data: &data,
            options,
            pool: NodePool::with_capacity(n),
            tree_size: bound.size(),
            parallel_depth: threads.next_power_of_two().trailing_zeros() as usize + 2,
        };

        let entries = (0..n as u32)
            .map(|index| Entry {
                index,
                clipped: None,
            })
            .collect();
        let state = BuildState {
            depth: 0,
            depth_left: options.max_depth,
            old_cost: n as f64,
            bad_refines: 0,
            split: None,
        };
        let root = builder.build_node(entries, bound, state);
        let pool = builder.pool;
        let root = match root {
            Ok(root) => root,
            Err(err) => return Err((err, data)),
        };
        let (nodes, indices) = pool.into_parts();

        let tree = KdTree {
            data,
            nodes,
            indices,
            root,
            bound,
        };
        debug!(
            "kd-tree built over {} values: {} nodes, {} levels deep",
            n,
            tree.node_count(),
            tree.depth()
        );
        Ok(tree)
    }
}

impl<'a, D: KdData> Builder<'a, D> {
    fn build_node(
        &self,
        mut entries: Vec<Entry<D::ClipData>>,
        mut cell: Aabb,
        state: BuildState,
    ) -> BuildResult<NodeId> {
        if let Some(split) = state.split {
            if entries.len() <= self.options.clip_threshold && self.data.clips() {
                cell = self.clip(&mut entries, cell, split);
            }
        }

        if entries.len() <= self.options.leaf_size || state.depth_left == 0 {
            return Ok(self.leaf(&entries));
        }

        let bounds: Vec<Aabb> = entries
            .iter()
            .map(|e| match &e.clipped {
                Some((b, _)) => *b,
                None => self.data.bound(e.index as usize),
            })
            .collect();
        let Some(best) = find_split(&bounds, &cell, self.options)? else {
            return Ok(self.leaf(&entries));
        };

        let n = entries.len();
        let mut bad_refines = state.bad_refines;
        if best.cost > state.old_cost {
            bad_refines += 1;
        }
        if (n < SMALL_NODE && best.cost > state.old_cost * FAULT_RATIO)
            || bad_refines >= self.options.fault_tolerance
        {
            trace!("Faulted {n} values");
            return Ok(self.leaf(&entries));
        }

        let (axis, pivot) = (best.axis, best.pivot);
        let mut left = Vec::with_capacity(n);
        let mut right = Vec::with_capacity(n);
        for entry in entries {
            let (v_min, v_max) = self.data.dimension(entry.index as usize, axis);
            let goes_left = v_min < pivot;
            let goes_right = v_min >= pivot || v_max > pivot;
            match (goes_left, goes_right) {
                (true, true) => {
                    left.push(entry.clone());
                    right.push(entry);
                }
                (true, false) => left.push(entry),
                _ => right.push(entry),
            }
        }

        let mut left_cell = cell;
        left_cell.max[axis] = pivot;
        let mut right_cell = cell;
        right_cell.min[axis] = pivot;

        let child = |lower_half| BuildState {
            depth: state.depth + 1,
            depth_left: state.depth_left - 1,
            old_cost: best.cost,
            bad_refines,
            split: Some(CellSplit { axis, lower_half }),
        };
        let (left_state, right_state) = (child(true), child(false));

        let (left_id, right_id) = if state.depth < self.parallel_depth {
            let (l, r) = rayon::join(
                || self.build_node(left, left_cell, left_state),
                || self.build_node(right, right_cell, right_state),
            );
            (l?, r?)
        } else {
            (
                self.build_node(left, left_cell, left_state)?,
                self.build_node(right, right_cell, right_state)?,
            )
        };
        Ok(self.pool.interior(axis, pivot, left_id, right_id))
    }

    /// Clips every value against the slightly grown cell, drops the ones that
    /// fall outside, and returns the cell tightened to what remains.
    fn clip(&self, entries: &mut Vec<Entry<D::ClipData>>, cell: Aabb, split: CellSplit) -> Aabb {
        let delta = self.tree_size * 1e-5 + cell.size() * 0.021;
        let grown = cell.grow_by(delta);

        let mut tight: Option<Aabb> = None;
        let mut dropped = 0usize;
        entries.retain_mut(|entry| {
            let index = entry.index as usize;
            let prior = entry.clipped.as_ref().map(|(_, data)| data);
            let bound = match self.data.clip(index, &grown, Some(split), prior) {
                ClipOutcome::Unsupported => match &entry.clipped {
                    Some((b, _)) => *b,
                    None => self.data.bound(index),
                },
                ClipOutcome::Empty => {
                    dropped += 1;
                    return false;
                }
                ClipOutcome::Clipped(b, data) => {
                    entry.clipped = Some((b, data));
                    b
                }
            };
            tight = Some(match tight {
                Some(t) => Aabb::surrounding(&t, &bound),
                None => bound,
            });
            true
        });

        if dropped > 0 {
            trace!("Clipped {dropped} values");
        }
        tight
            .and_then(|t| t.intersection(&cell))
            .unwrap_or(cell)
    }

    fn leaf(&self, entries: &[Entry<D::ClipData>]) -> NodeId {
        let indices: Vec<u32> = entries.iter().map(|e| e.index).collect();
        self.pool.leaf(&indices)
    }
}
