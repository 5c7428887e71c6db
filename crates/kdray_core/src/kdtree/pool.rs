//! Bump allocation of nodes and leaf index runs during a build.

use std::sync::{Mutex, MutexGuard, PoisonError};

use kdray_math::Axis;

use super::Node;

/// Position of a node in its tree's node array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

struct PoolInner {
    nodes: Vec<Node>,
    indices: Vec<u32>,
}

/// Shared arena the builder's tasks allocate from.
///
/// The lock is held for one node plus one index run at a time, never across
/// recursion.
pub(crate) struct NodePool {
    inner: Mutex<PoolInner>,
}

impl NodePool {
    /// Sizes the pool for roughly `values / 2` nodes and `values` index slots.
    pub fn with_capacity(values: usize) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                nodes: Vec::with_capacity(values / 2 + 1),
                indices: Vec::with_capacity(values),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn leaf(&self, values: &[u32]) -> NodeId {
        let mut inner = self.lock();
        let start = inner.indices.len() as u32;
        inner.indices.extend_from_slice(values);
        push(
            &mut inner.nodes,
            Node::Leaf {
                start,
                len: values.len() as u32,
            },
        )
    }

    pub fn interior(&self, axis: Axis, pivot: f64, left: NodeId, right: NodeId) -> NodeId {
        let mut inner = self.lock();
        push(
            &mut inner.nodes,
            Node::Interior {
                axis,
                pivot,
                left,
                right,
            },
        )
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<u32>) {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (inner.nodes, inner.indices)
    }
}

fn push(nodes: &mut Vec<Node>, node: Node) -> NodeId {
    let id = NodeId(nodes.len() as u32);
    nodes.push(node);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_grows_past_estimate() {
        let pool = NodePool::with_capacity(2);
        let leaves: Vec<NodeId> = (0..10u32).map(|i| pool.leaf(&[i, i + 1])).collect();
        let root = pool.interior(Axis::Y, 0.5, leaves[0], leaves[1]);
        assert_eq!(root.index(), 10);

        let (nodes, indices) = pool.into_parts();
        assert_eq!(nodes.len(), 11);
        assert_eq!(indices.len(), 20);
        assert_eq!(nodes[3], Node::Leaf { start: 6, len: 2 });
        assert_eq!(&indices[6..8], &[3, 4]);
    }
}
