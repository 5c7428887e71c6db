//! Photon map: a point kd-tree with bounded k-nearest-neighbour search.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use kdray_math::{Aabb, DVec3};
use log::{debug, error};

use crate::color::Color;
use crate::kdtree::{BuildResult, KdData, KdOptions, KdTree, Node, NodeId};

/// A stored light path vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    pub position: DVec3,
    /// Direction the photon arrived from.
    pub direction: DVec3,
    pub color: Color,
}

impl Photon {
    pub fn new(position: DVec3, direction: DVec3, color: Color) -> Self {
        Self {
            position,
            direction,
            color,
        }
    }
}

/// Photons as zero-size boxes for the tree builder.
pub struct PhotonList(pub Vec<Photon>);

impl KdData for PhotonList {
    type ClipData = ();

    fn len(&self) -> usize {
        self.0.len()
    }

    fn bound(&self, index: usize) -> Aabb {
        Aabb::from_point(self.0[index].position)
    }
}

/// A photon found by [`PhotonMap::gather`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherResult<'a> {
    pub photon: &'a Photon,
    pub distance_sq: f64,
}

/// Heap entry, ordered by distance and then index so ties are stable.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_sq: f64,
    index: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.index.cmp(&other.index))
    }
}

/// Photon store with a lazily rebuilt search tree.
///
/// Photons are appended with [`add`](Self::add) and become searchable after
/// [`update`](Self::update). Any mutation marks the map stale again. Once
/// updated, the map only needs `&self` and can be queried from many threads.
pub struct PhotonMap {
    photons: Vec<Photon>,
    tree: Option<KdTree<PhotonList>>,
    num_paths: usize,
    search_radius: f64,
}

impl fmt::Debug for PhotonMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotonMap")
            .field("photons", &self.len())
            .field("ready", &self.is_ready())
            .field("num_paths", &self.num_paths)
            .field("search_radius", &self.search_radius)
            .finish()
    }
}

impl Default for PhotonMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotonMap {
    pub fn new() -> Self {
        Self {
            photons: Vec::new(),
            tree: None,
            num_paths: 0,
            search_radius: 1.0,
        }
    }

    /// Number of light paths shot to produce the stored photons.
    pub fn num_paths(&self) -> usize {
        self.num_paths
    }

    pub fn set_num_paths(&mut self, num_paths: usize) {
        self.num_paths = num_paths;
    }

    pub fn search_radius(&self) -> f64 {
        self.search_radius
    }

    pub fn set_search_radius(&mut self, radius: f64) {
        self.search_radius = radius;
    }

    pub fn len(&self) -> usize {
        match &self.tree {
            Some(tree) => tree.data().0.len(),
            None => self.photons.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the tree reflects every stored photon.
    pub fn is_ready(&self) -> bool {
        self.tree.is_some()
    }

    pub fn add(&mut self, photon: Photon) {
        self.unfreeze();
        self.photons.push(photon);
    }

    pub fn extend<I: IntoIterator<Item = Photon>>(&mut self, photons: I) {
        self.unfreeze();
        self.photons.extend(photons);
    }

    pub fn clear(&mut self) {
        self.tree = None;
        self.photons.clear();
    }

    /// Rebuilds the search tree over every stored photon.
    ///
    /// On failure the photons stay in the map, which is left not ready.
    pub fn update(&mut self) -> BuildResult<()> {
        self.unfreeze();
        let photons = PhotonList(std::mem::take(&mut self.photons));
        let n = photons.len();
        let options = KdOptions::default().with_leaf_size(1);
        match KdTree::try_build(photons, &options) {
            Ok(tree) => {
                debug!("Photon map built over {} photons, depth {}", n, tree.depth());
                self.tree = Some(tree);
                Ok(())
            }
            Err((err, photons)) => {
                error!("Photon map build failed: {err}");
                self.photons = photons.0;
                Err(err)
            }
        }
    }

    /// Up to `k` photons strictly within `max_dist` of `point`, nearest first.
    ///
    /// Returns nothing until the map has been updated.
    pub fn gather(&self, point: DVec3, k: usize, max_dist: f64) -> Vec<GatherResult<'_>> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        let photons = &tree.data().0;
        search(tree, point, k, max_dist, |_| true)
            .into_iter()
            .map(|c| GatherResult {
                photon: &photons[c.index as usize],
                distance_sq: c.distance_sq,
            })
            .collect()
    }

    /// Nearest photon within `max_dist` that arrived from the side `normal`
    /// faces.
    pub fn find_nearest(&self, point: DVec3, normal: DVec3, max_dist: f64) -> Option<&Photon> {
        let tree = self.tree.as_ref()?;
        let photons = &tree.data().0;
        search(tree, point, 1, max_dist, |p| p.direction.dot(normal) > 0.0)
            .into_iter()
            .next()
            .map(|c| &photons[c.index as usize])
    }

    /// Moves the tree's photons back into the flat list.
    fn unfreeze(&mut self) {
        if let Some(tree) = self.tree.take() {
            let mut photons = tree.into_data().0;
            photons.append(&mut self.photons);
            self.photons = photons;
        }
    }
}

/// Bounded k-NN walk. Results are sorted nearest first.
fn search<F>(
    tree: &KdTree<PhotonList>,
    point: DVec3,
    k: usize,
    max_dist: f64,
    accept: F,
) -> Vec<Candidate>
where
    F: Fn(&Photon) -> bool,
{
    if k == 0 || tree.data().is_empty() {
        return Vec::new();
    }
    let photons = &tree.data().0;
    let max_sq = max_dist * max_dist;
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
    let mut radius_sq = max_sq;

    let mut stack: Vec<(NodeId, f64)> = vec![(tree.root(), 0.0)];
    while let Some((id, axial_sq)) = stack.pop() {
        // Equal distances still matter for index tie-breaks.
        if axial_sq > radius_sq {
            continue;
        }
        match *tree.node(id) {
            Node::Leaf { .. } => {
                for &index in tree.leaf_indices(id) {
                    let photon = &photons[index as usize];
                    let candidate = Candidate {
                        distance_sq: photon.position.distance_squared(point),
                        index,
                    };
                    if candidate.distance_sq >= max_sq || !accept(photon) {
                        continue;
                    }
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if heap.peek().is_some_and(|top| candidate < *top) {
                        heap.pop();
                        heap.push(candidate);
                    } else {
                        continue;
                    }
                    if heap.len() == k {
                        radius_sq = heap.peek().map_or(max_sq, |top| top.distance_sq);
                    }
                }
            }
            Node::Interior {
                axis,
                pivot,
                left,
                right,
            } => {
                let offset = point[axis] - pivot;
                let (primary, alternate) = if point[axis] > pivot {
                    (right, left)
                } else {
                    (left, right)
                };
                stack.push((alternate, offset * offset));
                stack.push((primary, 0.0));
            }
        }
    }
    heap.into_sorted_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn photon_at(x: f64, y: f64, z: f64) -> Photon {
        Photon::new(DVec3::new(x, y, z), DVec3::Y, Color::ONE)
    }

    #[test]
    fn test_gather_literal() {
        let mut map = PhotonMap::new();
        for p in [
            photon_at(0.0, 0.0, 0.0),
            photon_at(1.0, 0.0, 0.0),
            photon_at(5.0, 0.0, 0.0),
        ] {
            map.add(p);
        }
        map.update().unwrap();
        assert!(map.is_ready());

        let found = map.gather(DVec3::new(0.1, 0.0, 0.0), 2, 2.0);
        let positions: Vec<DVec3> = found.iter().map(|g| g.photon.position).collect();
        assert_eq!(positions, vec![DVec3::ZERO, DVec3::X]);
        assert!((found[0].distance_sq - 0.01).abs() < 1e-12);
        assert!((found[1].distance_sq - 0.81).abs() < 1e-12);
    }

    #[test]
    fn test_gather_breaks_distance_ties_by_index() {
        let mut map = PhotonMap::new();
        map.extend([
            photon_at(0.0, 0.0, 0.0),
            photon_at(1.0, 0.0, 0.0),
            photon_at(0.0, 1.0, 0.0),
            photon_at(10.0, 10.0, 10.0),
        ]);
        map.update().unwrap();

        let found = map.gather(DVec3::ZERO, 2, 5.0);
        let positions: Vec<DVec3> = found.iter().map(|g| g.photon.position).collect();
        assert_eq!(positions, vec![DVec3::ZERO, DVec3::X]);
        assert_eq!(found[1].distance_sq, 1.0);

        let all: Vec<DVec3> = map
            .gather(DVec3::ZERO, 10, 5.0)
            .iter()
            .map(|g| g.photon.position)
            .collect();
        assert_eq!(all, vec![DVec3::ZERO, DVec3::X, DVec3::Y]);
    }

    #[test]
    fn test_try_build_returns_photons() {
        let photons = PhotonList(vec![photon_at(0.0, 0.0, 0.0), photon_at(2.0, 0.0, 0.0)]);
        let tree = KdTree::try_build(photons, &KdOptions::default()).map_err(|(err, _)| err);
        assert_eq!(tree.unwrap().data().len(), 2);

        let mut map = PhotonMap::new();
        map.extend([photon_at(0.0, 0.0, 0.0), photon_at(2.0, 0.0, 0.0)]);
        assert_eq!(map.update(), Ok(()));
        map.add(photon_at(4.0, 0.0, 0.0));
        assert_eq!(map.update(), Ok(()));
        assert_eq!(map.len(), 3);
        assert_eq!(map.gather(DVec3::ZERO, 10, 10.0).len(), 3);
    }

    #[test]
    fn test_gather_before_update_is_empty() {
        let mut map = PhotonMap::new();
        map.add(photon_at(0.0, 0.0, 0.0));
        assert!(!map.is_ready());
        assert!(map.gather(DVec3::ZERO, 4, 10.0).is_empty());
        assert!(map.find_nearest(DVec3::ZERO, DVec3::Y, 10.0).is_none());
    }

    #[test]
    fn test_add_after_update_marks_stale() {
        let mut map = PhotonMap::new();
        map.extend([photon_at(0.0, 0.0, 0.0), photon_at(2.0, 0.0, 0.0)]);
        map.update().unwrap();
        assert_eq!(map.len(), 2);
        map.add(photon_at(4.0, 0.0, 0.0));
        assert!(!map.is_ready());
        assert_eq!(map.len(), 3);
        map.update().unwrap();
        assert_eq!(map.gather(DVec3::new(4.0, 0.0, 0.0), 1, 0.5).len(), 1);

        map.clear();
        assert!(map.is_empty());
        assert!(!map.is_ready());
    }

    #[test]
    fn test_gather_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut map = PhotonMap::new();
        let photons: Vec<Photon> = (0..2000)
            .map(|_| {
                photon_at(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                )
            })
            .collect();
        map.extend(photons.iter().copied());
        map.update().unwrap();

        for _ in 0..100 {
            let q = DVec3::new(
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
            );
            let k = rng.gen_range(1..40);
            let max_dist = rng.gen_range(0.5..6.0);

            let mut expected: Vec<f64> = photons
                .iter()
                .map(|p| p.position.distance_squared(q))
                .filter(|&d| d < max_dist * max_dist)
                .collect();
            expected.sort_by(f64::total_cmp);
            expected.truncate(k);

            let got: Vec<f64> = map.gather(q, k, max_dist).iter().map(|g| g.distance_sq).collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_find_nearest_respects_normal() {
        let mut map = PhotonMap::new();
        map.add(Photon::new(DVec3::new(0.1, 0.0, 0.0), DVec3::NEG_Y, Color::ONE));
        map.add(Photon::new(DVec3::new(0.5, 0.0, 0.0), DVec3::Y, Color::ONE));
        map.add(Photon::new(DVec3::new(3.0, 0.0, 0.0), DVec3::Y, Color::ONE));
        map.update().unwrap();

        let up = map.find_nearest(DVec3::ZERO, DVec3::Y, 1.0).unwrap();
        assert_eq!(up.position, DVec3::new(0.5, 0.0, 0.0));
        let down = map.find_nearest(DVec3::ZERO, DVec3::NEG_Y, 1.0).unwrap();
        assert_eq!(down.position, DVec3::new(0.1, 0.0, 0.0));
        assert!(map.find_nearest(DVec3::ZERO, DVec3::X, 1.0).is_none());
    }

    #[test]
    fn test_coincident_photons() {
        let mut map = PhotonMap::new();
        map.extend((0..5).map(|_| photon_at(1.0, 1.0, 1.0)));
        map.update().unwrap();
        assert_eq!(map.gather(DVec3::ONE, 3, 0.1).len(), 3);
        assert_eq!(map.gather(DVec3::ONE, 10, 0.1).len(), 5);
    }
}
