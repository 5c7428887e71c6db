//! Surface area heuristic split selection.

use std::cmp::Ordering;

use kdray_math::{Aabb, Axis, DVec3};

use super::{BuildError, BuildResult, KdOptions};

/// Best plane found for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SplitCandidate {
    pub axis: Axis,
    pub pivot: f64,
    pub cost: f64,
}

struct CostModel<'a> {
    cell: &'a Aabb,
    size: DVec3,
    inv_total_sa: f64,
    cost_ratio: f64,
    empty_bonus: f64,
}

impl<'a> CostModel<'a> {
    fn new(cell: &'a Aabb, options: &KdOptions) -> Self {
        let d = cell.size();
        let total_sa = d.x * d.y + d.x * d.z + d.y * d.z;
        let inv_total_sa = if total_sa == 0.0 { 0.0 } else { 1.0 / total_sa };
        Self {
            cell,
            size: d,
            inv_total_sa,
            cost_ratio: options.cost_ratio,
            empty_bonus: options.empty_bonus,
        }
    }

    fn cost(&self, axis: Axis, pos: f64, below: i64, above: i64) -> f64 {
        let d = self.size;
        let (next, prev) = (axis.next(), axis.prev());
        let cap_area = d[next] * d[prev];
        let cap_perim = d[next] + d[prev];
        let l1 = pos - self.cell.min[axis];
        let l2 = self.cell.max[axis] - pos;

        let raw = (cap_area + l1 * cap_perim) * below as f64
            + (cap_area + l2 * cap_perim) * above as f64;
        let bonus = if above == 0 {
            (0.1 + l2 / d[axis]) * self.empty_bonus * raw
        } else if below == 0 {
            (0.1 + l1 / d[axis]) * self.empty_bonus * raw
        } else {
            0.0
        };
        self.cost_ratio + self.inv_total_sa * (raw - bonus)
    }

    /// Candidate planes must lie strictly inside the cell.
    fn is_interior(&self, axis: Axis, pos: f64) -> bool {
        pos > self.cell.min[axis] && pos < self.cell.max[axis]
    }
}

struct Best(Option<SplitCandidate>);

impl Best {
    /// Keeps the first of equally cheap candidates.
    fn offer(&mut self, axis: Axis, pivot: f64, cost: f64) {
        let better = match self.0 {
            Some(best) => cost < best.cost,
            None => true,
        };
        if better {
            self.0 = Some(SplitCandidate { axis, pivot, cost });
        }
    }
}

fn check_counts(axis: Axis, below: i64, above: i64, total: usize) -> BuildResult<()> {
    if below == total as i64 && above == 0 {
        Ok(())
    } else {
        Err(BuildError::CostInvariant {
            axis,
            below,
            above,
            total,
        })
    }
}

/// Picks the split for a node whose values have the given (possibly clipped) bounds.
pub(crate) fn find_split(
    bounds: &[Aabb],
    cell: &Aabb,
    options: &KdOptions,
) -> BuildResult<Option<SplitCandidate>> {
    if bounds.len() < options.pigeon_threshold {
        exact_split(bounds, cell, options)
    } else {
        pigeon_split(bounds, cell, options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EdgeKind {
    Lower = 0,
    Both = 1,
    Upper = 2,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    pos: f64,
    kind: EdgeKind,
}

/// Position ascending; at equal positions upper edges come first, then both, then lower.
fn edge_order(a: &Edge, b: &Edge) -> Ordering {
    a.pos.total_cmp(&b.pos).then_with(|| b.kind.cmp(&a.kind))
}

/// Exact SAH: evaluates every bound edge inside the cell.
pub(crate) fn exact_split(
    bounds: &[Aabb],
    cell: &Aabb,
    options: &KdOptions,
) -> BuildResult<Option<SplitCandidate>> {
    let n = bounds.len();
    let model = CostModel::new(cell, options);
    let mut best = Best(None);
    let mut edges = Vec::with_capacity(2 * n);

    for axis in Axis::ALL {
        if model.size[axis] <= 0.0 {
            continue;
        }

        edges.clear();
        for b in bounds {
            let (lo, hi) = (b.min[axis], b.max[axis]);
            if lo == hi {
                edges.push(Edge {
                    pos: lo,
                    kind: EdgeKind::Both,
                });
            } else {
                edges.push(Edge {
                    pos: lo,
                    kind: EdgeKind::Lower,
                });
                edges.push(Edge {
                    pos: hi,
                    kind: EdgeKind::Upper,
                });
            }
        }
        edges.sort_by(edge_order);

        let (mut below, mut above) = (0i64, n as i64);
        for edge in &edges {
            if edge.kind == EdgeKind::Upper {
                above -= 1;
            }
            if model.is_interior(axis, edge.pos) {
                best.offer(axis, edge.pos, model.cost(axis, edge.pos, below, above));
            }
            if edge.kind != EdgeKind::Upper {
                below += 1;
                if edge.kind == EdgeKind::Both {
                    above -= 1;
                }
            }
        }
        check_counts(axis, below, above, n)?;
    }

    Ok(best.0)
}

#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    n: u32,
    left: u32,
    right: u32,
    bleft: u32,
    both: u32,
    t: f64,
}

impl Bin {
    /// Moves the values sitting at the old position to the left counts.
    fn advance(&mut self, t: f64) {
        self.t = t;
        self.left += self.both + self.bleft;
        self.right += self.both;
        self.both = 0;
        self.bleft = 0;
    }
}

/// Binned SAH: buckets the bound edges along each axis and evaluates only at
/// the largest edge position seen in each bucket.
pub(crate) fn pigeon_split(
    bounds: &[Aabb],
    cell: &Aabb,
    options: &KdOptions,
) -> BuildResult<Option<SplitCandidate>> {
    let n = bounds.len();
    let model = CostModel::new(cell, options);
    let num_bins = options.pigeon_bins.max(1);
    let mut bins = vec![Bin::default(); num_bins + 1];
    let mut best = Best(None);

    let bin_of = |t: f64, min: f64, scale: f64| -> usize {
        let b = ((t - min) * scale) as i64;
        b.clamp(0, num_bins as i64) as usize
    };

    for axis in Axis::ALL {
        if model.size[axis] <= 0.0 {
            continue;
        }
        bins.fill(Bin::default());
        let min = cell.min[axis];
        let scale = num_bins as f64 / model.size[axis];

        for b in bounds {
            let (t_low, t_high) = (b.min[axis], b.max[axis]);
            let b_left = bin_of(t_low, min, scale);
            let b_right = bin_of(t_high, min, scale);

            if t_low == t_high {
                let bin = &mut bins[b_left];
                if bin.n == 0 || t_low > bin.t {
                    bin.advance(t_low);
                    bin.both = 1;
                } else if t_low == bin.t {
                    bin.both += 1;
                } else {
                    bin.left += 1;
                    bin.right += 1;
                }
                bin.n += 2;
            } else {
                let bin = &mut bins[b_left];
                if bin.n == 0 || t_low > bin.t {
                    bin.advance(t_low);
                    bin.bleft = 1;
                } else if t_low == bin.t {
                    bin.bleft += 1;
                } else {
                    bin.left += 1;
                }
                bin.n += 1;

                let bin = &mut bins[b_right];
                bin.right += 1;
                if bin.n == 0 || t_high > bin.t {
                    bin.advance(t_high);
                }
                bin.n += 1;
            }
        }

        let (mut below, mut above) = (0i64, n as i64);
        for bin in bins.iter().filter(|bin| bin.n != 0) {
            below += i64::from(bin.left);
            above -= i64::from(bin.right);
            if model.is_interior(axis, bin.t) {
                best.offer(axis, bin.t, model.cost(axis, bin.t, below, above));
            }
            below += i64::from(bin.both + bin.bleft);
            above -= i64::from(bin.both);
        }
        check_counts(axis, below, above, n)?;
    }

    Ok(best.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn point(x: f64, y: f64, z: f64) -> Aabb {
        Aabb::from_point(DVec3::new(x, y, z))
    }

    #[test]
    fn test_edge_order_ties() {
        let mut edges = vec![
            Edge {
                pos: 1.0,
                kind: EdgeKind::Lower,
            },
            Edge {
                pos: 1.0,
                kind: EdgeKind::Both,
            },
            Edge {
                pos: 0.5,
                kind: EdgeKind::Lower,
            },
            Edge {
                pos: 1.0,
                kind: EdgeKind::Upper,
            },
        ];
        edges.sort_by(edge_order);
        let kinds: Vec<EdgeKind> = edges.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EdgeKind::Lower,
                EdgeKind::Upper,
                EdgeKind::Both,
                EdgeKind::Lower
            ]
        );
        assert_eq!(edges[0].pos, 0.5);
    }

    #[test]
    fn test_cost_with_empty_side() {
        let cell = Aabb::new(DVec3::ZERO, DVec3::new(10.0, 1.0, 1.0));
        let options = KdOptions::default();
        let model = CostModel::new(&cell, &options);

        // capArea 1, capPerim 2, totalSA 21
        let balanced = model.cost(Axis::X, 5.0, 2, 2);
        let expected = 0.35 + (11.0 * 2.0 + 11.0 * 2.0) / 21.0;
        assert!((balanced - expected).abs() < 1e-12);

        let empty_above = model.cost(Axis::X, 5.0, 4, 0);
        let raw = 11.0 * 4.0;
        let bonus = (0.1 + 0.5) * 0.33 * raw;
        assert!((empty_above - (0.35 + (raw - bonus) / 21.0)).abs() < 1e-12);
        assert!(empty_above < model.cost(Axis::X, 5.0, 4, 1));
    }

    #[test]
    fn test_exact_split_separates_clusters() {
        let mut bounds = Vec::new();
        for i in 0..5 {
            bounds.push(point(i as f64 * 0.1, 0.5, 0.5));
            bounds.push(point(9.0 + i as f64 * 0.1, 0.5, 0.5));
        }
        let cell = Aabb::new(DVec3::ZERO, DVec3::new(10.0, 1.0, 1.0));
        let split = exact_split(&bounds, &cell, &KdOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(split.axis, Axis::X);
        assert!(split.pivot > 0.4 && split.pivot <= 9.0, "pivot {}", split.pivot);
    }

    #[test]
    fn test_no_candidates() {
        let bounds = vec![point(1.0, 1.0, 1.0); 3];
        let cell = Aabb::from_point(DVec3::ONE);
        assert!(exact_split(&bounds, &cell, &KdOptions::default())
            .unwrap()
            .is_none());
        assert!(pigeon_split(&bounds, &cell, &KdOptions::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_pigeon_counts_balance() {
        let mut rng = StdRng::seed_from_u64(42);
        let bounds: Vec<Aabb> = (0..500)
            .map(|i| {
                let a = DVec3::new(
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                );
                // Mix ranges, points and shared edges.
                match i % 3 {
                    0 => Aabb::from_point(a),
                    1 => Aabb::new(a, a + DVec3::splat(0.5)),
                    _ => Aabb::new(DVec3::new(5.0, a.y, a.z), DVec3::new(5.0 + a.x * 0.1, a.y, a.z + 1.0)),
                }
            })
            .collect();
        let cell = bounds
            .iter()
            .fold(bounds[0], |acc, b| Aabb::surrounding(&acc, b));
        let options = KdOptions::default();
        let split = pigeon_split(&bounds, &cell, &options).unwrap().unwrap();
        assert!(split.pivot > cell.min[split.axis] && split.pivot < cell.max[split.axis]);

        let exact = exact_split(&bounds, &cell, &options).unwrap().unwrap();
        // Binning can only approximate the exact optimum.
        assert!(split.cost >= exact.cost - 1e-9);
    }
}
