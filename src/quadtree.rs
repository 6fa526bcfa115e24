//! Point quadtree behind both brush selection and the many-body force.
//! Rebuilt wholesale whenever positions or the screen mapping change; queried
//! many times in between.

use crate::geom::{Rect, Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

pub const UNBOUNDED: (f64, f64) = (f64::NEG_INFINITY, f64::INFINITY);

/// A point to index. `slot` is whatever the caller needs back from a query
/// (node index, row number); `scalar` is the optional secondary filter value
/// checked during the same traversal.
#[derive(Clone, Copy, Debug)]
pub struct IndexPoint {
    pub slot: usize,
    pub pos: Vec2,
    pub scalar: Option<f64>,
}

impl IndexPoint {
    pub fn plain(slot: usize, pos: Vec2) -> Self {
        Self {
            slot,
            pos,
            scalar: None,
        }
    }

    fn scalar_within(&self, bounds: (f64, f64)) -> bool {
        self.scalar
            .is_none_or(|value| value >= bounds.0 && value <= bounds.1)
    }
}

#[derive(Clone, Copy)]
struct Quad {
    center: Vec2,
    half: f32,
}

impl Quad {
    fn covering(points: &[IndexPoint]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points {
            min.x = min.x.min(point.pos.x);
            min.y = min.y.min(point.pos.y);
            max.x = max.x.max(point.pos.x);
            max.y = max.y.max(point.pos.y);
        }

        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let center = (min + max) * 0.5;
        let span = (max.x - min.x).max(max.y - min.y);
        Some(Self {
            center,
            half: (span * 0.5) + 1e-3,
        })
    }

    fn as_rect(self) -> Rect {
        Rect::around(self.center, self.half)
    }

    fn quadrant_of(self, point: Vec2) -> usize {
        let right = point.x >= self.center.x;
        let lower = point.y >= self.center.y;
        (right as usize) | ((lower as usize) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half * 0.5;
        let dx = if quadrant & 1 == 0 { -quarter } else { quarter };
        let dy = if quadrant & 2 == 0 { -quarter } else { quarter };
        Self {
            center: self.center + vec2(dx, dy),
            half: quarter,
        }
    }
}

struct Cell {
    quad: Quad,
    mass: f32,
    center_of_mass: Vec2,
    points: Vec<IndexPoint>,
    children: [Option<Box<Cell>>; 4],
}

impl Cell {
    fn grow(quad: Quad, points: Vec<IndexPoint>, depth: usize) -> Self {
        let mass = points.len() as f32;
        let mut center_of_mass = Vec2::ZERO;
        for point in &points {
            center_of_mass += point.pos;
        }
        if mass > 0.0 {
            center_of_mass = center_of_mass / mass;
        }

        let mut cell = Self {
            quad,
            mass,
            center_of_mass,
            points,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.points.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets: [Vec<IndexPoint>; 4] = std::array::from_fn(|_| Vec::new());
        for point in cell.points.drain(..) {
            buckets[quad.quadrant_of(point.pos)].push(point);
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                cell.children[quadrant] = Some(Box::new(Self::grow(quad.child(quadrant), bucket, depth + 1)));
            }
        }
        cell
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }

    fn query_into(&self, rect: Rect, scalar_bounds: (f64, f64), out: &mut Vec<usize>) {
        if !self.quad.as_rect().intersects(rect) {
            return;
        }

        if self.is_leaf() {
            for point in &self.points {
                if rect.contains(point.pos) && point.scalar_within(scalar_bounds) {
                    out.push(point.slot);
                }
            }
            return;
        }

        for child in self.children.iter().flatten() {
            child.query_into(rect, scalar_bounds, out);
        }
    }

    fn visit_cells<F: FnMut(CellView<'_>) -> bool>(&self, f: &mut F) {
        let prune = f(CellView {
            rect: self.quad.as_rect(),
            side: self.quad.half * 2.0,
            mass: self.mass,
            center_of_mass: self.center_of_mass,
            points: &self.points,
            is_leaf: self.is_leaf(),
        });
        if prune {
            return;
        }
        for child in self.children.iter().flatten() {
            child.visit_cells(f);
        }
    }
}

/// What a [`PointQuadtree::visit`] callback sees for one cell. Internal cells
/// expose their aggregate mass and center of mass so a Barnes–Hut pass can
/// approximate far clusters without descending.
pub struct CellView<'a> {
    pub rect: Rect,
    pub side: f32,
    pub mass: f32,
    pub center_of_mass: Vec2,
    pub points: &'a [IndexPoint],
    pub is_leaf: bool,
}

#[derive(Default)]
pub struct PointQuadtree {
    root: Option<Cell>,
    len: usize,
}

impl PointQuadtree {
    /// Full rebuild from the current point set. Duplicate coordinates are
    /// fine; the depth cap keeps them in one oversized leaf.
    pub fn build(points: &[IndexPoint]) -> Self {
        let Some(quad) = Quad::covering(points) else {
            return Self::default();
        };
        Self {
            root: Some(Cell::grow(quad, points.to_vec(), 0)),
            len: points.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots of every point inside `rect` whose scalar also lies inside
    /// `scalar_bounds` (pass [`UNBOUNDED`] for no scalar filtering). Subtrees
    /// whose box misses `rect` are pruned, not scanned.
    pub fn query_rect(&self, rect: Rect, scalar_bounds: (f64, f64)) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.query_into(rect, scalar_bounds, &mut out);
        }
        out
    }

    /// Depth-first traversal. Returning `true` from the callback prunes that
    /// cell's children, which is how both the force pass and callers with
    /// custom region logic stay sub-linear.
    pub fn visit<F: FnMut(CellView<'_>) -> bool>(&self, mut f: F) {
        if let Some(root) = &self.root {
            root.visit_cells(&mut f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn points_from(coords: &[(f32, f32)]) -> Vec<IndexPoint> {
        coords
            .iter()
            .enumerate()
            .map(|(slot, &(x, y))| IndexPoint::plain(slot, vec2(x, y)))
            .collect()
    }

    fn brute_force(points: &[IndexPoint], rect: Rect, bounds: (f64, f64)) -> Vec<usize> {
        points
            .iter()
            .filter(|point| rect.contains(point.pos) && point.scalar_within(bounds))
            .map(|point| point.slot)
            .collect()
    }

    #[test]
    fn three_point_scenario() {
        let tree = PointQuadtree::build(&points_from(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]));
        let rect = Rect::from_corners(vec2(0.5, 0.5), vec2(1.5, 1.5));
        assert_eq!(tree.query_rect(rect, UNBOUNDED), vec![1]);
    }

    #[test]
    fn empty_input_builds_and_answers() {
        let tree = PointQuadtree::build(&[]);
        assert!(tree.is_empty());
        let rect = Rect::from_corners(vec2(-1.0, -1.0), vec2(1.0, 1.0));
        assert!(tree.query_rect(rect, UNBOUNDED).is_empty());
    }

    #[test]
    fn degenerate_rect_hits_only_coincident_point() {
        let tree = PointQuadtree::build(&points_from(&[(1.0, 1.0), (1.5, 1.5)]));
        let click = Rect::from_corners(vec2(1.0, 1.0), vec2(1.0, 1.0));
        assert_eq!(tree.query_rect(click, UNBOUNDED), vec![0]);

        let miss = Rect::from_corners(vec2(1.2, 1.2), vec2(1.2, 1.2));
        assert!(tree.query_rect(miss, UNBOUNDED).is_empty());
    }

    #[test]
    fn duplicate_coordinates_all_reported() {
        let coords = vec![(3.0, 3.0); 40];
        let tree = PointQuadtree::build(&points_from(&coords));
        let rect = Rect::from_corners(vec2(2.0, 2.0), vec2(4.0, 4.0));
        let mut hits = tree.query_rect(rect, UNBOUNDED);
        hits.sort_unstable();
        assert_eq!(hits, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn matches_linear_scan_on_random_input() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let points: Vec<IndexPoint> = (0..600)
            .map(|slot| IndexPoint {
                slot,
                pos: vec2(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)),
                scalar: if slot % 3 == 0 {
                    None
                } else {
                    Some(rng.gen_range(-2.0..2.0))
                },
            })
            .collect();
        let tree = PointQuadtree::build(&points);

        for _ in 0..200 {
            // Corners drawn from existing point coordinates half the time, so
            // rectangles land exactly on points and exercise the inclusive edges.
            let corner = |rng: &mut StdRng| {
                if rng.gen_bool(0.5) {
                    let p = points[rng.gen_range(0..points.len())].pos;
                    vec2(p.x, p.y)
                } else {
                    vec2(rng.gen_range(-60.0..60.0), rng.gen_range(-60.0..60.0))
                }
            };
            let rect = Rect::from_corners(corner(&mut rng), corner(&mut rng));
            let bounds = if rng.gen_bool(0.5) {
                UNBOUNDED
            } else {
                let lo = rng.gen_range(-2.0..1.0);
                (lo, lo + rng.gen_range(0.0..2.0))
            };

            let mut fast = tree.query_rect(rect, bounds);
            let mut slow = brute_force(&points, rect, bounds);
            fast.sort_unstable();
            slow.sort_unstable();
            assert_eq!(fast, slow);
        }
    }

    #[test]
    fn scalar_bounds_are_inclusive() {
        let points = vec![
            IndexPoint {
                slot: 0,
                pos: vec2(0.0, 0.0),
                scalar: Some(1.0),
            },
            IndexPoint {
                slot: 1,
                pos: vec2(0.5, 0.5),
                scalar: Some(5.0),
            },
        ];
        let tree = PointQuadtree::build(&points);
        let rect = Rect::from_corners(vec2(-1.0, -1.0), vec2(1.0, 1.0));
        assert_eq!(tree.query_rect(rect, (1.0, 4.0)), vec![0]);
    }

    #[test]
    fn small_rect_query_is_sublinear() {
        let mut rng = StdRng::seed_from_u64(0xa11ce);
        let points: Vec<IndexPoint> = (0..10_000)
            .map(|slot| IndexPoint::plain(slot, vec2(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0))))
            .collect();
        let tree = PointQuadtree::build(&points);
        let rect = Rect::from_corners(vec2(480.0, 480.0), vec2(520.0, 520.0));

        let mut visited = 0usize;
        let mut hits = Vec::new();
        tree.visit(|cell| {
            visited += 1;
            if !cell.rect.intersects(rect) {
                return true;
            }
            if cell.is_leaf {
                for point in cell.points {
                    if rect.contains(point.pos) {
                        hits.push(point.slot);
                    }
                }
            }
            false
        });

        let mut slow = brute_force(&points, rect, UNBOUNDED);
        hits.sort_unstable();
        slow.sort_unstable();
        assert_eq!(hits, slow);
        assert!(visited < 1000, "visited {visited} of 10000-point tree");
    }
}
