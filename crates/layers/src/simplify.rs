//! Polyline simplification by effective-area elimination (Visvalingam).
//!
//! Vertices live in an [`Arena`] and link to their neighbours by index, so
//! splicing a vertex out is O(1). A min-heap ordered by effective area holds
//! one entry per live version of each vertex; entries made stale by a
//! neighbour's removal are skipped when popped.
//!
//! Ordering contract:
//! - Scores are monotonic in elimination order: a vertex eliminated later
//!   never scores below one eliminated earlier.
//! - Equal scores rank by elimination order (later is more significant).
//! - Random jitter only separates exactly equal areas; with a fixed seed
//!   the output is reproducible.
//! - A non-finite coordinate anywhere in the input is an error; nothing is
//!   ranked.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use foundation::arena::Arena;
use foundation::math::{StableF64, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Relative jitter added to each effective area at insertion.
const TIE_JITTER: f64 = 1e-9;

/// Anything with a position in the simplification plane.
pub trait PlanarPoint: Copy {
    fn xy(&self) -> [f64; 2];
}

impl PlanarPoint for [f64; 2] {
    fn xy(&self) -> [f64; 2] {
        *self
    }
}

impl PlanarPoint for [f64; 3] {
    fn xy(&self) -> [f64; 2] {
        [self[0], self[1]]
    }
}

impl PlanarPoint for Vec2 {
    fn xy(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl PlanarPoint for Vec3 {
    fn xy(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SimplifyError {
    NonFinite { index: usize, x: f64, y: f64 },
}

impl std::fmt::Display for SimplifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimplifyError::NonFinite { index, x, y } => {
                write!(f, "vertex {index} is not finite: ({x}, {y})")
            }
        }
    }
}

impl std::error::Error for SimplifyError {}

fn planar_coords<P: PlanarPoint>(points: &[P]) -> Result<Vec<[f64; 2]>, SimplifyError> {
    points
        .iter()
        .enumerate()
        .map(|(index, p)| {
            let [x, y] = p.xy();
            if x.is_finite() && y.is_finite() {
                Ok([x, y])
            } else {
                Err(SimplifyError::NonFinite { index, x, y })
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
struct VertexRecord {
    prev: Option<usize>,
    next: Option<usize>,
    version: u32,
    removed: bool,
}

/// Per-vertex significance of a polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Effective area at which each vertex is eliminated; `+inf` for endpoints.
    pub scores: Vec<f64>,
    /// Elimination step of each vertex; higher survives longer. Endpoints
    /// hold `usize::MAX`.
    pub removal_rank: Vec<usize>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Indices of the `keep` most significant vertices, in input order.
    pub fn top(&self, keep: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| Reverse(self.removal_rank[i]));
        order.truncate(keep);
        order.sort_unstable();
        order
    }
}

/// Area of triangle `a b c`.
fn triangle_area(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs()
}

fn jittered(area: f64, rng: &mut impl Rng) -> f64 {
    area + rng.gen_range(0.0..1.0) * TIE_JITTER * (1.0 + area)
}

/// Score every vertex of `points` by repeated least-area elimination.
pub fn rank<P: PlanarPoint>(points: &[P], rng: &mut impl Rng) -> Result<Ranking, SimplifyError> {
    let xy = planar_coords(points)?;
    let n = xy.len();
    let mut scores = vec![f64::INFINITY; n];
    let mut removal_rank = vec![usize::MAX; n];
    if n <= 2 {
        return Ok(Ranking {
            scores,
            removal_rank,
        });
    }

    let mut arena = Arena::with_capacity(n);
    let mut heap = BinaryHeap::with_capacity(n);

    for i in 0..n {
        let interior = i > 0 && i + 1 < n;
        let area = if interior {
            jittered(triangle_area(xy[i - 1], xy[i], xy[i + 1]), rng)
        } else {
            f64::INFINITY
        };
        let idx = arena.alloc(VertexRecord {
            prev: i.checked_sub(1),
            next: (i + 1 < n).then_some(i + 1),
            version: 0,
            removed: false,
        });
        if interior {
            heap.push(Reverse((StableF64(area), idx, 0u32)));
        }
    }

    let mut max_area = 0.0_f64;
    let mut step = 0usize;

    while let Some(Reverse((StableF64(area), idx, version))) = heap.pop() {
        let Some(rec) = arena.get_mut(idx) else {
            continue;
        };
        if rec.removed || rec.version != version {
            continue;
        }
        rec.removed = true;
        let (prev, next) = (rec.prev, rec.next);

        max_area = max_area.max(area);
        scores[idx] = max_area;
        removal_rank[idx] = step;
        step += 1;

        if let Some(p) = prev
            && let Some(rec) = arena.get_mut(p)
        {
            rec.next = next;
        }
        if let Some(nx) = next
            && let Some(rec) = arena.get_mut(nx)
        {
            rec.prev = prev;
        }

        for neighbour in [prev, next].into_iter().flatten() {
            refresh(&mut arena, &mut heap, &xy, neighbour, max_area, rng);
        }
    }

    Ok(Ranking {
        scores,
        removal_rank,
    })
}

fn refresh(
    arena: &mut Arena<VertexRecord>,
    heap: &mut BinaryHeap<Reverse<(StableF64, usize, u32)>>,
    xy: &[[f64; 2]],
    idx: usize,
    floor: f64,
    rng: &mut impl Rng,
) {
    let Some(rec) = arena.get(idx) else {
        return;
    };
    let (Some(p), Some(n)) = (rec.prev, rec.next) else {
        // Endpoints are never eliminated.
        return;
    };
    let area = jittered(triangle_area(xy[p], xy[idx], xy[n]), rng).max(floor);
    if let Some(rec) = arena.get_mut(idx) {
        rec.version += 1;
        heap.push(Reverse((StableF64(area), idx, rec.version)));
    }
}

/// Reduce `points` to `keep` vertices, first and last always included.
///
/// `keep` counts the endpoints; values below 2 are raised to 2. When `keep`
/// is at least the input length the input is returned unchanged, but it is
/// still checked for non-finite coordinates.
pub fn simplify<P: PlanarPoint>(
    points: &[P],
    keep: usize,
    rng: &mut impl Rng,
) -> Result<Vec<P>, SimplifyError> {
    if keep >= points.len() {
        planar_coords(points)?;
        return Ok(points.to_vec());
    }
    let keep = keep.max(2);
    let ranking = rank(points, rng)?;
    Ok(ranking.top(keep).into_iter().map(|i| points[i]).collect())
}

/// [`simplify`] with a generator seeded from `seed`.
pub fn simplify_seeded<P: PlanarPoint>(
    points: &[P],
    keep: usize,
    seed: u64,
) -> Result<Vec<P>, SimplifyError> {
    let mut rng = StdRng::seed_from_u64(seed);
    simplify(points, keep, &mut rng)
}

/// Vertices whose score is at least `min_area`, in input order.
///
/// Lets a caller keep one ranking and cut it at several detail levels.
pub fn filter_by_area<P: PlanarPoint>(points: &[P], ranking: &Ranking, min_area: f64) -> Vec<P> {
    points
        .iter()
        .zip(&ranking.scores)
        .filter(|(_, score)| **score >= min_area)
        .map(|(p, _)| *p)
        .collect()
}

/// Split a global vertex budget across `lines` in proportion to their
/// vertex counts and simplify each to its share (never below 2).
pub fn simplify_to_budget<P: PlanarPoint>(
    lines: &[Vec<P>],
    budget: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Vec<P>>, SimplifyError> {
    let total: usize = lines.iter().map(Vec::len).sum();
    if budget >= total {
        for line in lines {
            planar_coords(line)?;
        }
        return Ok(lines.to_vec());
    }
    lines
        .iter()
        .map(|line| {
            let share = (budget as f64 * line.len() as f64 / total as f64).floor() as usize;
            simplify(line, share.max(2), rng)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{SimplifyError, filter_by_area, rank, simplify_seeded, simplify_to_budget};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn zigzag(n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                let y = (x * 0.7).sin() * (1.0 + (i % 5) as f64);
                [x, y]
            })
            .collect()
    }

    #[test]
    fn returns_exactly_keep_points_with_endpoints() {
        let pts = zigzag(40);
        for keep in 2..40 {
            let out = simplify_seeded(&pts, keep, 7).unwrap();
            assert_eq!(out.len(), keep);
            assert_eq!(out.first(), pts.first());
            assert_eq!(out.last(), pts.last());
        }
    }

    #[test]
    fn output_preserves_input_order() {
        let pts = zigzag(25);
        let out = simplify_seeded(&pts, 9, 1).unwrap();
        let xs: Vec<f64> = out.iter().map(|p| p[0]).collect();
        let mut sorted = xs.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(xs, sorted);
    }

    #[test]
    fn simplify_is_idempotent() {
        let pts = zigzag(30);
        let once = simplify_seeded(&pts, 10, 3).unwrap();
        let twice = simplify_seeded(&once, 10, 3).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn keep_at_or_above_len_returns_input() {
        let pts = zigzag(6);
        assert_eq!(simplify_seeded(&pts, 6, 0).unwrap(), pts);
        assert_eq!(simplify_seeded(&pts, 100, 0).unwrap(), pts);
        assert!(simplify_seeded::<[f64; 2]>(&[], 3, 0).unwrap().is_empty());
    }

    #[test]
    fn keep_below_two_still_keeps_endpoints() {
        let pts = zigzag(10);
        assert_eq!(simplify_seeded(&pts, 0, 0).unwrap(), vec![pts[0], pts[9]]);
    }

    #[test]
    fn collinear_vertices_go_first() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 5.0], [6.0, 0.0]];
        assert_eq!(
            simplify_seeded(&pts, 3, 11).unwrap(),
            vec![[0.0, 0.0], [3.0, 5.0], [6.0, 0.0]]
        );
    }

    #[test]
    fn scores_are_monotonic_in_elimination_order() {
        let pts = zigzag(60);
        let mut rng = StdRng::seed_from_u64(5);
        let ranking = rank(&pts, &mut rng).unwrap();

        assert_eq!(ranking.scores[0], f64::INFINITY);
        assert_eq!(ranking.scores[59], f64::INFINITY);

        let mut by_step: Vec<usize> = (1..59).collect();
        by_step.sort_by_key(|&i| ranking.removal_rank[i]);
        for w in by_step.windows(2) {
            assert!(ranking.scores[w[1]] >= ranking.scores[w[0]]);
        }
    }

    #[test]
    fn same_seed_same_output_on_ties() {
        // Every interior vertex of a regular zigzag has the same area.
        let pts: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, (i % 2) as f64]).collect();
        assert_eq!(simplify_seeded(&pts, 7, 42).unwrap(), simplify_seeded(&pts, 7, 42).unwrap());
    }

    #[test]
    fn filter_by_area_cuts_at_threshold() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [2.0, 3.0], [3.0, 0.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let ranking = rank(&pts, &mut rng).unwrap();
        assert_eq!(
            filter_by_area(&pts, &ranking, 2.0),
            vec![[0.0, 0.0], [2.0, 3.0], [3.0, 0.0]]
        );
        assert_eq!(filter_by_area(&pts, &ranking, f64::INFINITY).len(), 2);
    }

    #[test]
    fn budget_is_split_by_vertex_count() {
        let lines = vec![zigzag(30), zigzag(10), zigzag(2)];
        let mut rng = StdRng::seed_from_u64(9);
        let out = simplify_to_budget(&lines, 21, &mut rng).unwrap();
        assert_eq!(out.iter().map(Vec::len).collect::<Vec<_>>(), vec![15, 5, 2]);

        let untouched = simplify_to_budget(&lines, 42, &mut rng).unwrap();
        assert_eq!(untouched, lines);
    }

    #[test]
    fn non_finite_vertices_are_rejected() {
        let pts = [[0.0, 0.0], [f64::NAN, 1.0], [2.0, 0.0], [3.0, 3.0], [4.0, 0.0]];
        assert!(matches!(
            simplify_seeded(&pts, 3, 0),
            Err(SimplifyError::NonFinite { index: 1, .. })
        ));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(rank(&pts, &mut rng).is_err());

        // Even a no-op reduction checks its input.
        let short = [[0.0, 0.0], [f64::INFINITY, 0.0]];
        assert!(simplify_seeded(&short, 5, 0).is_err());
        let lines = vec![vec![[0.0, 0.0], [1.0, f64::NEG_INFINITY]]];
        assert!(simplify_to_budget(&lines, 10, &mut rng).is_err());
    }
}
