//! Polygon repair: every polygon inside a signal must be a simple ring before
//! it is tokenized.

use crate::error::TokenizeError;
use crate::geometry::{create, round_coord};
use crate::tree::{Attr, Node, Tag};
use cavalier_contours::polyline::{
    PlineOrientation, PlineSource, PlineSourceMut, PlineVertex, Polyline,
};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap, HashSet};

pub type Point = (f64, f64);
pub type Ring = Vec<Point>;

/// Decomposes a possibly self-intersecting ring into simple rings covering
/// the same area. Output rings are open (no repeated closing vertex).
pub trait PolygonRepair {
    fn repair(&self, ring: &[Point]) -> Vec<Ring>;
}

/// Nodes the ring at its self-intersections and keeps the faces of the
/// resulting planar graph that lie inside the ring under the even-odd rule.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContourRepair;

const SNAP: f64 = 1e-7;
const PARAM_EPSILON: f64 = 1e-9;
const AREA_EPSILON: f64 = 1e-9;
const REDUNDANT_EPSILON: f64 = 1e-9;

impl PolygonRepair for ContourRepair {
    fn repair(&self, ring: &[Point]) -> Vec<Ring> {
        let ring = dedupe(ring);
        if ring.len() < 3 {
            return Vec::new();
        }

        let mut segments = ring_segments(&ring);
        let mut arrangement = Arrangement::build(&segments);
        // a component nested inside another leaves a face with a hole; cut
        // every component open with a vertical line through its interior
        let components = arrangement.outer_cycles();
        if components.len() > 1 {
            segments.extend(vertical_cuts(&arrangement, &components));
            arrangement = Arrangement::build(&segments);
        }

        arrangement
            .bounded_faces()
            .into_iter()
            .filter(|face| {
                arrangement
                    .sample_point(face, &segments)
                    .is_some_and(|p| inside_even_odd(p, &ring))
            })
            .filter_map(|face| {
                let rounded: Ring = face
                    .into_iter()
                    .map(|i| arrangement.points[i])
                    .map(|(x, y)| (round_coord(x), round_coord(y)))
                    .collect();
                let cleaned = simplify_ring(&dedupe(&rounded));
                (cleaned.len() >= 3 && signed_area(&cleaned).abs() > AREA_EPSILON)
                    .then(|| counter_clockwise(cleaned))
            })
            .collect()
    }
}

// ─── Ring predicates ─────────────────────────────────────────────────

/// Drop consecutive duplicates, including a closing vertex equal to the first.
pub fn dedupe(ring: &[Point]) -> Ring {
    let mut out: Ring = Vec::with_capacity(ring.len());
    for &p in ring {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// Shoelace area; positive for counter-clockwise rings.
pub fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum();
    twice / 2.0
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// A simple ring has at least three distinct vertices, a non-zero area, no
/// repeated vertex, no edge folding back onto its predecessor and no
/// self-intersection.
pub fn is_simple_ring(ring: &[Point]) -> bool {
    let ring = dedupe(ring);
    let n = ring.len();
    if n < 3 || signed_area(&ring).abs() <= AREA_EPSILON {
        return false;
    }

    for i in 0..n {
        let (a, b, c) = (ring[i], ring[(i + 1) % n], ring[(i + 2) % n]);
        let dot = (b.0 - a.0) * (c.0 - b.0) + (b.1 - a.1) * (c.1 - b.1);
        if cross(a, b, c).abs() <= PARAM_EPSILON && dot < 0.0 {
            return false;
        }
    }

    let mut seen = HashSet::new();
    if !ring.iter().all(|&p| seen.insert(snap_key(p))) {
        return false;
    }
    !to_polyline(&ring).scan_for_self_intersect()
}

// ─── Simplification ──────────────────────────────────────────────────

fn to_polyline(ring: &[Point]) -> Polyline<f64> {
    let mut pl = Polyline::new_closed();
    for &(x, y) in ring {
        pl.vertex_data.push(PlineVertex::new(x, y, 0.0));
    }
    pl
}

fn from_polyline(pl: &Polyline<f64>) -> Ring {
    pl.vertex_data.iter().map(|v| (v.x, v.y)).collect()
}

/// Remove repeated and collinear vertices without changing the covered area.
pub fn simplify_ring(ring: &[Point]) -> Ring {
    let pl = to_polyline(ring);
    let simplified = pl.remove_redundant(REDUNDANT_EPSILON).unwrap_or(pl);
    from_polyline(&simplified)
}

fn counter_clockwise(ring: Ring) -> Ring {
    let mut pl = to_polyline(&ring);
    if pl.orientation() == PlineOrientation::Clockwise {
        pl.invert_direction_mut();
    }
    from_polyline(&pl)
}

// ─── Noding and face tracing ─────────────────────────────────────────

fn snap_key((x, y): Point) -> (i64, i64) {
    ((x / SNAP).round() as i64, (y / SNAP).round() as i64)
}

type Segment = (Point, Point);

fn ring_segments(ring: &[Point]) -> Vec<Segment> {
    let n = ring.len();
    (0..n).map(|i| (ring[i], ring[(i + 1) % n])).collect()
}

/// Crossing-number test; `p` must not lie on the ring.
fn inside_even_odd(p: Point, ring: &[Point]) -> bool {
    let mut inside = false;
    for (a, b) in ring_segments(ring) {
        if (a.1 > p.1) != (b.1 > p.1) {
            let x = a.0 + (p.1 - a.1) / (b.1 - a.1) * (b.0 - a.0);
            if p.0 < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// x of the crossing between a non-horizontal segment and the line `y`.
fn crossing_x((a, b): Segment, y: f64) -> Option<f64> {
    if (a.1 > y) == (b.1 > y) {
        return None;
    }
    Some(a.0 + (y - a.1) / (b.1 - a.1) * (b.0 - a.0))
}

/// Vertical lines spanning the whole drawing, one through the interior of
/// each component.
fn vertical_cuts(arrangement: &Arrangement, components: &[Vec<usize>]) -> Vec<Segment> {
    let ys = arrangement.points.iter().map(|p| p.1);
    let low = ys.clone().fold(f64::INFINITY, f64::min) - 1.0;
    let high = ys.fold(f64::NEG_INFINITY, f64::max) + 1.0;

    let mut xs: Vec<f64> = Vec::new();
    for component in components {
        let mut cx: Vec<f64> = component.iter().map(|&i| arrangement.points[i].0).collect();
        cx.sort_by(f64::total_cmp);
        cx.dedup_by(|a, b| (*a - *b).abs() <= SNAP);
        if let &[first, second, ..] = cx.as_slice() {
            let x = (first + second) / 2.0;
            if !xs.iter().any(|&seen| (seen - x).abs() <= SNAP) {
                xs.push(x);
            }
        }
    }
    debug!("cutting {} nested components open", xs.len());
    xs.into_iter().map(|x| ((x, low), (x, high))).collect()
}

/// Planar graph of noded segments with dangling edges and bridges removed.
struct Arrangement {
    points: Vec<Point>,
    edges: BTreeSet<(usize, usize)>,
}

impl Arrangement {
    fn build(segments: &[Segment]) -> Self {
        let (points, edges) = node_segments(segments);
        let mut arrangement = Self { points, edges };
        arrangement.remove_bridges();
        arrangement
    }

    /// Drop edges with the same face on both sides. They bound nothing and
    /// would make the face walking them non-simple.
    fn remove_bridges(&mut self) {
        loop {
            self.edges = prune_dangling(std::mem::take(&mut self.edges), self.points.len());
            let (_, face_of) = self.trace_cycles();
            let before = self.edges.len();
            self.edges
                .retain(|&(a, b)| face_of.get(&(a, b)) != face_of.get(&(b, a)));
            if self.edges.len() == before {
                return;
            }
        }
    }

    fn area(&self, cycle: &[usize]) -> f64 {
        let ring: Ring = cycle.iter().map(|&i| self.points[i]).collect();
        signed_area(&ring)
    }

    /// Clockwise cycles: the outer boundary of each connected component.
    fn outer_cycles(&self) -> Vec<Vec<usize>> {
        let (cycles, _) = self.trace_cycles();
        cycles
            .into_iter()
            .filter(|c| self.area(c) < -AREA_EPSILON)
            .collect()
    }

    /// Counter-clockwise face boundaries, split where a walk revisits a vertex.
    fn bounded_faces(&self) -> Vec<Vec<usize>> {
        let (cycles, _) = self.trace_cycles();
        cycles
            .into_iter()
            .flat_map(split_at_repeats)
            .filter(|c| self.area(c) > AREA_EPSILON)
            .collect()
    }

    /// Walk every directed edge keeping the face on its left; bounded faces
    /// come out counter-clockwise, component boundaries clockwise. Also
    /// returns the cycle index of each directed edge.
    fn trace_cycles(&self) -> (Vec<Vec<usize>>, HashMap<(usize, usize), usize>) {
        let points = &self.points;
        let mut around: Vec<Vec<usize>> = vec![Vec::new(); points.len()];
        for &(a, b) in &self.edges {
            around[a].push(b);
            around[b].push(a);
        }
        for (v, neighbors) in around.iter_mut().enumerate() {
            let (vx, vy) = points[v];
            let angle = |n: usize| (points[n].1 - vy).atan2(points[n].0 - vx);
            neighbors.sort_by(|&a, &b| angle(a).total_cmp(&angle(b)));
        }

        let mut face_of: HashMap<(usize, usize), usize> = HashMap::new();
        let mut cycles = Vec::new();
        for &(a, b) in &self.edges {
            for start in [(a, b), (b, a)] {
                if face_of.contains_key(&start) {
                    continue;
                }
                let mut cycle = Vec::new();
                let (mut u, mut v) = start;
                while !face_of.contains_key(&(u, v)) {
                    face_of.insert((u, v), cycles.len());
                    cycle.push(u);
                    let neighbors = &around[v];
                    let Some(k) = neighbors.iter().position(|&n| n == u) else {
                        break;
                    };
                    let w = neighbors[(k + neighbors.len() - 1) % neighbors.len()];
                    u = v;
                    v = w;
                }
                cycles.push(cycle);
            }
        }
        (cycles, face_of)
    }

    /// A point strictly inside `face` and off every segment: on a line
    /// between two vertex levels, just right of the face's left boundary.
    fn sample_point(&self, face: &[usize], segments: &[Segment]) -> Option<Point> {
        let ring: Ring = face.iter().map(|&i| self.points[i]).collect();
        let bottom = ring.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let next_level = self
            .points
            .iter()
            .map(|p| p.1)
            .filter(|&y| y > bottom + SNAP)
            .fold(f64::INFINITY, f64::min);
        if !next_level.is_finite() {
            return None;
        }
        let y = (bottom + next_level) / 2.0;

        let left = ring_segments(&ring)
            .into_iter()
            .filter_map(|s| crossing_x(s, y))
            .fold(f64::INFINITY, f64::min);
        let right = ring_segments(&ring)
            .into_iter()
            .chain(segments.iter().copied())
            .filter_map(|s| crossing_x(s, y))
            .filter(|&x| x > left + SNAP)
            .fold(f64::INFINITY, f64::min);
        (left.is_finite() && right.is_finite()).then(|| ((left + right) / 2.0, y))
    }
}

/// Split a closed walk into loops that each visit a vertex once.
fn split_at_repeats(cycle: Vec<usize>) -> Vec<Vec<usize>> {
    let mut loops = Vec::new();
    let mut stack: Vec<usize> = Vec::with_capacity(cycle.len());
    for v in cycle {
        if let Some(p) = stack.iter().position(|&s| s == v) {
            loops.push(stack.split_off(p));
        }
        stack.push(v);
    }
    loops.push(stack);
    loops
}

/// Split every segment at each point where another crosses or overlaps it,
/// returning the distinct points and the undirected edges between them.
fn node_segments(segments: &[Segment]) -> (Vec<Point>, BTreeSet<(usize, usize)>) {
    let mut points: Vec<Point> = Vec::new();
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut edges = BTreeSet::new();

    for (i, &(p1, p2)) in segments.iter().enumerate() {
        let r = (p2.0 - p1.0, p2.1 - p1.1);
        let rr = r.0 * r.0 + r.1 * r.1;
        if rr == 0.0 {
            continue;
        }

        let mut params = vec![0.0, 1.0];
        for (j, &(q1, q2)) in segments.iter().enumerate() {
            if i == j {
                continue;
            }
            let s = (q2.0 - q1.0, q2.1 - q1.1);
            let qp = (q1.0 - p1.0, q1.1 - p1.1);
            let denom = r.0 * s.1 - r.1 * s.0;
            if denom.abs() > PARAM_EPSILON {
                let t = (qp.0 * s.1 - qp.1 * s.0) / denom;
                let u = (qp.0 * r.1 - qp.1 * r.0) / denom;
                let range = -PARAM_EPSILON..=1.0 + PARAM_EPSILON;
                if range.contains(&t) && range.contains(&u) {
                    params.push(t.clamp(0.0, 1.0));
                }
            } else if (qp.0 * r.1 - qp.1 * r.0).abs() <= PARAM_EPSILON {
                // collinear: split at the other segment's endpoints
                for q in [q1, q2] {
                    let t = ((q.0 - p1.0) * r.0 + (q.1 - p1.1) * r.1) / rr;
                    if t > PARAM_EPSILON && t < 1.0 - PARAM_EPSILON {
                        params.push(t);
                    }
                }
            }
        }
        params.sort_by(f64::total_cmp);

        let mut previous: Option<usize> = None;
        for t in params {
            let point = (p1.0 + t * r.0, p1.1 + t * r.1);
            let id = *index.entry(snap_key(point)).or_insert_with(|| {
                points.push(point);
                points.len() - 1
            });
            if let Some(prev) = previous {
                if prev != id {
                    edges.insert((prev.min(id), prev.max(id)));
                }
            }
            previous = Some(id);
        }
    }
    (points, edges)
}

/// Dangling edges cannot bound a face.
fn prune_dangling(mut edges: BTreeSet<(usize, usize)>, vertex_count: usize) -> BTreeSet<(usize, usize)> {
    loop {
        let mut degree = vec![0usize; vertex_count];
        for &(a, b) in &edges {
            degree[a] += 1;
            degree[b] += 1;
        }
        let before = edges.len();
        edges.retain(|&(a, b)| degree[a] > 1 && degree[b] > 1);
        if edges.len() == before {
            return edges;
        }
    }
}

// ─── Board integration ───────────────────────────────────────────────

fn polygon_ring(polygon: &Node) -> Result<Ring, TokenizeError> {
    polygon
        .children_with_tag(Tag::Vertex)
        .map(|v| Ok((v.f64_attr(Attr::X)?, v.f64_attr(Attr::Y)?)))
        .collect()
}

fn polygon_from_ring(original: &Node, ring: &[Point]) -> Node {
    let mut polygon = Node::named(original.name());
    for (key, value) in original.attributes() {
        polygon.set_raw_attr(key, value);
    }
    for &(x, y) in ring {
        polygon.push(create::vertex(x, y));
    }
    polygon
}

/// Replace every polygon of a signal with simple polygons. Valid rings are
/// simplified, invalid ones decomposed, degenerate ones (< 3 vertices)
/// dropped. Results keep the original attributes and are appended after the
/// signal's other children.
pub fn fix_polygons(signal: &mut Node, repair: &dyn PolygonRepair) -> Result<(), TokenizeError> {
    let (polygons, others): (Vec<Node>, Vec<Node>) = std::mem::take(&mut signal.children)
        .into_iter()
        .partition(|c| c.tag() == Tag::Polygon);
    signal.children = others;

    for polygon in polygons {
        let ring = polygon_ring(&polygon)?;
        if ring.len() < 3 {
            warn!(
                "dropping polygon with {} vertices in signal {}",
                ring.len(),
                signal.attr(Attr::Name).unwrap_or("?")
            );
            continue;
        }

        let rings = if is_simple_ring(&ring) {
            vec![simplify_ring(&dedupe(&ring))]
        } else {
            let rings = repair.repair(&ring);
            debug!("self-intersecting polygon split into {} rings", rings.len());
            rings
        };
        for ring in rings {
            signal.push(polygon_from_ring(&polygon, &ring));
        }
    }
    Ok(())
}

/// Apply `fix_polygons` to every signal in the tree.
pub fn fix_board_signals(root: &mut Node, repair: &dyn PolygonRepair) -> Result<(), TokenizeError> {
    if root.tag() == Tag::Signal {
        return fix_polygons(root, repair);
    }
    for child in &mut root.children {
        fix_board_signals(child, repair)?;
    }
    Ok(())
}
