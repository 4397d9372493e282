//! Seidel's point-location structure and the per-call decomposition context.
//!
//! The structure starts as a single leaf for the unbounded plane. Inserting a
//! vertex turns the leaf containing it into a vertex decision with two leaf
//! children; inserting an edge walks the trapezoids it pierces, splits each
//! into a left/right pair, repairs adjacency, and merges stacks that ended up
//! with identical side edges. Merges redirect parent links, so the structure
//! is a DAG: nodes may be reachable through several parents, never twice on
//! one root path.

use std::collections::{HashMap, HashSet};

use derive_more::with_trait::IsVariant;
use log::trace;
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use smallvec::{SmallVec, smallvec};
use thiserror::Error;

use crate::{
    math::{Edge, Point},
    trapezoid::{TrapKey, Trapezoid, replace_neighbor},
};

mod adjacency;

new_key_type! {
    /// Key of a node in the search structure arena.
    pub struct NodeKey;
}

/// A structural guarantee of the decomposition did not hold. Always a bug in
/// the construction, never a property of the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("internal invariant violated: {0}")]
pub struct InvariantViolation(pub &'static str);

#[derive(Debug, Clone, Copy)]
#[derive(IsVariant)]
pub enum NodeKind {
    /// The region is still undivided; payload is its trapezoid.
    Leaf(TrapKey),
    /// Decision on the point order: `below` holds everything under the
    /// point, `above` everything over it.
    Vertex { point: Point, below: NodeKey, above: NodeKey },
    /// Decision on edge sidedness.
    Edge { edge: Edge, left: NodeKey, right: NodeKey },
}

#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    /// Merges can route several parents at one node; see module docs.
    parents: SmallVec<[NodeKey; 2]>,
}

impl Node {
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// State of one trapezoidation run: node arena, trapezoid arena, and the
/// registry mapping each edge to the trapezoids it currently bounds on the
/// right. Everything here dies with the run; concurrent runs share nothing.
#[derive(Debug)]
pub struct Trapezoidation {
    nodes: SlotMap<NodeKey, Node>,
    traps: SlotMap<TrapKey, Trapezoid>,
    root: NodeKey,
    traps_by_right_edge: HashMap<Edge, HashSet<TrapKey>>,
}

impl Default for Trapezoidation {
    fn default() -> Self {
        Self::new()
    }
}

impl Trapezoidation {
    /// A single leaf covering the whole plane.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let mut traps = SlotMap::with_key();

        let trap = traps.insert(Trapezoid::unbounded());
        let root =
            nodes.insert(Node { kind: NodeKind::Leaf(trap), parents: SmallVec::new() });
        traps[trap].node = root;

        Trapezoidation { nodes, traps, root, traps_by_right_edge: HashMap::new() }
    }

    pub fn trap(&self, key: TrapKey) -> &Trapezoid {
        &self.traps[key]
    }

    pub fn node(&self, key: NodeKey) -> &Node {
        &self.nodes[key]
    }

    pub const fn root(&self) -> NodeKey {
        self.root
    }

    /// Walks the structure from the root down to the leaf whose trapezoid
    /// contains the query coordinates.
    fn locate(&self, x: f64, y: f64) -> NodeKey {
        let mut current = self.root;
        loop {
            current = match self.nodes[current].kind {
                NodeKind::Leaf(_) => return current,
                NodeKind::Vertex { point, below, above } => {
                    if Point::coords_above(x, y, point) { above } else { below }
                }
                NodeKind::Edge { edge, left, right } => {
                    if edge.coords_right_of((x, y)) { right } else { left }
                }
            };
        }
    }

    /// Splits the trapezoid containing `point` horizontally across it.
    pub fn insert_vertex(&mut self, point: Point) -> Result<(), InvariantViolation> {
        let leaf = self.locate(point.x, point.y);
        self.split_leaf_by_vertex(leaf, point)
    }

    /// Inserts one polygon edge. Both endpoints must already be inserted;
    /// the flags say whether this very iteration inserted them, which decides
    /// how exterior adjacency at the edge ends is inherited.
    pub fn insert_edge(
        &mut self,
        edge: Edge,
        top_just_inserted: bool,
        bottom_just_inserted: bool,
    ) -> Result<(), InvariantViolation> {
        let (mid_x, mid_y) = edge.midpoint();
        let start_leaf = self.locate(mid_x, mid_y);
        let start_trap = self.leaf_trap(start_leaf)?;

        let downward = self.leaves_pierced_towards(start_trap, edge, false)?;
        let upward = self.leaves_pierced_towards(start_trap, edge, true)?;

        // Split top to bottom so the couple list is ordered the same way.
        let mut couples = Vec::with_capacity(upward.len() + downward.len() + 1);
        for &leaf in upward.iter().rev() {
            self.split_leaf_by_edge(leaf, edge, &mut couples)?;
        }
        self.split_leaf_by_edge(start_leaf, edge, &mut couples)?;
        for &leaf in &downward {
            self.split_leaf_by_edge(leaf, edge, &mut couples)?;
        }

        trace!("edge {edge} split {} trapezoids", couples.len());

        self.repair_adjacency(edge, &couples, top_just_inserted, bottom_just_inserted)?;
        self.merge_redundant_stacks(&couples);

        Ok(())
    }

    /// Every current trapezoid, in left-to-right, top-to-bottom leaf order.
    /// Nodes reachable through several parents are visited once.
    pub fn trapezoids(&self) -> Vec<TrapKey> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![self.root];

        while let Some(key) = stack.pop() {
            if !visited.insert(key) {
                continue;
            }
            match self.nodes[key].kind {
                NodeKind::Leaf(trap) => result.push(trap),
                NodeKind::Vertex { below, above, .. } => {
                    stack.push(above);
                    stack.push(below);
                }
                NodeKind::Edge { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        result
    }

    /// The trapezoids lying inside the polygonal area, in enumeration order.
    ///
    /// Only valid once every edge is inserted: the classification steps
    /// leftward across side edges, and mid-construction answers would be
    /// stale.
    pub fn interior_trapezoids(&self) -> Vec<TrapKey> {
        let mut memo = SecondaryMap::new();
        self.trapezoids().into_iter().filter(|&trap| self.is_inside(trap, &mut memo)).collect()
    }

    /// Odd-crossing-depth rule, one edge at a time: a bounded trapezoid is
    /// inside iff its neighbor across the left edge is outside. The step
    /// strictly decreases the number of edges to the left, so the recursion
    /// bottoms out at the open strips of the hull.
    fn is_inside(&self, trap: TrapKey, memo: &mut SecondaryMap<TrapKey, bool>) -> bool {
        if let Some(&cached) = memo.get(trap) {
            return cached;
        }

        let result = match (self.traps[trap].left_edge, self.traps[trap].right_edge()) {
            (Some(left_edge), Some(_)) => {
                let across = self
                    .traps_by_right_edge
                    .get(&left_edge)
                    .and_then(|traps| traps.iter().next().copied());
                debug_assert!(across.is_some(), "left edge absent from the right-edge registry");
                match across {
                    Some(neighbor) => !self.is_inside(neighbor, memo),
                    None => false,
                }
            }
            _ => false,
        };

        memo.insert(trap, result);
        result
    }

    /// Verifies adjacency symmetry, the two-neighbor bound, and the
    /// shared-vertex rule over the whole arena.
    pub fn check_adjacency(&self) -> Result<(), InvariantViolation> {
        for (key, trap) in &self.traps {
            if trap.above.len() > 2 || trap.below.len() > 2 {
                return Err(InvariantViolation("more than two neighbors across a horizontal side"));
            }
            for &upper in &trap.above {
                let other = self
                    .traps
                    .get(upper)
                    .ok_or(InvariantViolation("adjacency names a removed trapezoid"))?;
                if !other.below.contains(&key) {
                    return Err(InvariantViolation("above/below adjacency is not symmetric"));
                }
                if other.bottom_vertex != trap.top_vertex {
                    return Err(InvariantViolation("touching trapezoids disagree on their shared vertex"));
                }
            }
            for &lower in &trap.below {
                let other = self
                    .traps
                    .get(lower)
                    .ok_or(InvariantViolation("adjacency names a removed trapezoid"))?;
                if !other.above.contains(&key) {
                    return Err(InvariantViolation("below/above adjacency is not symmetric"));
                }
            }
        }
        Ok(())
    }

    fn leaf_trap(&self, node: NodeKey) -> Result<TrapKey, InvariantViolation> {
        match self.nodes[node].kind {
            NodeKind::Leaf(trap) => Ok(trap),
            _ => Err(InvariantViolation("expected a leaf of the search structure")),
        }
    }

    /// Collects the leaves whose trapezoids `edge` pierces beyond the start
    /// trapezoid, walking via adjacency until the trapezoid ending at the
    /// edge's endpoint is reached. At a two-way branch the side is decided by
    /// where the left candidate's inner corner falls relative to the edge.
    fn leaves_pierced_towards(
        &self,
        start: TrapKey,
        edge: Edge,
        upward: bool,
    ) -> Result<Vec<NodeKey>, InvariantViolation> {
        let end = edge.vertex(upward);
        let mut leaves = Vec::new();
        let mut current = start;

        while self.traps[current].vertex(upward) != Some(end) {
            current = match self.traps[current].adjacent(upward).as_slice() {
                &[only] => only,
                &[left, right] => {
                    let corner = self.traps[left]
                        .extreme_point(!upward, true)
                        .ok_or(InvariantViolation("branch candidate lost its inner corner"))?;
                    if edge.coords_right_of(corner) { left } else { right }
                }
                _ => return Err(InvariantViolation("edge walk ran out of neighbors")),
            };
            leaves.push(self.traps[current].node);
        }

        Ok(leaves)
    }

    /// The receiver leaf becomes a vertex decision; its trapezoid becomes the
    /// upper half and a duplicate the lower half.
    fn split_leaf_by_vertex(
        &mut self,
        leaf: NodeKey,
        point: Point,
    ) -> Result<(), InvariantViolation> {
        let top_key = self.leaf_trap(leaf)?;
        let bottom_key = self.insert_duplicate(top_key);

        let old_below = std::mem::take(&mut self.traps[top_key].below);
        for &neighbor in &old_below {
            replace_neighbor(self.traps[neighbor].adjacent_mut(true), top_key, bottom_key);
        }

        {
            let bottom = &mut self.traps[bottom_key];
            bottom.top_vertex = Some(point);
            bottom.below = old_below;
            bottom.above = smallvec![top_key];
        }
        {
            let top = &mut self.traps[top_key];
            top.bottom_vertex = Some(point);
            top.below = smallvec![bottom_key];
        }

        let below = self.new_leaf(bottom_key, leaf);
        let above = self.new_leaf(top_key, leaf);
        self.nodes[leaf].kind = NodeKind::Vertex { point, below, above };

        Ok(())
    }

    /// The receiver leaf becomes an edge decision; its trapezoid becomes the
    /// right half and a duplicate the left half. Adjacency of the new couple
    /// is repaired by the caller once all couples exist.
    fn split_leaf_by_edge(
        &mut self,
        leaf: NodeKey,
        edge: Edge,
        couples: &mut Vec<(TrapKey, TrapKey)>,
    ) -> Result<(), InvariantViolation> {
        let right_key = self.leaf_trap(leaf)?;
        let left_key = self.insert_duplicate(right_key);

        self.set_right_edge(left_key, Some(edge));
        self.traps[right_key].left_edge = Some(edge);
        couples.push((left_key, right_key));

        let left = self.new_leaf(left_key, leaf);
        let right = self.new_leaf(right_key, leaf);
        self.nodes[leaf].kind = NodeKind::Edge { edge, left, right };

        Ok(())
    }

    fn new_leaf(&mut self, trap: TrapKey, parent: NodeKey) -> NodeKey {
        let key =
            self.nodes.insert(Node { kind: NodeKind::Leaf(trap), parents: smallvec![parent] });
        self.traps[trap].node = key;
        key
    }

    fn insert_duplicate(&mut self, original: TrapKey) -> TrapKey {
        let copy = self.traps[original].duplicate();
        let right_edge = copy.right_edge();
        let key = self.traps.insert(copy);
        if let Some(edge) = right_edge {
            self.traps_by_right_edge.entry(edge).or_default().insert(key);
        }
        key
    }

    /// Single point of mutation for right edges; keeps the registry in step.
    fn set_right_edge(&mut self, trap: TrapKey, edge: Option<Edge>) {
        if let Some(old) = self.traps[trap].right_edge() {
            if let Some(registered) = self.traps_by_right_edge.get_mut(&old) {
                registered.remove(&trap);
                if registered.is_empty() {
                    self.traps_by_right_edge.remove(&old);
                }
            }
        }

        self.traps[trap].set_right_edge_raw(edge);

        if let Some(new) = edge {
            self.traps_by_right_edge.entry(new).or_default().insert(trap);
        }
    }

    /// Redirects every parent link of `old` to `new`; `old` becomes
    /// unreachable. Child links are never rewritten back, so no cycles can
    /// form.
    fn redirect_parent_links(&mut self, old: NodeKey, new: NodeKey) {
        if old == new {
            return;
        }

        let parents = std::mem::take(&mut self.nodes[old].parents);
        for &parent in &parents {
            match &mut self.nodes[parent].kind {
                NodeKind::Leaf(_) => {
                    debug_assert!(false, "a leaf node cannot be a parent");
                }
                NodeKind::Vertex { below, above, .. } => {
                    if *below == old {
                        *below = new;
                    }
                    if *above == old {
                        *above = new;
                    }
                }
                NodeKind::Edge { left, right, .. } => {
                    if *left == old {
                        *left = new;
                    }
                    if *right == old {
                        *right = new;
                    }
                }
            }
        }
        self.nodes[new].parents.extend(parents);
    }
}

#[cfg(test)]
mod tests {
    use assertables::{assert_all, assert_len_eq_x};

    use super::*;
    use crate::math::point::test_point;

    fn insert_polygon(tz: &mut Trapezoidation, points: &[Point]) {
        let mut inserted = HashSet::new();
        for i in 0..points.len() {
            let edge = Edge::new(points[i], points[(i + 1) % points.len()]);
            let top_new = inserted.insert(edge.top.id());
            if top_new {
                tz.insert_vertex(edge.top).unwrap();
            }
            let bottom_new = inserted.insert(edge.bottom.id());
            if bottom_new {
                tz.insert_vertex(edge.bottom).unwrap();
            }
            tz.insert_edge(edge, top_new, bottom_new).unwrap();
        }
    }

    #[test]
    fn starts_as_the_unbounded_plane() {
        let tz = Trapezoidation::new();
        let traps = tz.trapezoids();

        assert_len_eq_x!(traps.clone(), 1);
        let trap = tz.trap(traps[0]);
        assert!(trap.top_vertex.is_none());
        assert!(trap.bottom_vertex.is_none());
        assert!(trap.left_edge.is_none());
        assert!(trap.right_edge().is_none());
    }

    #[test]
    fn vertex_split_stacks_two_traps() {
        let mut tz = Trapezoidation::new();
        assert!(tz.node(tz.root()).kind().is_leaf());

        let p = test_point(0, 2.0, 3.0);
        tz.insert_vertex(p).unwrap();
        assert!(tz.node(tz.root()).kind().is_vertex());

        let traps = tz.trapezoids();
        assert_len_eq_x!(traps.clone(), 2);

        // Enumeration goes below before above.
        let (bottom, top) = (tz.trap(traps[0]), tz.trap(traps[1]));
        assert_eq!(bottom.top_vertex, Some(p));
        assert_eq!(top.bottom_vertex, Some(p));
        assert_eq!(bottom.above.as_slice(), [traps[1]]);
        assert_eq!(top.below.as_slice(), [traps[0]]);
        tz.check_adjacency().unwrap();
    }

    #[test]
    fn edge_split_produces_bounded_couple() {
        let mut tz = Trapezoidation::new();
        let bottom = test_point(0, 1.0, 0.0);
        let top = test_point(1, 3.0, 5.0);
        let edge = Edge::new(bottom, top);

        tz.insert_vertex(top).unwrap();
        tz.insert_vertex(bottom).unwrap();
        tz.insert_edge(edge, true, true).unwrap();

        let traps = tz.trapezoids();
        assert_len_eq_x!(traps.clone(), 4);
        tz.check_adjacency().unwrap();

        let bounded: Vec<_> = traps
            .iter()
            .map(|&t| tz.trap(t))
            .filter(|t| t.left_edge.is_some() || t.right_edge().is_some())
            .collect();
        assert_len_eq_x!(bounded.clone(), 2);
        assert_all!(bounded.iter(), |t: &&Trapezoid| {
            t.left_edge == Some(edge) || t.right_edge() == Some(edge)
        });

        // A lone edge closes nothing.
        assert!(tz.interior_trapezoids().is_empty());
    }

    #[test]
    fn triangle_encloses_interior() {
        let points =
            [test_point(0, 0.0, 0.0), test_point(1, 10.0, 0.0), test_point(2, 0.0, 10.0)];
        let mut tz = Trapezoidation::new();
        insert_polygon(&mut tz, &points);

        tz.check_adjacency().unwrap();

        let inside = tz.interior_trapezoids();
        assert!(!inside.is_empty());
        assert_all!(inside.iter(), |&t: &TrapKey| {
            tz.trap(t).left_edge.is_some() && tz.trap(t).right_edge().is_some()
        });
    }

    #[test]
    fn leaf_enumeration_has_no_duplicates() {
        let points = [
            test_point(0, 0.0, 0.0),
            test_point(1, 4.0, 0.0),
            test_point(2, 4.0, 2.0),
            test_point(3, 2.0, 2.0),
            test_point(4, 2.0, 4.0),
            test_point(5, 0.0, 4.0),
        ];
        let mut tz = Trapezoidation::new();
        insert_polygon(&mut tz, &points);

        let traps = tz.trapezoids();
        let unique: HashSet<_> = traps.iter().copied().collect();
        assert_len_eq_x!(traps, unique.len());
    }

    #[test]
    fn interior_is_stable_across_insertion_orders() {
        let points =
            [test_point(0, 0.0, 0.0), test_point(1, 10.0, 0.0), test_point(2, 0.0, 10.0)];
        let mut edges: Vec<Edge> = (0..3)
            .map(|i| Edge::new(points[i], points[(i + 1) % 3]))
            .collect();

        let mut interior_areas = Vec::new();
        for _ in 0..3 {
            edges.rotate_left(1);
            let mut tz = Trapezoidation::new();
            let mut inserted = HashSet::new();
            for &edge in &edges {
                let top_new = inserted.insert(edge.top.id());
                if top_new {
                    tz.insert_vertex(edge.top).unwrap();
                }
                let bottom_new = inserted.insert(edge.bottom.id());
                if bottom_new {
                    tz.insert_vertex(edge.bottom).unwrap();
                }
                tz.insert_edge(edge, top_new, bottom_new).unwrap();
            }
            tz.check_adjacency().unwrap();
            interior_areas.push(tz.interior_trapezoids().len());
        }

        assert_all!(interior_areas.iter(), |&count: &usize| count > 0);
    }
}
