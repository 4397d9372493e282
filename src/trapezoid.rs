use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::{
    dag::NodeKey,
    math::{Edge, Point},
};

new_key_type! {
    /// Key of a trapezoid in the per-call arena.
    pub struct TrapKey;
}

/// Up/down adjacency never exceeds two trapezoids; two-element lists are
/// ordered left to right.
pub type Neighbors = SmallVec<[TrapKey; 2]>;

/// A maximal horizontal slab of the decomposition.
///
/// Any bound may be absent: the initial trapezoid is the whole plane, and
/// slabs on the hull stay open on one or more sides. Adjacency is kept as
/// keys into the owning arena; the `node` back-reference names the DAG leaf
/// currently representing this trapezoid.
#[derive(Debug, Clone)]
pub struct Trapezoid {
    pub top_vertex: Option<Point>,
    pub bottom_vertex: Option<Point>,
    pub above: Neighbors,
    pub below: Neighbors,
    pub left_edge: Option<Edge>,
    right_edge: Option<Edge>,
    pub node: NodeKey,
}

impl Trapezoid {
    pub fn unbounded() -> Self {
        Trapezoid {
            top_vertex: None,
            bottom_vertex: None,
            above: Neighbors::new(),
            below: Neighbors::new(),
            left_edge: None,
            right_edge: None,
            node: NodeKey::default(),
        }
    }

    /// A copy sharing all four bounds, with fresh adjacency and no DAG leaf
    /// yet. The caller is responsible for registering the copy under its
    /// right edge.
    pub(crate) fn duplicate(&self) -> Self {
        Trapezoid {
            top_vertex: self.top_vertex,
            bottom_vertex: self.bottom_vertex,
            above: Neighbors::new(),
            below: Neighbors::new(),
            left_edge: self.left_edge,
            right_edge: self.right_edge,
            node: NodeKey::default(),
        }
    }

    pub fn right_edge(&self) -> Option<Edge> {
        self.right_edge
    }

    /// Raw write; right-edge registry maintenance happens in the owning
    /// context.
    pub(crate) fn set_right_edge_raw(&mut self, edge: Option<Edge>) {
        self.right_edge = edge;
    }

    pub fn vertex(&self, top: bool) -> Option<Point> {
        if top { self.top_vertex } else { self.bottom_vertex }
    }

    pub fn side(&self, right: bool) -> Option<Edge> {
        if right { self.right_edge } else { self.left_edge }
    }

    pub fn adjacent(&self, top: bool) -> &Neighbors {
        if top { &self.above } else { &self.below }
    }

    pub(crate) fn adjacent_mut(&mut self, top: bool) -> &mut Neighbors {
        if top { &mut self.above } else { &mut self.below }
    }

    /// One of the four corners: the chosen side edge evaluated at the height
    /// of the chosen vertex. `None` when that side or vertex is unbounded.
    pub fn extreme_point(&self, top: bool, right: bool) -> Option<(f64, f64)> {
        let vertex = self.vertex(top)?;
        let edge = self.side(right)?;
        Some((edge.x_at(vertex.y), vertex.y))
    }
}

pub(crate) fn replace_neighbor(list: &mut Neighbors, from: TrapKey, to: TrapKey) {
    for entry in list.iter_mut() {
        if *entry == from {
            *entry = to;
        }
    }
}
