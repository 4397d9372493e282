//! Monotone mountains: assembly from the interior trapezoids, and their
//! linear-time triangulation by convex-ear clipping.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::{
    dag::Trapezoidation,
    math::{Edge, Point, point::counter_clockwise},
    trapezoid::TrapKey,
    triangle::Triangle,
};

/// Per base edge, the "next vertex above" relation accumulated over every
/// interior trapezoid leaning on that base. Insertion order of the bases is
/// the mountain discovery order, which fixes the output order.
type AboveByBase = IndexMap<Edge, HashMap<Point, Point>>;

fn group_vertices_by_mountain(tz: &Trapezoidation, inside: &[TrapKey]) -> AboveByBase {
    let mut above_by_base = AboveByBase::new();

    for &key in inside {
        let trap = tz.trap(key);
        let (Some(bottom), Some(top)) = (trap.bottom_vertex, trap.top_vertex) else {
            debug_assert!(false, "interior trapezoid is missing a vertex bound");
            continue;
        };

        for side in [trap.left_edge, trap.right_edge()] {
            let Some(edge) = side else {
                debug_assert!(false, "interior trapezoid is missing a side edge");
                continue;
            };
            // A side edge fully spanned by this one trapezoid separates two
            // mountains instead of basing one.
            if bottom != edge.bottom || top != edge.top {
                above_by_base.entry(edge).or_default().insert(bottom, top);
            }
        }
    }

    above_by_base
}

/// Assembles one mountain per recorded base, in discovery order.
pub fn build_mountains(tz: &Trapezoidation, inside: &[TrapKey]) -> Vec<MonotoneMountain> {
    group_vertices_by_mountain(tz, inside)
        .into_iter()
        .map(|(base, above)| MonotoneMountain::from_mapping(base, &above))
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct MountainVertex {
    point: Point,
    below: Option<usize>,
    above: Option<usize>,
}

/// A base edge plus the bottom-anchored chain of vertices leaning on it.
///
/// The chain is stored as an index-linked vec so clipping can splice a vertex
/// out without shifting its neighbors. Base vertices are the chain ends, the
/// ones missing a link on one side.
#[derive(Debug, Clone)]
pub struct MonotoneMountain {
    base: Edge,
    chain: Vec<MountainVertex>,
}

impl MonotoneMountain {
    fn from_mapping(base: Edge, above: &HashMap<Point, Point>) -> Self {
        let mut chain: Vec<MountainVertex> = Vec::new();
        let mut current = Some(base.bottom);

        while let Some(point) = current {
            let index = chain.len();
            chain.push(MountainVertex { point, below: index.checked_sub(1), above: None });
            if index > 0 {
                chain[index - 1].above = Some(index);
            }
            current = above.get(&point).copied();
        }

        MonotoneMountain { base, chain }
    }

    pub fn base(&self) -> Edge {
        self.base
    }

    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        self.chain.iter().map(|v| v.point)
    }

    /// Base endpoints plus at most one apex cannot produce an ear.
    pub fn is_degenerate(&self) -> bool {
        self.chain.len() < 3
    }

    /// Clips convex ears off the chain until only the base is left,
    /// appending one triangle per ear.
    ///
    /// `convex_order` fixes which side of the base the mountain sits on; ears
    /// are emitted with the matching vertex order so the whole output winds
    /// counter-clockwise. After clipping an ear the sweep steps back one
    /// vertex, catching any ear the splice just created.
    pub fn triangulate_into(&mut self, triangles: &mut Vec<Triangle>) {
        if self.is_degenerate() {
            return;
        }

        let first_non_base = 1usize;
        let convex_order =
            counter_clockwise(self.base.top, self.base.bottom, self.chain[first_non_base].point);

        let mut current = first_non_base;
        loop {
            let (Some(below), Some(above)) = (self.chain[current].below, self.chain[current].above)
            else {
                break;
            };

            let b = self.chain[below].point;
            let v = self.chain[current].point;
            let a = self.chain[above].point;

            if counter_clockwise(b, v, a) != convex_order {
                current = above;
                continue;
            }

            let vertices = if convex_order { [b, v, a] } else { [b, a, v] };
            triangles.push(Triangle::new(vertices));

            self.chain[below].above = Some(above);
            self.chain[above].below = Some(below);

            let below_is_base =
                self.chain[below].below.is_none() || self.chain[below].above.is_none();
            current = if below_is_base { above } else { below };
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::{assert_all, assert_len_eq_x};

    use super::*;
    use crate::math::point::test_point;

    fn mountain(base: (Point, Point), links: &[(Point, Point)]) -> MonotoneMountain {
        let above: HashMap<Point, Point> = links.iter().copied().collect();
        MonotoneMountain::from_mapping(Edge::new(base.0, base.1), &above)
    }

    #[test]
    fn chain_follows_the_mapping_upward() {
        let bottom = test_point(0, 0.0, 0.0);
        let mid = test_point(1, 2.0, 1.0);
        let top = test_point(2, 0.0, 4.0);

        let m = mountain((bottom, top), &[(bottom, mid), (mid, top)]);
        assert_eq!(m.vertices().collect::<Vec<_>>(), vec![bottom, mid, top]);
        assert!(!m.is_degenerate());
    }

    #[test]
    fn base_only_mountain_is_degenerate() {
        let bottom = test_point(0, 0.0, 0.0);
        let top = test_point(1, 0.0, 4.0);

        let mut m = mountain((bottom, top), &[(bottom, top)]);
        assert!(m.is_degenerate());

        let mut triangles = Vec::new();
        m.triangulate_into(&mut triangles);
        assert!(triangles.is_empty());
    }

    #[test]
    fn convex_chain_clips_into_a_fan() {
        let bottom = test_point(0, 0.0, 0.0);
        let low = test_point(1, 2.0, 1.0);
        let high = test_point(2, 2.0, 3.0);
        let top = test_point(3, 0.0, 4.0);

        let mut m = mountain((bottom, top), &[(bottom, low), (low, high), (high, top)]);
        let mut triangles = Vec::new();
        m.triangulate_into(&mut triangles);

        assert_len_eq_x!(triangles.clone(), 2);
        assert_all!(triangles.iter(), |t: &Triangle| t.signed_area() > 0.0);
        assert_eq!(triangles[0].vertices(), [bottom, low, high]);
        assert_eq!(triangles[1].vertices(), [bottom, high, top]);
    }

    #[test]
    fn reflex_vertex_waits_for_the_back_step() {
        let bottom = test_point(0, 0.0, 0.0);
        let reflex = test_point(1, 1.0, 2.0);
        let outer = test_point(2, 3.0, 3.0);
        let top = test_point(3, 0.0, 6.0);

        let mut m = mountain((bottom, top), &[(bottom, reflex), (reflex, outer), (outer, top)]);
        let mut triangles = Vec::new();
        m.triangulate_into(&mut triangles);

        // The reflex vertex is skipped first, then becomes an ear once its
        // convex neighbor above is clipped.
        assert_len_eq_x!(triangles.clone(), 2);
        assert_eq!(triangles[0].vertices(), [reflex, outer, top]);
        assert_eq!(triangles[1].vertices(), [bottom, reflex, top]);
        assert_all!(triangles.iter(), |t: &Triangle| t.signed_area() > 0.0);
    }

    #[test]
    fn mirrored_mountain_still_winds_counter_clockwise() {
        // Chain on the left side of the base flips convex_order.
        let bottom = test_point(0, 0.0, 0.0);
        let mid = test_point(1, -2.0, 2.0);
        let top = test_point(2, 0.0, 4.0);

        let mut m = mountain((bottom, top), &[(bottom, mid), (mid, top)]);
        let mut triangles = Vec::new();
        m.triangulate_into(&mut triangles);

        assert_len_eq_x!(triangles.clone(), 1);
        assert_eq!(triangles[0].vertices(), [bottom, top, mid]);
        assert!(triangles[0].signed_area() > 0.0);
    }
}
