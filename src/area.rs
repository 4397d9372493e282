//! Input container for a polygonal area: outer boundaries and holes, each a
//! simple polygon. Holes are not declared as such; interior classification
//! falls out of the odd-crossing-depth rule during trapezoidation.

use itertools::Itertools;
use rand::Rng;
use thiserror::Error;

use crate::math::{
    Edge, Point,
    point::{PointId, random_color, segments_intersect},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidInput {
    #[error("polygon {polygon} has {count} vertices, need at least 3")]
    TooFewVertices { polygon: usize, count: usize },
    #[error("polygon {polygon} repeats the vertex ({x}, {y}) on adjacent corners")]
    CoincidentVertices { polygon: usize, x: f64, y: f64 },
    #[error("polygon {polygon} contains a non-finite coordinate")]
    NonFiniteCoordinate { polygon: usize },
    #[error("an edge of polygon {first} crosses an edge of polygon {second}")]
    IntersectingEdges { first: usize, second: usize },
}

/// One or more simple, pairwise non-intersecting polygons.
///
/// Construction assigns every vertex its [`PointId`] and color; all points
/// handed back in triangles are these instances.
#[derive(Debug, Clone)]
pub struct PolygonalArea {
    polygons: Vec<Vec<Point>>,
}

impl PolygonalArea {
    /// Builds an area with colors drawn from the thread RNG. Use
    /// [`with_rng`][Self::with_rng] for reproducible output.
    pub fn new(polygons: Vec<Vec<(f64, f64)>>) -> Result<Self, InvalidInput> {
        Self::with_rng(polygons, &mut rand::rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(
        polygons: Vec<Vec<(f64, f64)>>,
        rng: &mut R,
    ) -> Result<Self, InvalidInput> {
        let mut next_id = 0u32;
        let mut built = Vec::with_capacity(polygons.len());

        for (index, polygon) in polygons.into_iter().enumerate() {
            if polygon.len() < 3 {
                return Err(InvalidInput::TooFewVertices { polygon: index, count: polygon.len() });
            }
            if polygon.iter().any(|&(x, y)| !x.is_finite() || !y.is_finite()) {
                return Err(InvalidInput::NonFiniteCoordinate { polygon: index });
            }
            for (&(ax, ay), &(bx, by)) in polygon.iter().circular_tuple_windows::<(_, _)>() {
                if ax == bx && ay == by {
                    return Err(InvalidInput::CoincidentVertices { polygon: index, x: ax, y: ay });
                }
            }

            let points = polygon
                .into_iter()
                .map(|(x, y)| {
                    let point = Point::new(PointId(next_id), x, y, random_color(rng));
                    next_id += 1;
                    point
                })
                .collect();
            built.push(points);
        }

        Ok(PolygonalArea { polygons: built })
    }

    pub fn polygons(&self) -> &[Vec<Point>] {
        &self.polygons
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(Vec::len).sum()
    }

    /// Every polygon side, in input order. The triangulation shuffles these
    /// before insertion.
    pub fn edges(&self) -> Vec<Edge> {
        self.polygons
            .iter()
            .flat_map(|poly| {
                poly.iter().circular_tuple_windows::<(_, _)>().map(|(a, b)| Edge::new(*a, *b))
            })
            .collect()
    }

    /// Rejects areas whose edges properly cross, within or across polygons.
    ///
    /// The triangulation itself assumes validated input (behavior on
    /// self-intersecting areas is undefined); front-ends call this before
    /// handing strokes over.
    pub fn check_simple(&self) -> Result<(), InvalidInput> {
        let edges: Vec<(usize, Edge)> = self
            .polygons
            .iter()
            .enumerate()
            .flat_map(|(index, poly)| {
                poly.iter()
                    .circular_tuple_windows::<(_, _)>()
                    .map(move |(a, b)| (index, Edge::new(*a, *b)))
            })
            .collect();

        for (&(first, a), &(second, b)) in edges.iter().tuple_combinations() {
            let shares_endpoint = a.bottom == b.bottom
                || a.bottom == b.top
                || a.top == b.bottom
                || a.top == b.top;
            if shares_endpoint {
                continue;
            }
            if segments_intersect(a.bottom, a.top, b.bottom, b.top) {
                return Err(InvalidInput::IntersectingEdges { first, second });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assertables::{assert_all, assert_len_eq_x};
    use itertools::Itertools;

    use super::*;

    fn unit_square() -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
    }

    #[test]
    fn assigns_distinct_ids() {
        let area =
            PolygonalArea::new(vec![unit_square(), vec![(3.0, 3.0), (3.0, 7.0), (7.0, 7.0)]])
                .unwrap();

        assert_eq!(area.vertex_count(), 7);
        let ids = area.polygons().iter().flatten().map(|p| p.id()).collect::<Vec<_>>();
        assert_len_eq_x!(ids.iter().unique().collect::<Vec<_>>(), 7);
    }

    #[test]
    fn rejects_degenerate_polygon() {
        let err = PolygonalArea::new(vec![vec![(0.0, 0.0), (1.0, 1.0)]]).unwrap_err();
        assert_eq!(err, InvalidInput::TooFewVertices { polygon: 0, count: 2 });
    }

    #[test]
    fn rejects_coincident_adjacent_vertices() {
        let err =
            PolygonalArea::new(vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (0.0, 1.0)]])
                .unwrap_err();
        assert_eq!(err, InvalidInput::CoincidentVertices { polygon: 0, x: 1.0, y: 0.0 });
    }

    #[test]
    fn rejects_closing_duplicate() {
        // The wrap-around pair counts as adjacent too.
        let err = PolygonalArea::new(vec![vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]])
            .unwrap_err();
        assert_eq!(err, InvalidInput::CoincidentVertices { polygon: 0, x: 0.0, y: 0.0 });
    }

    #[test]
    fn rejects_nan() {
        let err = PolygonalArea::new(vec![vec![(0.0, 0.0), (f64::NAN, 0.0), (0.0, 1.0)]])
            .unwrap_err();
        assert_eq!(err, InvalidInput::NonFiniteCoordinate { polygon: 0 });
    }

    #[test]
    fn edges_close_each_polygon() {
        let area = PolygonalArea::new(vec![unit_square()]).unwrap();
        let edges = area.edges();

        assert_len_eq_x!(edges.clone(), 4);
        assert_all!(edges.iter(), |e: &Edge| e.top.is_above(e.bottom));
    }

    #[test]
    fn bowtie_fails_simplicity_check() {
        let area =
            PolygonalArea::new(vec![vec![(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]])
                .unwrap();
        assert_eq!(
            area.check_simple().unwrap_err(),
            InvalidInput::IntersectingEdges { first: 0, second: 0 }
        );
    }

    #[test]
    fn disjoint_polygons_pass_simplicity_check() {
        let area = PolygonalArea::new(vec![
            vec![(0.0, 0.0), (2.0, 0.0), (1.0, 2.0)],
            vec![(5.0, 5.0), (7.0, 5.0), (6.0, 7.0)],
        ])
        .unwrap();
        assert!(area.check_simple().is_ok());
    }
}
