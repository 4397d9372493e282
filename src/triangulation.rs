//! The triangulation pipeline: trapezoidal decomposition of the plane,
//! selection of the interior trapezoids, monotone-mountain assembly, and ear
//! clipping.

use std::collections::HashSet;

use log::debug;
use rand::{Rng, seq::SliceRandom};
use thiserror::Error;

use crate::{
    Interrupter,
    area::{InvalidInput, PolygonalArea},
    dag::{InvariantViolation, Trapezoidation},
    mountain::build_mountains,
    triangle::Triangle,
};

#[derive(Error, Debug)]
pub enum TriangulationError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("interrupted")]
    Interrupted,
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// Triangulates a polygonal area given as raw polygons, using the thread RNG
/// for the insertion order. See [`triangulate_area`] for seeded runs.
pub fn triangulate(polygons: Vec<Vec<(f64, f64)>>) -> Result<Vec<Triangle>, TriangulationError> {
    let mut rng = rand::rng();
    let area = PolygonalArea::with_rng(polygons, &mut rng)?;
    triangulate_area(&area, &mut rng, None)
}

/// Triangulates a validated area.
///
/// The triangle list is deterministic given the RNG state; the partition
/// itself varies with the random edge order, so two seeds may produce
/// different (equally valid) triangulations of the same area.
pub fn triangulate_area<R: Rng + ?Sized>(
    area: &PolygonalArea,
    rng: &mut R,
    interrupter: Option<&Interrupter>,
) -> Result<Vec<Triangle>, TriangulationError> {
    let tz = trapezoidation(area, rng, interrupter)?;
    debug_assert!(tz.check_adjacency().is_ok());

    let inside = tz.interior_trapezoids();
    debug!("{} interior trapezoids", inside.len());

    let mountains = build_mountains(&tz, &inside);
    debug!("assembled {} monotone mountains", mountains.len());

    let mut triangles = Vec::new();
    for mut mountain in mountains {
        if interrupter.is_some_and(Interrupter::is_interrupted) {
            return Err(TriangulationError::Interrupted);
        }
        mountain.triangulate_into(&mut triangles);
    }
    debug!("emitted {} triangles", triangles.len());

    Ok(triangles)
}

/// Builds the trapezoidal decomposition by inserting every edge in a uniform
/// random order. Each edge first inserts whichever of its endpoints no
/// earlier edge has inserted, then splits the trapezoids it pierces.
fn trapezoidation<R: Rng + ?Sized>(
    area: &PolygonalArea,
    rng: &mut R,
    interrupter: Option<&Interrupter>,
) -> Result<Trapezoidation, TriangulationError> {
    let mut edges = area.edges();
    edges.shuffle(rng);
    debug!("inserting {} edges", edges.len());

    let mut tz = Trapezoidation::new();
    let mut inserted = HashSet::new();

    for edge in edges {
        if interrupter.is_some_and(Interrupter::is_interrupted) {
            return Err(TriangulationError::Interrupted);
        }

        let top_just_inserted = inserted.insert(edge.top.id());
        if top_just_inserted {
            tz.insert_vertex(edge.top)?;
        }
        let bottom_just_inserted = inserted.insert(edge.bottom.id());
        if bottom_just_inserted {
            tz.insert_vertex(edge.bottom)?;
        }

        tz.insert_edge(edge, top_just_inserted, bottom_just_inserted)?;
    }

    Ok(tz)
}
