use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::anyhow;
use futures::TryFutureExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub mod area;
pub mod dag;
pub mod math;
pub mod mountain;
pub mod trapezoid;
pub mod triangle;
pub mod triangulation;

pub use crate::{
    area::{InvalidInput, PolygonalArea},
    math::{Color, Edge, Point, PointId},
    triangle::Triangle,
    triangulation::{TriangulationError, triangulate, triangulate_area},
};

/// Cooperative cancellation handle for a running triangulation.
///
/// Cloneable and thread-safe; the pipeline polls it between edge insertions
/// and between mountains and aborts with
/// [`TriangulationError::Interrupted`], producing no partial output.
#[derive(Debug, Clone, Default)]
pub struct Interrupter {
    flag: Arc<AtomicBool>,
}

impl Interrupter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Runs a triangulation on the blocking thread pool, handing back a future
/// for the result and an [`Interrupter`] wired into the run.
pub fn run_triangulation<R>(area: PolygonalArea, mut rng: R) -> (TriangulationFuture, Interrupter)
where
    R: Rng + Send + 'static,
{
    let interrupter = Interrupter::new();
    let task_interrupter = interrupter.clone();

    let handle = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Triangle>> {
        Ok(triangulate_area(&area, &mut rng, Some(&task_interrupter))?)
    });

    (TriangulationFuture { handle }, interrupter)
}

pub struct TriangulationFuture {
    handle: tokio::task::JoinHandle<anyhow::Result<Vec<Triangle>>>,
}

impl TriangulationFuture {
    pub fn handle(&self) -> &tokio::task::JoinHandle<anyhow::Result<Vec<Triangle>>> {
        &self.handle
    }

    pub fn future(self) -> impl Future<Output = anyhow::Result<Vec<Triangle>>> {
        self.handle.unwrap_or_else(|join_err| Err(anyhow!(join_err)))
    }
}

/// A triangulation scene as stored on disk: the input polygons, plus an
/// optional seed so a run can be reproduced exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub seed: Option<u64>,
    pub polygons: Vec<Vec<(f64, f64)>>,
}

impl Scene {
    pub fn into_area_with_rng<R: Rng + ?Sized>(
        self,
        rng: &mut R,
    ) -> Result<PolygonalArea, InvalidInput> {
        PolygonalArea::with_rng(self.polygons, rng)
    }
}
