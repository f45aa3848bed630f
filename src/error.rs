//! Errors raised while building a simulation from host-supplied input.

use thiserror::Error;

/// Invalid configuration or geometry handed to the core.
///
/// Everything here is detected before the first tick. Once a
/// [`Simulation`](crate::Simulation) exists, ticking cannot fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("cell size must be at least one pixel, got {0}")]
    InvalidCellSize(u32),
    #[error("fill threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f32),
    #[error("rows to clear per pass must be at least 1")]
    InvalidRowsPerClear,
    #[error("flash duration must be at least one tick")]
    InvalidFlashTicks,
    #[error("{what}: low bound {low} is above high bound {high}")]
    Range {
        what: &'static str,
        low: f64,
        high: f64,
    },
    #[error("surface is smaller than one {cell_size}px cell")]
    EmptySurface { cell_size: u32 },
    #[error("display {index} maps to an empty grid rectangle ({cols}x{rows} cells)")]
    EmptyRegion { index: usize, cols: i64, rows: i64 },
    #[error("region {index} extends past the {cols}x{rows} grid")]
    RegionOutOfGrid {
        index: usize,
        cols: usize,
        rows: usize,
    },
    #[error("regions {a} and {b} overlap; each grid cell belongs to at most one display")]
    OverlappingRegions { a: usize, b: usize },
    #[error("no regions to simulate")]
    NoRegions,
    #[error("invalid display geometry {0:?} (expected WxH+X+Y)")]
    InvalidRect(String),
}
