//! Matrix-rain screensaver core where the falling streams carry tetrominoes.
//!
//! Pieces land on a shared grid split into one region per display. When a region fills
//! past a threshold, its bottom band flashes, empties, and the stack above slides down.
//! Everything here is a deterministic, single-threaded simulation; rendering lives in the
//! `matrixtris` binary and reads [`Snapshot`]s between ticks.
//!
//! ```
//! use matrixtris::{SimConfig, Simulation, Surface};
//!
//! let mut sim = Simulation::seeded(SimConfig::default(), &Surface::new(640, 480), &[], 7)?;
//! for _ in 0..100 {
//!     sim.tick();
//! }
//! assert_eq!(sim.snapshot().tick, 100);
//! # Ok::<(), matrixtris::SimError>(())
//! ```

pub mod clear;
pub mod collision;
pub mod config;
pub mod error;
pub mod geometry;
pub mod landed;
pub mod pieces;
pub mod sim;
pub mod stream;

pub use clear::{ClearPhase, RegionClear, RowSpan};
pub use config::SimConfig;
pub use error::SimError;
pub use geometry::{DeviceRect, GridGeometry, Region, Surface, compute_regions};
pub use landed::{LandedCell, LandedGrid, Rgb};
pub use pieces::{PIECE_COLORS, PieceKind};
pub use sim::{Simulation, Snapshot, TickSummary};
pub use stream::{Advance, Stream, TailShade};
