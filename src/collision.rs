//! Piece-vs-grid fit tests, row-stepped landing scan, and landing commits.
//!
//! A piece is anchored by `(row, col)`: mask cell `(r, c)` sits at `(row + r, col + c - 1)`,
//! so mask column 1 lines up with the stream's column.

use crate::geometry::Region;
use crate::landed::{LandedGrid, Rgb};
use crate::pieces::PieceKind;

#[inline]
fn absolute(anchor_row: i32, anchor_col: i32, (r, c): (i32, i32)) -> (i32, i32) {
    (anchor_row + r, anchor_col + c - 1)
}

/// True if the piece fits at the anchor inside `region`.
///
/// Cells above the region top or outside its columns are ignored; cells at or below the
/// region floor, or on a filled landed cell, fail.
pub fn can_fit(
    landed: &LandedGrid,
    kind: PieceKind,
    rotation: u8,
    anchor_row: i32,
    anchor_col: i32,
    region: &Region,
) -> bool {
    kind.cells(rotation).all(|cell| {
        let (row, col) = absolute(anchor_row, anchor_col, cell);
        if row < region.top as i32 || !region.contains_col(col) {
            return true;
        }
        if row >= region.bottom as i32 {
            return false;
        }
        !landed.is_filled(row as usize, col as usize)
    })
}

/// True if at least one piece cell lies inside the full grid.
pub fn touches_grid(
    landed: &LandedGrid,
    kind: PieceKind,
    rotation: u8,
    anchor_row: i32,
    anchor_col: i32,
) -> bool {
    kind.cells(rotation).any(|cell| {
        let (row, col) = absolute(anchor_row, anchor_col, cell);
        landed.in_bounds(row, col)
    })
}

/// Write the piece into the grid at full brightness. Off-grid cells are skipped.
/// Returns the number of cells written.
pub fn land(
    landed: &mut LandedGrid,
    kind: PieceKind,
    rotation: u8,
    anchor_row: i32,
    anchor_col: i32,
    color: Rgb,
) -> usize {
    let mut written = 0;
    for cell in kind.cells(rotation) {
        let (row, col) = absolute(anchor_row, anchor_col, cell);
        if landed.in_bounds(row, col) {
            landed.set(row as usize, col as usize, color);
            written += 1;
        }
    }
    written
}

/// Step through every row in `from..=to` and return the row just above the first one
/// where the piece stops fitting, or `None` if it fits all the way.
///
/// Checking each intermediate row keeps fast pieces from tunnelling through the stack.
pub fn scan_landing(
    landed: &LandedGrid,
    kind: PieceKind,
    rotation: u8,
    anchor_col: i32,
    from: i32,
    to: i32,
    region: &Region,
) -> Option<i32> {
    (from..=to)
        .find(|&row| !can_fit(landed, kind, rotation, row, anchor_col, region))
        .map(|blocked| blocked - 1)
}
