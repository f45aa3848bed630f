//! The landed-block grid: accumulated structure shared by every region.

use crate::geometry::Region;

/// 8-bit RGB colour. The core never depends on a rendering crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Scale each channel by `brightness / 255`.
    pub fn dim(self, brightness: u8) -> Self {
        let scale = |c: u8| (u16::from(c) * u16::from(brightness) / 255) as u8;
        Self(scale(self.0), scale(self.1), scale(self.2))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LandedCell {
    pub filled: bool,
    pub color: Rgb,
    /// Settle glow, 255 on landing and fading toward the floor. Presentation only.
    pub brightness: u8,
}

impl LandedCell {
    pub const EMPTY: Self = Self {
        filled: false,
        color: Rgb(0, 0, 0),
        brightness: 0,
    };
}

/// Dense `rows x cols` map of landed cells, row-major. Row 0 is the top.
///
/// Accessors panic on out-of-range coordinates; callers own bounds checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandedGrid {
    rows: usize,
    cols: usize,
    cells: Vec<LandedCell>,
}

impl LandedGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![LandedCell::EMPTY; rows * cols],
        }
    }

    #[inline]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "landed grid access ({row}, {col}) outside {}x{}",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    /// True if `(row, col)` is inside the grid. Signed so callers can test raw piece cells.
    #[inline]
    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> LandedCell {
        self.cells[self.index(row, col)]
    }

    #[inline]
    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        self.get(row, col).filled
    }

    /// Fill a cell at full brightness.
    pub fn set(&mut self, row: usize, col: usize, color: Rgb) {
        let i = self.index(row, col);
        self.cells[i] = LandedCell {
            filled: true,
            color,
            brightness: 255,
        };
    }

    pub fn clear(&mut self, row: usize, col: usize) {
        let i = self.index(row, col);
        self.cells[i] = LandedCell::EMPTY;
    }

    /// One tick of settle-glow fade: brightness above `floor` drops by `step`, never below `floor`.
    pub fn decay_brightness(&mut self, floor: u8, step: u8) {
        for cell in &mut self.cells {
            if cell.brightness > floor {
                cell.brightness = cell.brightness.saturating_sub(step).max(floor);
            }
        }
    }

    /// Any filled cell in `row` within the region's columns.
    pub fn row_has_content(&self, region: &Region, row: usize) -> bool {
        let start = self.index(row, region.left);
        let end = self.index(row, region.right - 1) + 1;
        self.cells[start..end].iter().any(|c| c.filled)
    }

    /// Fraction of the region's rows holding at least one filled cell, in `[0, 1]`.
    pub fn fill_fraction(&self, region: &Region) -> f32 {
        let height = region.height();
        if height == 0 {
            return 0.0;
        }
        let filled = region
            .rows()
            .filter(|&r| self.row_has_content(region, r))
            .count();
        filled as f32 / height as f32
    }

    /// Copy `src` onto `dst` across the region's columns, glow included.
    pub fn copy_row(&mut self, region: &Region, src: usize, dst: usize) {
        let from = self.index(src, region.left);
        let to = self.index(dst, region.left);
        self.cells.copy_within(from..from + region.width(), to);
    }

    /// Empty `row` across the region's columns.
    pub fn clear_row(&mut self, region: &Region, row: usize) {
        let start = self.index(row, region.left);
        self.cells[start..start + region.width()].fill(LandedCell::EMPTY);
    }

    /// Row-major view of every cell, for renderers.
    pub fn cells(&self) -> &[LandedCell] {
        &self.cells
    }
}
