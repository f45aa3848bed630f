//! Device rectangles → shared cell grid, partitioned into one region per display.

use crate::error::SimError;
use log::info;
use std::ops::Range;
use std::str::FromStr;

/// A display rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DeviceRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    #[inline]
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Smallest rectangle covering every input rectangle (the "virtual screen").
    pub fn bounding_box(rects: &[Self]) -> Option<Self> {
        let first = rects.first()?;
        let (mut left, mut top) = (i64::from(first.x), i64::from(first.y));
        let (mut right, mut bottom) = (first.right(), first.bottom());
        for r in &rects[1..] {
            left = left.min(i64::from(r.x));
            top = top.min(i64::from(r.y));
            right = right.max(r.right());
            bottom = bottom.max(r.bottom());
        }
        Some(Self {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }
}

/// Parses X11-style geometry: `WxH`, `WxH+X+Y`, `WxH-X+Y`.
impl FromStr for DeviceRect {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SimError::InvalidRect(s.to_string());
        let s_trim = s.trim();
        let (size, offsets) = match s_trim.find(['+', '-']) {
            Some(i) => (&s_trim[..i], &s_trim[i..]),
            None => (s_trim, ""),
        };
        let (w, h) = size.split_once(['x', 'X']).ok_or_else(bad)?;
        let width: u32 = w.trim().parse().map_err(|_| bad())?;
        let height: u32 = h.trim().parse().map_err(|_| bad())?;

        let (x, y) = if offsets.is_empty() {
            (0, 0)
        } else {
            // Second offset starts at the next sign after the first character.
            let split = offsets[1..].find(['+', '-']).ok_or_else(bad)? + 1;
            let parse = |part: &str| -> Result<i32, SimError> {
                let part = part.strip_prefix('+').unwrap_or(part);
                part.parse().map_err(|_| bad())
            };
            (parse(&offsets[..split])?, parse(&offsets[split..])?)
        };
        Ok(Self::new(x, y, width, height))
    }
}

/// The drawable surface: virtual origin plus size, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            width,
            height,
        }
    }

    pub const fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin_x = x;
        self.origin_y = y;
        self
    }
}

/// A display's rectangle in grid cells: `[left, right) x [top, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl Region {
    pub const fn new(left: usize, top: usize, right: usize, bottom: usize) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.right - self.left
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.bottom - self.top
    }

    #[inline]
    pub fn cols(&self) -> Range<usize> {
        self.left..self.right
    }

    #[inline]
    pub fn rows(&self) -> Range<usize> {
        self.top..self.bottom
    }

    #[inline]
    pub fn contains_col(&self, col: i32) -> bool {
        col >= self.left as i32 && col < self.right as i32
    }

    #[inline]
    pub fn contains(&self, row: i32, col: i32) -> bool {
        self.contains_col(col) && row >= self.top as i32 && row < self.bottom as i32
    }

    /// True if the two regions share at least one cell.
    #[inline]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

/// Grid size plus the region list derived from the displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridGeometry {
    pub cols: usize,
    pub rows: usize,
    pub regions: Vec<Region>,
}

impl GridGeometry {
    /// A grid with a single region covering everything.
    pub fn single(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            regions: vec![Region::new(0, 0, cols, rows)],
        }
    }
}

#[inline]
fn floor_div(a: i64, b: i64) -> i64 {
    a.div_euclid(b)
}

#[inline]
fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1).div_euclid(b)
}

/// Map display rectangles onto the surface's cell grid.
///
/// Left/top edges floor, right/bottom edges ceil, then everything is clamped to the grid.
/// An empty `rects` slice yields one region spanning the whole grid.
///
/// Displays that touch without overlapping can still share the cell their common edge
/// falls in. That cell goes to the earlier display and the later region is trimmed.
/// Displays that really overlap are kept as they are and rejected by the simulation.
pub fn compute_regions(
    surface: &Surface,
    rects: &[DeviceRect],
    cell_size: u32,
) -> Result<GridGeometry, SimError> {
    if cell_size == 0 {
        return Err(SimError::InvalidCellSize(cell_size));
    }
    let cols = (surface.width / cell_size) as usize;
    let rows = (surface.height / cell_size) as usize;
    if cols == 0 || rows == 0 {
        return Err(SimError::EmptySurface { cell_size });
    }
    if rects.is_empty() {
        info!("no display rectangles; one region over {cols}x{rows} grid");
        return Ok(GridGeometry::single(cols, rows));
    }

    let cell = i64::from(cell_size);
    let (ox, oy) = (i64::from(surface.origin_x), i64::from(surface.origin_y));
    let (max_c, max_r) = (cols as i64, rows as i64);

    let mut regions: Vec<Region> = Vec::with_capacity(rects.len());
    for (index, rect) in rects.iter().enumerate() {
        let mut left = floor_div(i64::from(rect.x) - ox, cell).clamp(0, max_c);
        let mut top = floor_div(i64::from(rect.y) - oy, cell).clamp(0, max_r);
        let mut right = ceil_div(rect.right() - ox, cell).clamp(0, max_c);
        let mut bottom = ceil_div(rect.bottom() - oy, cell).clamp(0, max_r);

        for (prev_rect, prev) in rects.iter().zip(&regions) {
            let here = Region::new(left as usize, top as usize, right as usize, bottom as usize);
            if !prev.overlaps(&here) {
                continue;
            }
            let (p_left, p_top) = (prev.left as i64, prev.top as i64);
            let (p_right, p_bottom) = (prev.right as i64, prev.bottom as i64);
            if i64::from(rect.x) >= prev_rect.right() {
                left = left.max(p_right);
            } else if rect.right() <= i64::from(prev_rect.x) {
                right = right.min(p_left);
            } else if i64::from(rect.y) >= prev_rect.bottom() {
                top = top.max(p_bottom);
            } else if rect.bottom() <= i64::from(prev_rect.y) {
                bottom = bottom.min(p_top);
            }
        }

        if right <= left || bottom <= top {
            return Err(SimError::EmptyRegion {
                index,
                cols: right - left,
                rows: bottom - top,
            });
        }
        regions.push(Region::new(
            left as usize,
            top as usize,
            right as usize,
            bottom as usize,
        ));
    }
    info!(
        "grid {cols}x{rows} at {cell_size}px, {} region(s): {regions:?}",
        regions.len()
    );
    Ok(GridGeometry {
        cols,
        rows,
        regions,
    })
}
