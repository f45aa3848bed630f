//! Simulation tunables. Defaults reproduce the classic screensaver look.

use crate::error::SimError;
use crate::landed::Rgb;
use crate::pieces::PIECE_COLORS;
use std::ops::RangeInclusive;

/// Every knob the core reads. Construct with `SimConfig::default()` and override fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Device pixels per grid cell. Also scales the drop animation target.
    pub cell_size: u32,
    /// Fraction of a region's rows that must hold content before a clear starts.
    pub fill_threshold: f32,
    /// Maximum number of content rows collected per clear pass.
    pub rows_per_clear: usize,
    /// Ticks the selected band flashes before it is emptied.
    pub flash_ticks: u32,
    /// Drop animation: `offset += drop_base_speed + offset * drop_acceleration` per tick.
    pub drop_base_speed: f32,
    pub drop_acceleration: f32,
    /// Positional speed multiplier for streams whose region is not idle.
    pub clear_slowdown: f32,
    /// Rows above the region top where the landing scan may begin.
    pub spawn_scan_margin: i32,
    /// Rows past the region floor a stream's tail must clear before it is recycled.
    pub overscroll_margin: i32,

    pub fall_speed: RangeInclusive<f32>,
    pub hard_drop_speed: RangeInclusive<f32>,
    pub rotate_ticks: RangeInclusive<u32>,
    pub hard_drop_ticks: RangeInclusive<u32>,
    /// Rows above the region top where streams first appear (`[top - n, top]`).
    pub initial_spawn_height: i32,
    /// Respawn head row, as rows above the region top (`[top - hi, top - lo]`).
    pub respawn_height: RangeInclusive<i32>,
    pub min_tail: usize,
    /// One in `glyph_mutation_odds` ticks a random tail glyph changes.
    pub glyph_mutation_odds: u32,

    pub brightness_floor: u8,
    pub brightness_decay: u8,

    /// Each region gets `max(width, min_piece_streams)` piece streams.
    pub min_piece_streams: usize,
    /// Tail-only streams per piece stream.
    pub tail_stream_ratio: f32,

    /// Landing color per shape, catalog order I O T S Z J L.
    pub piece_colors: [Rgb; 7],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cell_size: 16,
            fill_threshold: 0.30,
            rows_per_clear: 4,
            flash_ticks: 20,
            drop_base_speed: 3.0,
            drop_acceleration: 0.05,
            clear_slowdown: 0.20,
            spawn_scan_margin: 3,
            overscroll_margin: 10,
            fall_speed: 0.08..=1.2,
            hard_drop_speed: 1.5..=5.0,
            rotate_ticks: 10..=50,
            hard_drop_ticks: 200..=800,
            initial_spawn_height: 20,
            respawn_height: 4..=20,
            min_tail: 6,
            glyph_mutation_odds: 5,
            brightness_floor: 80,
            brightness_decay: 3,
            min_piece_streams: 15,
            tail_stream_ratio: 0.5,
            piece_colors: PIECE_COLORS,
        }
    }
}

fn check_range<T: PartialOrd + Copy + Into<f64>>(
    what: &'static str,
    range: &RangeInclusive<T>,
) -> Result<(), SimError> {
    if range.start() > range.end() {
        return Err(SimError::Range {
            what,
            low: (*range.start()).into(),
            high: (*range.end()).into(),
        });
    }
    Ok(())
}

impl SimConfig {
    /// Reject values that would make the simulation meaningless or panic inside a tick.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.cell_size == 0 {
            return Err(SimError::InvalidCellSize(self.cell_size));
        }
        if !(self.fill_threshold > 0.0 && self.fill_threshold <= 1.0) {
            return Err(SimError::InvalidThreshold(self.fill_threshold));
        }
        if self.rows_per_clear == 0 {
            return Err(SimError::InvalidRowsPerClear);
        }
        if self.flash_ticks == 0 {
            return Err(SimError::InvalidFlashTicks);
        }
        check_range("fall speed", &self.fall_speed)?;
        check_range("hard-drop speed", &self.hard_drop_speed)?;
        check_range("rotate ticks", &self.rotate_ticks)?;
        check_range("hard-drop ticks", &self.hard_drop_ticks)?;
        check_range("respawn height", &self.respawn_height)?;
        if *self.rotate_ticks.start() == 0 || *self.hard_drop_ticks.start() == 0 {
            return Err(SimError::Range {
                what: "countdown ticks must start at 1",
                low: 0.0,
                high: 1.0,
            });
        }
        Ok(())
    }

    /// Drop animation target for a span of `rows` rows, in device pixels.
    pub fn drop_target(&self, rows: usize) -> f32 {
        (rows as u32 * self.cell_size) as f32
    }
}
