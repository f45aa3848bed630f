//! Per-region row clearing: idle → flash → drop → idle.

use crate::config::SimConfig;
use crate::geometry::Region;
use crate::landed::LandedGrid;
use log::debug;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum ClearPhase {
    #[default]
    Idle,
    Flash,
    Drop,
}

impl ClearPhase {
    /// Stream movement multiplier while the region is in this phase.
    #[inline]
    pub fn speed_multiplier(self, slowdown: f32) -> f32 {
        match self {
            Self::Idle => 1.0,
            Self::Flash | Self::Drop => slowdown,
        }
    }
}

/// Contiguous band of grid rows, `top..=bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowSpan {
    pub top: usize,
    pub bottom: usize,
}

impl RowSpan {
    #[inline]
    pub const fn len(&self) -> usize {
        self.bottom - self.top + 1
    }

    #[inline]
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.top..=self.bottom
    }

    #[inline]
    pub const fn contains(&self, row: usize) -> bool {
        row >= self.top && row <= self.bottom
    }
}

/// Phase change reported by [`RegionClear::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearEvent {
    /// Idle → Flash.
    Started(RowSpan),
    /// Flash → Drop; the band is now empty.
    Emptied(RowSpan),
    /// Drop → Idle; the stack above has been shifted down.
    Settled(RowSpan),
}

/// Walk up from the region floor collecting up to `max_rows` rows with content and return
/// the band from the highest to the lowest of them. Empty rows in between are included.
pub fn select_span(landed: &LandedGrid, region: &Region, max_rows: usize) -> Option<RowSpan> {
    let mut found = region
        .rows()
        .rev()
        .filter(|&r| landed.row_has_content(region, r))
        .take(max_rows);
    let bottom = found.next()?;
    let top = found.last().unwrap_or(bottom);
    Some(RowSpan { top, bottom })
}

/// Shift the region's stack down by `rows`, keeping its shape.
///
/// Everything from the topmost content row down to the floor moves as one block; the
/// `rows` rows it leaves behind at the top are emptied.
pub fn apply_gravity(landed: &mut LandedGrid, region: &Region, rows: usize) {
    if rows == 0 {
        return;
    }
    let Some(top_content) = region.rows().find(|&r| landed.row_has_content(region, r)) else {
        return;
    };
    for dst in (top_content + rows..region.bottom).rev() {
        landed.copy_row(region, dst - rows, dst);
    }
    for row in top_content..(top_content + rows).min(region.bottom) {
        landed.clear_row(region, row);
    }
}

/// Clear-animation state for one region.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionClear {
    phase: ClearPhase,
    flash_countdown: u32,
    span: Option<RowSpan>,
    /// Pixels the stack above the band has slid so far.
    drop_offset: f32,
    drop_target: f32,
}

impl RegionClear {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub const fn phase(&self) -> ClearPhase {
        self.phase
    }

    #[inline]
    pub const fn flash_countdown(&self) -> u32 {
        self.flash_countdown
    }

    /// Band being cleared; `None` while idle.
    #[inline]
    pub const fn span(&self) -> Option<RowSpan> {
        self.span
    }

    #[inline]
    pub const fn drop_offset(&self) -> f32 {
        self.drop_offset
    }

    #[inline]
    pub const fn drop_target(&self) -> f32 {
        self.drop_target
    }

    /// Highlight strength for the flashing band, ramping down with the countdown.
    pub fn flash_alpha(&self) -> u8 {
        (self.flash_countdown.saturating_mul(12)).min(255) as u8
    }

    /// Advance one tick. Must run before the region's streams move this tick.
    pub fn advance(
        &mut self,
        region: &Region,
        landed: &mut LandedGrid,
        cfg: &SimConfig,
    ) -> Option<ClearEvent> {
        match self.phase {
            ClearPhase::Idle => {
                if landed.fill_fraction(region) < cfg.fill_threshold {
                    return None;
                }
                let span = select_span(landed, region, cfg.rows_per_clear)?;
                self.span = Some(span);
                self.flash_countdown = cfg.flash_ticks;
                self.drop_offset = 0.0;
                self.drop_target = cfg.drop_target(span.len());
                self.phase = ClearPhase::Flash;
                debug!(
                    "region {region:?}: flashing rows {}..={}",
                    span.top, span.bottom
                );
                Some(ClearEvent::Started(span))
            }
            ClearPhase::Flash => {
                self.flash_countdown = self.flash_countdown.saturating_sub(1);
                if self.flash_countdown > 0 {
                    return None;
                }
                let span = self.span?;
                for row in span.rows() {
                    landed.clear_row(region, row);
                }
                self.drop_offset = 0.0;
                self.phase = ClearPhase::Drop;
                debug!("region {region:?}: emptied {} row(s)", span.len());
                Some(ClearEvent::Emptied(span))
            }
            ClearPhase::Drop => {
                let span = self.span?;
                if self.drop_offset < self.drop_target {
                    self.drop_offset +=
                        cfg.drop_base_speed + self.drop_offset * cfg.drop_acceleration;
                    if self.drop_offset < self.drop_target {
                        return None;
                    }
                    self.drop_offset = self.drop_target;
                    apply_gravity(landed, region, span.len());
                }
                self.phase = ClearPhase::Idle;
                self.span = None;
                debug!("region {region:?}: settled");
                Some(ClearEvent::Settled(span))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landed::Rgb;

    const C: Rgb = Rgb(0, 200, 80);

    fn region() -> Region {
        Region::new(0, 0, 10, 10)
    }

    fn fill_rows(g: &mut LandedGrid, region: &Region, rows: RangeInclusive<usize>) {
        for r in rows {
            for c in region.cols() {
                g.set(r, c, C);
            }
        }
    }

    #[test]
    fn test_below_threshold_stays_idle() {
        let mut g = LandedGrid::new(10, 10);
        fill_rows(&mut g, &region(), 8..=9);
        let mut rc = RegionClear::new();
        assert_eq!(rc.advance(&region(), &mut g, &SimConfig::default()), None);
        assert_eq!(rc.phase(), ClearPhase::Idle);
    }

    #[test]
    fn test_span_covers_gaps() {
        let mut g = LandedGrid::new(10, 10);
        g.set(9, 0, C);
        g.set(7, 3, C);
        g.set(4, 1, C);
        g.set(2, 8, C);
        g.set(1, 8, C);
        // Collects 9, 7, 4, 2 (four content rows) and spans 2..=9 including the gaps.
        assert_eq!(
            select_span(&g, &region(), 4),
            Some(RowSpan { top: 2, bottom: 9 })
        );
    }

    #[test]
    fn test_select_span_empty_region() {
        let g = LandedGrid::new(10, 10);
        assert_eq!(select_span(&g, &region(), 4), None);
    }

    #[test]
    fn test_full_cycle_visits_each_phase_once() {
        let cfg = SimConfig::default();
        let mut g = LandedGrid::new(10, 10);
        fill_rows(&mut g, &region(), 6..=9);
        let mut rc = RegionClear::new();

        let mut phases = vec![rc.phase()];
        let mut last_offset = 0.0f32;
        let mut reached_target = 0;
        for _ in 0..200 {
            rc.advance(&region(), &mut g, &cfg);
            if rc.phase() == ClearPhase::Drop {
                assert!(rc.drop_offset() >= last_offset);
                last_offset = rc.drop_offset();
            }
            if *phases.last().unwrap() != rc.phase() {
                if rc.phase() == ClearPhase::Idle {
                    reached_target += 1;
                }
                phases.push(rc.phase());
            }
            if phases.len() == 4 {
                break;
            }
        }
        assert_eq!(
            phases,
            vec![
                ClearPhase::Idle,
                ClearPhase::Flash,
                ClearPhase::Drop,
                ClearPhase::Idle
            ]
        );
        assert_eq!(reached_target, 1);
        assert_eq!(rc.drop_offset(), rc.drop_target());
        // Everything was in the band, so the region ends empty.
        assert_eq!(g.fill_fraction(&region()), 0.0);
    }

    #[test]
    fn test_flash_alpha_ramp() {
        let cfg = SimConfig::default();
        let mut g = LandedGrid::new(10, 10);
        fill_rows(&mut g, &region(), 6..=9);
        let mut rc = RegionClear::new();
        rc.advance(&region(), &mut g, &cfg);
        assert_eq!(rc.flash_countdown(), 20);
        assert_eq!(rc.flash_alpha(), 240);
        rc.advance(&region(), &mut g, &cfg);
        assert_eq!(rc.flash_alpha(), 228);
    }

    #[test]
    fn test_drop_settles_single_cell_four_rows_lower() {
        let cfg = SimConfig::default();
        let mut g = LandedGrid::new(10, 10);
        g.set(2, 5, C);
        let mut rc = RegionClear {
            phase: ClearPhase::Drop,
            flash_countdown: 0,
            span: Some(RowSpan { top: 6, bottom: 9 }),
            drop_offset: 0.0,
            drop_target: cfg.drop_target(4),
        };
        let mut ticks = 0;
        while rc.phase() == ClearPhase::Drop {
            rc.advance(&region(), &mut g, &cfg);
            ticks += 1;
            assert!(ticks < 100);
        }
        assert!(g.is_filled(6, 5));
        for row in 2..=5 {
            assert!(!g.row_has_content(&region(), row), "row {row} not empty");
        }
    }

    #[test]
    fn test_gravity_zero_rows_is_noop() {
        let mut g = LandedGrid::new(10, 10);
        g.set(3, 3, C);
        g.set(9, 0, C);
        let before = g.clone();
        apply_gravity(&mut g, &region(), 0);
        assert_eq!(g, before);
    }

    #[test]
    fn test_gravity_preserves_structure() {
        let mut g = LandedGrid::new(10, 10);
        g.set(3, 1, C);
        g.set(4, 2, C);
        g.set(4, 3, C);
        g.decay_brightness(80, 3);
        g.set(5, 7, C);
        let before = g.clone();
        let n = 3;
        apply_gravity(&mut g, &region(), n);
        let top_content = 3;
        for r in top_content + n..10 {
            for c in 0..10 {
                assert_eq!(g.get(r, c), before.get(r - n, c), "cell ({r}, {c})");
            }
        }
        for r in top_content..top_content + n {
            assert!(!g.row_has_content(&region(), r));
        }
    }

    #[test]
    fn test_gravity_is_region_scoped() {
        let mut g = LandedGrid::new(10, 20);
        let left = Region::new(0, 0, 10, 10);
        g.set(2, 4, C);
        g.set(2, 14, C);
        apply_gravity(&mut g, &left, 4);
        assert!(g.is_filled(6, 4));
        assert!(g.is_filled(2, 14));
        assert!(!g.is_filled(6, 14));
    }

    #[test]
    fn test_clear_stays_in_region_columns() {
        let cfg = SimConfig::default();
        let mut g = LandedGrid::new(10, 20);
        let left = Region::new(0, 0, 10, 10);
        let right = Region::new(10, 0, 20, 10);
        fill_rows(&mut g, &left, 6..=9);
        g.set(9, 15, C);
        let mut rc = RegionClear::new();
        for _ in 0..=cfg.flash_ticks {
            rc.advance(&left, &mut g, &cfg);
        }
        assert_eq!(rc.phase(), ClearPhase::Drop);
        assert!(g.is_filled(9, 15));
        assert!(g.row_has_content(&right, 9));
        assert!(!g.row_has_content(&left, 9));
    }

    #[test]
    fn test_speed_multiplier() {
        assert_eq!(ClearPhase::Idle.speed_multiplier(0.2), 1.0);
        assert_eq!(ClearPhase::Flash.speed_multiplier(0.2), 0.2);
        assert_eq!(ClearPhase::Drop.speed_multiplier(0.2), 0.2);
    }
}
