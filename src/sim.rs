//! Tick driver: owns the grid, streams and clear controllers, and steps them in order.

use crate::clear::{ClearEvent, ClearPhase, RegionClear};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::geometry::{DeviceRect, GridGeometry, Region, Surface, compute_regions};
use crate::landed::LandedGrid;
use crate::stream::{Advance, Stream};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::AddAssign;

/// Counts of what happened during one tick (or, summed, a whole run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// Pieces written into the landed grid.
    pub landings: usize,
    /// Pieces that came to rest with no cell on the grid, or above the scan window.
    pub commits_skipped: usize,
    /// Streams respawned for any reason.
    pub respawns: usize,
    pub clears_started: usize,
    pub clears_finished: usize,
}

impl AddAssign for TickSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.landings += rhs.landings;
        self.commits_skipped += rhs.commits_skipped;
        self.respawns += rhs.respawns;
        self.clears_started += rhs.clears_started;
        self.clears_finished += rhs.clears_finished;
    }
}

/// Read-only view handed to renderers between ticks.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub tick: u64,
    pub config: &'a SimConfig,
    pub cols: usize,
    pub rows: usize,
    pub landed: &'a LandedGrid,
    pub streams: &'a [Stream],
    pub regions: &'a [Region],
    /// One per region, same order as `regions`.
    pub clears: &'a [RegionClear],
}

impl Snapshot<'_> {
    /// Regions paired with their clear state.
    pub fn regions_with_clears(&self) -> impl Iterator<Item = (&Region, &RegionClear)> + '_ {
        self.regions.iter().zip(self.clears)
    }

    pub fn fill_fraction(&self, region: usize) -> f32 {
        self.landed.fill_fraction(&self.regions[region])
    }
}

/// The whole simulation. Generic over the random source so tests can seed it.
#[derive(Debug, Clone)]
pub struct Simulation<R: Rng = StdRng> {
    config: SimConfig,
    geometry: GridGeometry,
    landed: LandedGrid,
    streams: Vec<Stream>,
    clears: Vec<RegionClear>,
    rng: R,
    tick: u64,
}

impl Simulation<StdRng> {
    /// Build from a surface and display rectangles with a fixed seed.
    pub fn seeded(
        config: SimConfig,
        surface: &Surface,
        rects: &[DeviceRect],
        seed: u64,
    ) -> Result<Self, SimError> {
        let geometry = compute_regions(surface, rects, config.cell_size)?;
        Self::with_rng(config, geometry, StdRng::seed_from_u64(seed))
    }

    /// Build from a surface and display rectangles, seeded from the OS.
    pub fn new(
        config: SimConfig,
        surface: &Surface,
        rects: &[DeviceRect],
    ) -> Result<Self, SimError> {
        let geometry = compute_regions(surface, rects, config.cell_size)?;
        Self::with_rng(config, geometry, StdRng::from_entropy())
    }
}

fn check_geometry(geometry: &GridGeometry) -> Result<(), SimError> {
    if geometry.regions.is_empty() {
        return Err(SimError::NoRegions);
    }
    for (index, r) in geometry.regions.iter().enumerate() {
        if r.right <= r.left || r.bottom <= r.top {
            return Err(SimError::EmptyRegion {
                index,
                cols: r.right as i64 - r.left as i64,
                rows: r.bottom as i64 - r.top as i64,
            });
        }
        if r.right > geometry.cols || r.bottom > geometry.rows {
            return Err(SimError::RegionOutOfGrid {
                index,
                cols: geometry.cols,
                rows: geometry.rows,
            });
        }
        if let Some(a) = geometry.regions[..index]
            .iter()
            .position(|earlier| earlier.overlaps(r))
        {
            return Err(SimError::OverlappingRegions { a, b: index });
        }
    }
    Ok(())
}

impl<R: Rng> Simulation<R> {
    /// Build over an already computed geometry with an injected random source.
    pub fn with_rng(config: SimConfig, geometry: GridGeometry, rng: R) -> Result<Self, SimError> {
        config.validate()?;
        check_geometry(&geometry)?;
        let mut sim = Self {
            landed: LandedGrid::new(geometry.rows, geometry.cols),
            clears: Vec::new(),
            streams: Vec::new(),
            config,
            geometry,
            rng,
            tick: 0,
        };
        sim.populate();
        Ok(sim)
    }

    fn populate(&mut self) {
        self.clears = vec![RegionClear::new(); self.geometry.regions.len()];
        self.streams.clear();
        for (index, region) in self.geometry.regions.iter().enumerate() {
            let pieces = region.width().max(self.config.min_piece_streams);
            let tails = (pieces as f32 * self.config.tail_stream_ratio) as usize;
            self.streams.reserve(pieces + tails);
            for i in 0..pieces + tails {
                self.streams.push(Stream::spawn(
                    index,
                    region,
                    i < pieces,
                    &self.config,
                    &mut self.rng,
                ));
            }
            debug!("region {index}: {pieces} piece stream(s), {tails} tail-only");
        }
    }

    /// Replace config and geometry after a resize or display change.
    ///
    /// Landed blocks, streams and clear animations start over; the random source carries on.
    pub fn reconfigure(
        &mut self,
        config: SimConfig,
        geometry: GridGeometry,
    ) -> Result<(), SimError> {
        config.validate()?;
        check_geometry(&geometry)?;
        info!(
            "rebuilding simulation for {}x{} grid, {} region(s)",
            geometry.cols,
            geometry.rows,
            geometry.regions.len()
        );
        self.landed = LandedGrid::new(geometry.rows, geometry.cols);
        self.config = config;
        self.geometry = geometry;
        self.populate();
        Ok(())
    }

    /// Advance one frame: clear controllers, then streams, then brightness decay.
    pub fn tick(&mut self) -> TickSummary {
        let mut summary = TickSummary::default();

        for (region, clear) in self.geometry.regions.iter().zip(&mut self.clears) {
            match clear.advance(region, &mut self.landed, &self.config) {
                Some(ClearEvent::Started(_)) => summary.clears_started += 1,
                Some(ClearEvent::Settled(_)) => summary.clears_finished += 1,
                Some(ClearEvent::Emptied(_)) | None => {}
            }
        }

        for stream in &mut self.streams {
            let region = &self.geometry.regions[stream.region];
            let phase = self.clears[stream.region].phase();
            match stream.advance(region, phase, &mut self.landed, &self.config, &mut self.rng) {
                Advance::Falling => {}
                Advance::Landed { committed, .. } => {
                    summary.respawns += 1;
                    if committed {
                        summary.landings += 1;
                    } else {
                        summary.commits_skipped += 1;
                    }
                }
                Advance::Recycled => summary.respawns += 1,
            }
        }

        self.landed
            .decay_brightness(self.config.brightness_floor, self.config.brightness_decay);
        self.tick += 1;
        summary
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tick: self.tick,
            config: &self.config,
            cols: self.geometry.cols,
            rows: self.geometry.rows,
            landed: &self.landed,
            streams: &self.streams,
            regions: &self.geometry.regions,
            clears: &self.clears,
        }
    }

    #[inline]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    #[inline]
    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.geometry.regions
    }

    #[inline]
    pub const fn landed(&self) -> &LandedGrid {
        &self.landed
    }

    /// Direct grid access for hosts that seed patterns, and for tests.
    #[inline]
    pub const fn landed_mut(&mut self) -> &mut LandedGrid {
        &mut self.landed
    }

    #[inline]
    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    #[inline]
    pub const fn streams_mut(&mut self) -> &mut Vec<Stream> {
        &mut self.streams
    }

    #[inline]
    pub fn clear_states(&self) -> &[RegionClear] {
        &self.clears
    }

    pub fn phase(&self, region: usize) -> ClearPhase {
        self.clears[region].phase()
    }

    pub fn fill_fraction(&self, region: usize) -> f32 {
        self.landed.fill_fraction(&self.geometry.regions[region])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landed::Rgb;
    use crate::pieces::PieceKind;

    fn sim(cols: usize, rows: usize) -> Simulation {
        Simulation::with_rng(
            SimConfig::default(),
            GridGeometry::single(cols, rows),
            StdRng::seed_from_u64(42),
        )
        .unwrap()
    }

    #[test]
    fn test_population_per_region() {
        let s = sim(10, 20);
        // max(10, 15) piece streams plus half as many tail-only.
        assert_eq!(s.streams().iter().filter(|st| st.has_piece()).count(), 15);
        assert_eq!(s.streams().iter().filter(|st| !st.has_piece()).count(), 7);

        let wide = sim(40, 20);
        assert_eq!(wide.streams().iter().filter(|st| st.has_piece()).count(), 40);
        assert_eq!(wide.streams().len(), 60);
    }

    #[test]
    fn test_streams_belong_to_their_region() {
        let geo = GridGeometry {
            cols: 20,
            rows: 10,
            regions: vec![Region::new(0, 0, 10, 10), Region::new(10, 0, 20, 10)],
        };
        let mut s = Simulation::with_rng(SimConfig::default(), geo, StdRng::seed_from_u64(1))
            .unwrap();
        for _ in 0..300 {
            s.tick();
            for st in s.streams() {
                assert!(s.regions()[st.region].contains_col(st.column));
            }
        }
    }

    #[test]
    fn test_rejects_empty_region_list() {
        let geo = GridGeometry {
            cols: 10,
            rows: 10,
            regions: Vec::new(),
        };
        let err = Simulation::with_rng(SimConfig::default(), geo, StdRng::seed_from_u64(0))
            .unwrap_err();
        assert_eq!(err, SimError::NoRegions);
    }

    #[test]
    fn test_rejects_degenerate_and_oversized_regions() {
        let flat = GridGeometry {
            cols: 10,
            rows: 10,
            regions: vec![Region::new(3, 5, 3, 9)],
        };
        assert!(matches!(
            Simulation::with_rng(SimConfig::default(), flat, StdRng::seed_from_u64(0)),
            Err(SimError::EmptyRegion { index: 0, .. })
        ));
        let big = GridGeometry {
            cols: 10,
            rows: 10,
            regions: vec![Region::new(0, 0, 12, 10)],
        };
        assert!(matches!(
            Simulation::with_rng(SimConfig::default(), big, StdRng::seed_from_u64(0)),
            Err(SimError::RegionOutOfGrid { index: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_overlapping_regions() {
        let geo = GridGeometry {
            cols: 20,
            rows: 10,
            regions: vec![
                Region::new(0, 0, 8, 10),
                Region::new(8, 0, 20, 10),
                Region::new(5, 2, 9, 4),
            ],
        };
        assert_eq!(
            Simulation::with_rng(SimConfig::default(), geo, StdRng::seed_from_u64(0)).unwrap_err(),
            SimError::OverlappingRegions { a: 0, b: 2 }
        );

        let mut s = sim(10, 10);
        let mirrored = GridGeometry {
            cols: 10,
            rows: 10,
            regions: vec![Region::new(0, 0, 10, 10); 2],
        };
        assert_eq!(
            s.reconfigure(SimConfig::default(), mirrored),
            Err(SimError::OverlappingRegions { a: 0, b: 1 })
        );
        assert_eq!(s.regions().len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = SimConfig {
            rows_per_clear: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            Simulation::with_rng(cfg, GridGeometry::single(10, 10), StdRng::seed_from_u64(0)),
            Err(SimError::InvalidRowsPerClear)
        ));
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = sim(16, 24);
        let mut b = sim(16, 24);
        for _ in 0..500 {
            assert_eq!(a.tick(), b.tick());
        }
        assert_eq!(a.landed(), b.landed());
        assert_eq!(a.streams(), b.streams());
        assert_eq!(a.clear_states(), b.clear_states());
    }

    #[test]
    fn test_clear_phase_applies_to_streams_in_same_tick() {
        let mut s = sim(10, 10);
        let region = s.regions()[0];
        for r in 6..10 {
            for c in region.cols() {
                s.landed_mut().set(r, c, Rgb(0, 200, 80));
            }
        }
        s.streams_mut().truncate(1);
        let st = &mut s.streams_mut()[0];
        st.piece = None;
        st.head = -30.0;
        st.fall_speed = 1.0;
        st.glyphs.truncate(6);

        let summary = s.tick();
        assert_eq!(summary.clears_started, 1);
        assert_eq!(s.phase(0), ClearPhase::Flash);
        // The controller ran first, so this tick's movement was already slowed.
        assert!((s.streams()[0].head + 29.8).abs() < 1e-4);
    }

    #[test]
    fn test_off_grid_stop_counts_as_skipped() {
        let mut s = sim(10, 10);
        for c in 0..10 {
            s.landed_mut().set(0, c, Rgb(0, 200, 80));
        }
        s.streams_mut().truncate(1);
        let st = &mut s.streams_mut()[0];
        st.column = 4;
        st.head = -2.0;
        st.fall_speed = 1.0;
        let p = st.piece.as_mut().unwrap();
        p.kind = PieceKind::O;
        p.rotate_countdown = 1000;
        p.hard_drop_countdown = 1000;

        let summary = s.tick();
        assert_eq!(summary.commits_skipped, 1);
        assert_eq!(summary.landings, 0);
        assert_eq!(summary.respawns, 1);
        assert_eq!(s.landed().cells().iter().filter(|c| c.filled).count(), 10);
    }

    #[test]
    fn test_decay_runs_once_per_tick() {
        let mut s = sim(10, 40);
        s.streams_mut().clear();
        s.landed_mut().set(39, 0, Rgb(0, 255, 100));
        s.tick();
        assert_eq!(s.landed().get(39, 0).brightness, 252);
    }

    #[test]
    fn test_reconfigure_resets_state() {
        let mut s = sim(10, 10);
        s.landed_mut().set(9, 9, Rgb(1, 1, 1));
        s.tick();
        s.reconfigure(SimConfig::default(), GridGeometry::single(30, 12))
            .unwrap();
        assert_eq!(s.landed().cols(), 30);
        assert_eq!(s.landed().rows(), 12);
        assert_eq!(s.fill_fraction(0), 0.0);
        assert_eq!(s.streams().len(), 45);
        assert!(s.clear_states().iter().all(|c| c.phase() == ClearPhase::Idle));
        assert_eq!(s.tick_count(), 1);

        let empty = GridGeometry {
            cols: 4,
            rows: 4,
            regions: Vec::new(),
        };
        assert_eq!(
            s.reconfigure(SimConfig::default(), empty),
            Err(SimError::NoRegions)
        );
    }

    #[test]
    fn test_snapshot_matches_state() {
        let mut s = sim(12, 12);
        s.tick();
        let snap = s.snapshot();
        assert_eq!(snap.tick, 1);
        assert_eq!((snap.cols, snap.rows), (12, 12));
        assert_eq!(snap.streams.len(), s.streams().len());
        assert_eq!(snap.regions_with_clears().count(), 1);
        assert_eq!(snap.fill_fraction(0), s.fill_fraction(0));
    }

    #[test]
    fn test_summary_add_assign() {
        let mut total = TickSummary::default();
        total += TickSummary {
            landings: 2,
            respawns: 3,
            commits_skipped: 1,
            ..TickSummary::default()
        };
        total += TickSummary {
            landings: 1,
            clears_started: 1,
            ..TickSummary::default()
        };
        assert_eq!(total.landings, 3);
        assert_eq!(total.respawns, 3);
        assert_eq!(total.clears_started, 1);
    }
}
