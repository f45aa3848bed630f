//! Falling streams: a glyph trail, optionally carrying a tetromino at its head.

use crate::clear::ClearPhase;
use crate::collision;
use crate::config::SimConfig;
use crate::geometry::Region;
use crate::landed::LandedGrid;
use crate::pieces::PieceKind;
use log::{debug, trace};
use rand::Rng;

/// Number of fade steps in the rain gradient (bright → dark).
pub const GRADIENT_LEN: usize = 12;

/// How a tail glyph is shaded, from the head (index 0) upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailShade {
    /// The leading glyph, near-white.
    Tip,
    /// The next two glyphs, bright green-white.
    Head,
    /// Gradient step `0..GRADIENT_LEN`, 0 brightest.
    Fade(u8),
}

/// Shade for glyph `index` of a tail of `len` glyphs. Quadratic falloff toward the end.
pub fn tail_shade(index: usize, len: usize) -> TailShade {
    match index {
        0 => TailShade::Tip,
        1 | 2 => TailShade::Head,
        _ => {
            let t = index as f32 / len.max(1) as f32;
            let step = (t * t * (GRADIENT_LEN - 1) as f32) as usize;
            TailShade::Fade(step.min(GRADIENT_LEN - 1) as u8)
        }
    }
}

/// Half-width katakana, digits, or uppercase latin, one third each.
pub fn random_glyph<R: Rng>(rng: &mut R) -> char {
    match rng.gen_range(0..3) {
        0 => char::from_u32(0xFF66 + rng.gen_range(0..56)).unwrap_or('ｱ'),
        1 => char::from(b'0' + rng.gen_range(0..10u8)),
        _ => char::from(b'A' + rng.gen_range(0..26u8)),
    }
}

/// Piece carried by a stream plus its rotate / hard-drop timers.
#[derive(Debug, Clone, PartialEq)]
pub struct CarriedPiece {
    pub kind: PieceKind,
    pub rotation: u8,
    pub rotate_countdown: u32,
    pub hard_drop_countdown: u32,
    pub hard_dropping: bool,
    /// Fall speed before the hard drop kicked in.
    pub pre_drop_speed: f32,
}

/// What happened to a stream during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Still falling.
    Falling,
    /// Piece came to rest at `row` and the stream respawned. `committed` is false when
    /// no piece cell was on the grid (or the stop was above the scan window).
    Landed { row: i32, committed: bool },
    /// Fell past the region floor and respawned.
    Recycled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Index of the owning region; fixed for the stream's lifetime.
    pub region: usize,
    pub column: i32,
    /// Leading edge, in fractional grid rows. May be above the grid.
    pub head: f32,
    /// Rows per tick at full speed.
    pub fall_speed: f32,
    /// Tail symbols, `glyphs[0]` at the head.
    pub glyphs: Vec<char>,
    /// `None` for tail-only streams.
    pub piece: Option<CarriedPiece>,
}

impl Stream {
    /// A fresh stream entering from up to `initial_spawn_height` rows above the region.
    pub fn spawn<R: Rng>(
        region_index: usize,
        region: &Region,
        with_piece: bool,
        cfg: &SimConfig,
        rng: &mut R,
    ) -> Self {
        let top = region.top as f32;
        let head = rng.gen_range(top - cfg.initial_spawn_height as f32..=top);
        let mut stream = Self {
            region: region_index,
            column: 0,
            head,
            fall_speed: 0.0,
            glyphs: Vec::new(),
            piece: with_piece.then(|| CarriedPiece {
                kind: PieceKind::I,
                rotation: 0,
                rotate_countdown: 1,
                hard_drop_countdown: 1,
                hard_dropping: false,
                pre_drop_speed: 0.0,
            }),
        };
        stream.randomize(region, cfg, rng);
        stream
    }

    /// Restart above the same region with new column, speed, tail and piece.
    pub fn respawn<R: Rng>(&mut self, region: &Region, cfg: &SimConfig, rng: &mut R) {
        let top = region.top as i32;
        let lo = top - *cfg.respawn_height.end();
        let hi = top - *cfg.respawn_height.start();
        self.head = rng.gen_range(lo as f32..=hi as f32);
        self.randomize(region, cfg, rng);
    }

    fn randomize<R: Rng>(&mut self, region: &Region, cfg: &SimConfig, rng: &mut R) {
        self.column = rng.gen_range(region.left as i32..region.right as i32);
        self.fall_speed = rng.gen_range(cfg.fall_speed.clone());

        // Slow streams get long tails, fast streams short ones.
        let h = region.height();
        let max_len = if self.fall_speed < 0.3 {
            h / 2
        } else if self.fall_speed < 0.6 {
            h / 3
        } else {
            h / 5
        };
        let max_len = (max_len * 5 / 4).max(8).max(cfg.min_tail);
        let len = rng.gen_range(cfg.min_tail..=max_len);
        self.glyphs.clear();
        self.glyphs.extend((0..len).map(|_| random_glyph(rng)));

        if let Some(piece) = self.piece.as_mut() {
            piece.kind = PieceKind::ALL[rng.gen_range(0..PieceKind::ALL.len())];
            piece.rotation = rng.gen_range(0..4);
            piece.rotate_countdown = rng.gen_range(cfg.rotate_ticks.clone());
            piece.hard_drop_countdown = rng.gen_range(cfg.hard_drop_ticks.clone());
            piece.hard_dropping = false;
            piece.pre_drop_speed = self.fall_speed;
        }
    }

    #[inline]
    pub fn has_piece(&self) -> bool {
        self.piece.is_some()
    }

    #[inline]
    pub fn head_row(&self) -> i32 {
        self.head.floor() as i32
    }

    #[inline]
    pub fn tail_len(&self) -> usize {
        self.glyphs.len()
    }

    /// Grid row of glyph 0. Piece streams hang the tail just above the piece's top cells.
    pub fn tail_anchor_row(&self) -> i32 {
        match &self.piece {
            Some(p) => self.head_row() + p.kind.top_row(p.rotation) - 1,
            None => self.head_row(),
        }
    }

    /// Tail glyphs paired with their shade, head first.
    pub fn shaded_glyphs(&self) -> impl Iterator<Item = (char, TailShade)> + '_ {
        let len = self.glyphs.len();
        self.glyphs
            .iter()
            .enumerate()
            .map(move |(i, &g)| (g, tail_shade(i, len)))
    }

    fn scrolled_out(&self, region: &Region, cfg: &SimConfig) -> bool {
        self.head_row() - self.tail_len() as i32 > region.bottom as i32 + cfg.overscroll_margin
    }

    fn tick_timers<R: Rng>(
        &mut self,
        region: &Region,
        landed: &LandedGrid,
        cfg: &SimConfig,
        rng: &mut R,
    ) {
        let head_row = self.head_row();
        let column = self.column;
        let Some(piece) = self.piece.as_mut() else {
            return;
        };

        piece.rotate_countdown = piece.rotate_countdown.saturating_sub(1);
        if piece.rotate_countdown == 0 {
            let next = (piece.rotation + rng.gen_range(1..=3)) % 4;
            if collision::can_fit(landed, piece.kind, next, head_row, column, region) {
                piece.rotation = next;
            }
            piece.rotate_countdown = rng.gen_range(cfg.rotate_ticks.clone());
        }

        if !piece.hard_dropping {
            piece.hard_drop_countdown = piece.hard_drop_countdown.saturating_sub(1);
            if piece.hard_drop_countdown == 0 {
                piece.hard_dropping = true;
                piece.pre_drop_speed = self.fall_speed;
                self.fall_speed = rng.gen_range(cfg.hard_drop_speed.clone());
            }
        }
    }

    /// Run one tick: timers, glyph churn, movement, landing scan, respawn.
    ///
    /// `phase` is the owning region's clear phase this tick; anything but idle slows movement.
    pub fn advance<R: Rng>(
        &mut self,
        region: &Region,
        phase: ClearPhase,
        landed: &mut LandedGrid,
        cfg: &SimConfig,
        rng: &mut R,
    ) -> Advance {
        self.tick_timers(region, landed, cfg, rng);

        let new_head = self.head + self.fall_speed * phase.speed_multiplier(cfg.clear_slowdown);
        let start_row = self.head_row();
        let end_row = new_head.floor() as i32;

        if cfg.glyph_mutation_odds > 0
            && !self.glyphs.is_empty()
            && rng.gen_range(0..cfg.glyph_mutation_odds) == 0
        {
            let i = rng.gen_range(0..self.glyphs.len());
            self.glyphs[i] = random_glyph(rng);
        }

        let Some((kind, rotation)) = self.piece.as_ref().map(|p| (p.kind, p.rotation)) else {
            self.head = new_head;
            if self.scrolled_out(region, cfg) {
                self.respawn(region, cfg, rng);
                return Advance::Recycled;
            }
            return Advance::Falling;
        };

        let window_top = region.top as i32 - cfg.spawn_scan_margin;
        if end_row >= window_top {
            let from = start_row.max(window_top);
            if let Some(row) =
                collision::scan_landing(landed, kind, rotation, self.column, from, end_row, region)
            {
                let mut committed = false;
                if row >= window_top {
                    self.head = row as f32;
                    if collision::touches_grid(landed, kind, rotation, row, self.column) {
                        let color = kind.color(&cfg.piece_colors);
                        collision::land(landed, kind, rotation, row, self.column, color);
                        committed = true;
                        trace!("{kind:?}/{rotation} landed at ({row}, {})", self.column);
                    }
                } else {
                    debug!(
                        "{kind:?} blocked above scan window at col {}; respawning without landing",
                        self.column
                    );
                }
                self.respawn(region, cfg, rng);
                return Advance::Landed { row, committed };
            }
        }

        self.head = new_head;
        if self.scrolled_out(region, cfg) {
            debug!("piece stream fell through region floor at col {}", self.column);
            self.respawn(region, cfg, rng);
            return Advance::Recycled;
        }
        Advance::Falling
    }
}
