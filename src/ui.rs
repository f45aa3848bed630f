//! Drawing: landed blocks, clear flash and slide, rain tails, falling pieces, HUD, pause.
//!
//! One grid cell is [`CELL_COLS`] terminal columns by one row. Everything here reads a
//! [`Snapshot`]; the simulation is never touched while a frame is drawn.

use crate::theme::{Theme, scale};
use matrixtris::{ClearPhase, Region, RegionClear, Rgb, RowSpan, Snapshot, Stream, TailShade};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal columns per grid cell; keeps cells roughly square.
pub const CELL_COLS: u16 = 2;

const BLOCK: &str = "█";

/// Fade effects over flashing bands, one slot per region.
#[derive(Default)]
pub struct ClearEffects {
    slots: Vec<Option<Effect>>,
    /// Last time the effects were processed (for delta).
    process_time: Option<Instant>,
}

impl ClearEffects {
    /// Drop every running effect, e.g. after the simulation was rebuilt.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.process_time = None;
    }
}

/// Render-only state that is not part of the simulation.
pub struct View<'a> {
    pub theme: &'a Theme,
    pub frame_ms: u64,
    pub paused: bool,
    pub hud: bool,
}

#[inline]
fn rgb(c: Rgb) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

/// Paint one grid cell. Cells outside `area` are skipped. `bg: None` keeps what is there.
fn put_cell(
    buf: &mut Buffer,
    area: Rect,
    (row, col): (i32, i32),
    symbols: (&str, &str),
    fg: Color,
    bg: Option<Color>,
) {
    if row < 0 || col < 0 {
        return;
    }
    let x = i64::from(area.x) + i64::from(col) * i64::from(CELL_COLS);
    let y = i64::from(area.y) + i64::from(row);
    if x + 1 >= i64::from(area.right()) || y >= i64::from(area.bottom()) {
        return;
    }
    let (x, y) = (x as u16, y as u16);
    for (dx, symbol) in [(0, symbols.0), (1, symbols.1)] {
        let cell = &mut buf[(x + dx, y)];
        cell.set_symbol(symbol).set_fg(fg);
        if let Some(bg) = bg {
            cell.set_bg(bg);
        }
    }
}

/// Rows the stack above a dropping band is drawn lower by, per region.
fn slide_rows(clear: &RegionClear, cell_size: u32) -> Option<(RowSpan, i32)> {
    if clear.phase() != ClearPhase::Drop {
        return None;
    }
    let span = clear.span()?;
    Some((span, (clear.drop_offset() / cell_size.max(1) as f32) as i32))
}

fn draw_landed(buf: &mut Buffer, area: Rect, snap: &Snapshot<'_>) {
    let slides: Vec<_> = snap
        .regions_with_clears()
        .filter_map(|(region, clear)| {
            slide_rows(clear, snap.config.cell_size).map(|slide| (*region, slide))
        })
        .collect();

    for row in 0..snap.rows {
        for col in 0..snap.cols {
            let cell = snap.landed.get(row, col);
            if !cell.filled {
                continue;
            }
            let mut draw_row = row as i32;
            if let Some((region, (_, shift))) = slides
                .iter()
                .find(|(r, (span, _))| r.contains(row as i32, col as i32) && row < span.top)
            {
                draw_row += shift;
                if draw_row >= region.bottom as i32 {
                    continue;
                }
            }
            let color = rgb(cell.color.dim(cell.brightness));
            put_cell(buf, area, (draw_row, col as i32), (BLOCK, BLOCK), color, None);
        }
    }
}

fn draw_flash(buf: &mut Buffer, area: Rect, snap: &Snapshot<'_>, theme: &Theme) {
    for (region, clear) in snap.regions_with_clears() {
        if clear.phase() != ClearPhase::Flash {
            continue;
        }
        let Some(span) = clear.span() else { continue };
        let tint = scale(theme.flash, clear.flash_alpha());
        for row in span.rows() {
            for col in region.cols() {
                put_cell(buf, area, (row as i32, col as i32), (" ", " "), tint, Some(tint));
            }
        }
    }
}

fn shade_color(shade: TailShade, theme: &Theme) -> Color {
    match shade {
        TailShade::Tip => theme.tip,
        TailShade::Head => theme.head,
        TailShade::Fade(i) => theme.rain[usize::from(i).min(theme.rain.len() - 1)],
    }
}

fn draw_stream(
    buf: &mut Buffer,
    area: Rect,
    stream: &Stream,
    region: &Region,
    snap: &Snapshot<'_>,
    theme: &Theme,
) {
    let anchor = stream.tail_anchor_row();
    let mut glyph = [0u8; 4];
    for (i, (g, shade)) in stream.shaded_glyphs().enumerate() {
        let row = anchor - i as i32;
        if row < region.top as i32 {
            break;
        }
        if !region.contains(row, stream.column) {
            continue;
        }
        let symbol: &str = g.encode_utf8(&mut glyph);
        put_cell(
            buf,
            area,
            (row, stream.column),
            (symbol, " "),
            shade_color(shade, theme),
            None,
        );
    }

    if let Some(piece) = &stream.piece {
        let color = rgb(piece.kind.color(&snap.config.piece_colors));
        let head = stream.head_row();
        for (r, c) in piece.kind.cells(piece.rotation) {
            let (row, col) = (head + r, stream.column + c - 1);
            if region.contains(row, col) {
                put_cell(buf, area, (row, col), (BLOCK, BLOCK), color, None);
            }
        }
    }
}

/// Band rectangle in terminal cells, clipped to `area`.
fn band_rect(area: Rect, region: &Region, span: RowSpan) -> Rect {
    let x = area.x.saturating_add(region.left as u16 * CELL_COLS);
    let y = area.y.saturating_add(span.top as u16);
    let rect = Rect {
        x,
        y,
        width: region.width() as u16 * CELL_COLS,
        height: span.len() as u16,
    };
    rect.intersection(area)
}

/// Create, advance and retire the per-region fade over flashing bands.
fn apply_clear_effects(
    frame: &mut Frame,
    snap: &Snapshot<'_>,
    view: &View<'_>,
    area: Rect,
    effects: &mut ClearEffects,
    now: Instant,
) {
    let delta = effects
        .process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    effects.process_time = Some(now);

    effects.slots.resize_with(snap.regions.len(), || None);
    let fade_ms =
        (u64::from(snap.config.flash_ticks) * view.frame_ms).min(u64::from(u32::MAX)) as u32;
    for ((region, clear), slot) in snap.regions_with_clears().zip(effects.slots.iter_mut()) {
        let span = match (clear.phase(), clear.span()) {
            (ClearPhase::Flash, Some(span)) => span,
            _ => {
                *slot = None;
                continue;
            }
        };
        let rect = band_rect(area, region, span);
        if rect.is_empty() {
            continue;
        }
        if slot.is_none() {
            let bg = view.theme.bg;
            let effect = fx::fade_to(bg, bg, (fade_ms, Interpolation::Linear)).with_area(rect);
            *slot = Some(effect);
        }
        if let Some(effect) = slot {
            frame.render_effect(effect, rect, tfx_delta);
        }
    }
}

fn phase_label(phase: ClearPhase) -> &'static str {
    match phase {
        ClearPhase::Idle => "idle",
        ClearPhase::Flash => "flash",
        ClearPhase::Drop => "drop",
    }
}

fn draw_hud(frame: &mut Frame, snap: &Snapshot<'_>, theme: &Theme, area: Rect) {
    let style = Style::default().fg(theme.hud_fg).bg(theme.bg);
    let sep = Span::styled(" │ ", Style::default().fg(theme.div_line).bg(theme.bg));
    let mut spans = vec![Span::styled(format!(" t{} ", snap.tick), style)];
    for (i, (_, clear)) in snap.regions_with_clears().enumerate() {
        spans.push(sep.clone());
        spans.push(Span::styled(
            format!(
                "D{i} {:>3.0}% {}",
                snap.fill_fraction(i) * 100.0,
                phase_label(clear.phase())
            ),
            style,
        ));
    }
    let line_area = Rect {
        height: area.height.min(1),
        ..area
    };
    Paragraph::new(Line::from(spans)).render(line_area, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.hud_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.hud_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw one frame of the current simulation state.
pub fn draw(
    frame: &mut Frame,
    snap: &Snapshot<'_>,
    view: &View<'_>,
    effects: &mut ClearEffects,
    now: Instant,
) {
    let area = frame.area();
    let theme = view.theme;
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    draw_landed(buf, area, snap);
    draw_flash(buf, area, snap, theme);
    for stream in snap.streams {
        draw_stream(buf, area, stream, &snap.regions[stream.region], snap, theme);
    }

    apply_clear_effects(frame, snap, view, area, effects, now);

    if view.hud {
        draw_hud(frame, snap, theme, area);
    }
    if view.paused {
        draw_pause_overlay(frame, theme, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrixtris::{GridGeometry, LandedGrid, SimConfig, Simulation};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sim() -> Simulation {
        let mut s = Simulation::with_rng(
            SimConfig::default(),
            GridGeometry::single(10, 10),
            StdRng::seed_from_u64(3),
        )
        .unwrap();
        s.streams_mut().clear();
        s
    }

    fn fill(landed: &mut LandedGrid, rows: std::ops::RangeInclusive<usize>) {
        for r in rows {
            for c in 0..10 {
                landed.set(r, c, Rgb(0, 255, 100));
            }
        }
    }

    #[test]
    fn test_put_cell_clips_to_area() {
        let area = Rect::new(0, 0, 6, 2);
        let mut buf = Buffer::empty(area);
        put_cell(&mut buf, area, (0, 2), ("A", " "), Color::Green, None);
        put_cell(&mut buf, area, (0, 3), ("B", " "), Color::Green, None);
        put_cell(&mut buf, area, (-1, 0), ("C", " "), Color::Green, None);
        assert_eq!(buf[(4, 0)].symbol(), "A");
        assert_eq!(buf[(5, 0)].symbol(), " ");
        assert_eq!(buf[(0, 0)].symbol(), " ");
    }

    #[test]
    fn test_landed_blocks_are_dimmed_by_brightness() {
        let mut s = sim();
        s.landed_mut().set(9, 0, Rgb(0, 200, 80));
        for _ in 0..100 {
            s.landed_mut().decay_brightness(80, 3);
        }
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        draw_landed(&mut buf, area, &s.snapshot());
        assert_eq!(buf[(0, 9)].symbol(), BLOCK);
        assert_eq!(buf[(0, 9)].fg, rgb(Rgb(0, 200, 80).dim(80)));
    }

    #[test]
    fn test_stack_slides_during_drop() {
        let mut s = sim();
        fill(s.landed_mut(), 6..=9);
        s.landed_mut().set(2, 5, Rgb(0, 255, 100));
        // Start the clear and run out the flash.
        for _ in 0..=s.config().flash_ticks {
            s.tick();
        }
        assert_eq!(s.phase(0), ClearPhase::Drop);
        let mut ticks = 0;
        while s.clear_states()[0].drop_offset() < 32.0 {
            s.tick();
            ticks += 1;
            assert!(ticks < 100);
        }
        let snap = s.snapshot();
        let shift = slide_rows(&snap.clears[0], snap.config.cell_size).unwrap().1;
        assert!(shift >= 2);
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        draw_landed(&mut buf, area, &snap);
        assert_eq!(buf[(10, 2 + shift as u16)].symbol(), BLOCK);
        assert_eq!(buf[(10, 2)].symbol(), " ");
    }

    #[test]
    fn test_flash_band_is_tinted() {
        let mut s = sim();
        fill(s.landed_mut(), 6..=9);
        s.tick();
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        let theme = Theme::default();
        let snap = s.snapshot();
        draw_flash(&mut buf, area, &snap, &theme);
        let alpha = snap.clears[0].flash_alpha();
        assert_eq!(buf[(0, 6)].bg, scale(theme.flash, alpha));
        assert_eq!(buf[(19, 9)].bg, scale(theme.flash, alpha));
        assert_eq!(buf[(0, 5)].bg, Color::Reset);
    }

    #[test]
    fn test_band_rect() {
        let area = Rect::new(0, 0, 40, 20);
        let r = band_rect(area, &Region::new(5, 0, 15, 20), RowSpan { top: 16, bottom: 19 });
        assert_eq!(r, Rect::new(10, 16, 20, 4));
    }
}
