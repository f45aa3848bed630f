//! App: terminal init, main loop, tick timing and input handling.

use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, CELL_COLS, ClearEffects, View};
use crate::{Args, build_simulation};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseEventKind};
use log::{debug, info, warn};
use matrixtris::{SimConfig, Simulation, compute_regions};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Mouse travel, in terminal cells, that ends the screensaver.
const MOUSE_EXIT_CELLS: u16 = 2;

pub struct App {
    args: Args,
    /// Config before any per-layout cell-size adjustment.
    base_config: SimConfig,
    theme: Theme,
    sim: Simulation,
    paused: bool,
    last_tick: Instant,
    frame: Duration,
    /// First mouse position seen; movement is measured from here.
    mouse_origin: Option<(u16, u16)>,
    clear_effects: ClearEffects,
}

impl App {
    pub fn new(args: Args, config: SimConfig, theme: Theme) -> Result<Self> {
        let (cols, rows) = crossterm::terminal::size()?;
        let layout = args.layout(&config, cols, rows)?;
        let sim = build_simulation(layout, args.seed)?;
        Ok(Self {
            frame: Duration::from_millis(args.frame_ms.max(1)),
            args,
            base_config: config,
            theme,
            sim,
            paused: false,
            last_tick: Instant::now(),
            mouse_origin: None,
            clear_effects: ClearEffects::default(),
        })
    }

    /// Recompute the layout for a new terminal size and restart the simulation on it.
    ///
    /// A terminal too small to hold a cell keeps the current simulation; drawing clips it
    /// until the next usable resize.
    fn rebuild(&mut self, cols: u16, rows: u16) -> Result<()> {
        let layout = match self.args.layout(&self.base_config, cols, rows) {
            Ok(layout) => layout,
            Err(e) => {
                warn!("keeping current grid: {e}");
                return Ok(());
            }
        };
        let geometry = compute_regions(&layout.surface, &layout.rects, layout.config.cell_size)?;
        if geometry == *self.sim.geometry() && layout.config == *self.sim.config() {
            return Ok(());
        }
        info!(
            "terminal resized to {cols}x{rows}; grid {}x{}",
            cols / CELL_COLS,
            rows
        );
        self.sim.reconfigure(layout.config, geometry)?;
        self.clear_effects.reset();
        Ok(())
    }

    /// True once the pointer has travelled far enough from where it was first seen.
    fn mouse_moved_far(&mut self, column: u16, row: u16) -> bool {
        let (x0, y0) = *self.mouse_origin.get_or_insert((column, row));
        column.abs_diff(x0) > MOUSE_EXIT_CELLS || row.abs_diff(y0) > MOUSE_EXIT_CELLS
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        if !self.args.preview {
            // Pointer motion only matters when it can end the screensaver.
            let _ = execute!(stdout, EnableMouseCapture);
        }

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        if !self.args.preview {
            let _ = execute!(std::io::stdout(), DisableMouseCapture);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        terminal.show_cursor()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let view = View {
                theme: &self.theme,
                frame_ms: self.args.frame_ms,
                paused: self.paused,
                hud: self.args.hud,
            };
            let snapshot = self.sim.snapshot();
            terminal.draw(|f| ui::draw(f, &snapshot, &view, &mut self.clear_effects, now))?;

            let timeout = self.frame.saturating_sub(self.last_tick.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            match key_to_action(key, self.args.preview) {
                                Action::Quit => return Ok(()),
                                Action::Pause => self.paused = !self.paused,
                                Action::None => {}
                            }
                        }
                        Event::Mouse(mouse)
                            if !self.args.preview && mouse.kind == MouseEventKind::Moved =>
                        {
                            if self.mouse_moved_far(mouse.column, mouse.row) {
                                return Ok(());
                            }
                        }
                        Event::Resize(cols, rows) => self.rebuild(cols, rows)?,
                        _ => {}
                    }
                }
            }

            if self.last_tick.elapsed() >= self.frame {
                self.last_tick = Instant::now();
                if !self.paused {
                    let summary = self.sim.tick();
                    if summary.clears_started > 0 || summary.clears_finished > 0 {
                        debug!("tick {}: {summary:?}", self.sim.tick_count());
                    }
                }
            }
        }
    }
}
