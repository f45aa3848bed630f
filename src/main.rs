//! matrixtris: Matrix digital rain in the terminal, where the streams drop tetrominoes.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Result, bail};
use app::App;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use matrixtris::{DeviceRect, SimConfig, Simulation, Surface, TickSummary};

/// Terminal size assumed by `--headless` (80x24, so a 40x24 cell grid).
const HEADLESS_TERMINAL: (u16, u16) = (80, 24);

fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.headless { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("theme file ignored: {e}");
        theme::Theme::default_for_palette(args.palette)
    });
    let config = SimConfig {
        piece_colors: theme.piece_palette(),
        ..args.sim_config()
    };
    config.validate()?;

    if args.headless {
        return run_headless(&args, config);
    }
    let mut app = App::new(args, config, theme)?;
    app.run()
}

fn run_headless(args: &Args, config: SimConfig) -> Result<()> {
    let (cols, rows) = HEADLESS_TERMINAL;
    let layout = args.layout(&config, cols, rows)?;
    let mut sim = build_simulation(layout, args.seed)?;

    let mut total = TickSummary::default();
    for _ in 0..args.ticks {
        total += sim.tick();
    }
    info!(
        "{} ticks: {} landed, {} skipped, {} respawns, {} clears started, {} finished",
        sim.tick_count(),
        total.landings,
        total.commits_skipped,
        total.respawns,
        total.clears_started,
        total.clears_finished
    );
    for (i, region) in sim.regions().iter().enumerate() {
        info!(
            "region {i} [{}..{} x {}..{}]: fill {:.0}%, {:?}",
            region.left,
            region.right,
            region.top,
            region.bottom,
            sim.fill_fraction(i) * 100.0,
            sim.phase(i)
        );
    }
    Ok(())
}

/// Cell size, surface and display rectangles for one terminal size.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub config: SimConfig,
    pub surface: Surface,
    pub rects: Vec<DeviceRect>,
}

pub fn build_simulation(layout: Layout, seed: Option<u64>) -> Result<Simulation> {
    let Layout {
        config,
        surface,
        rects,
    } = layout;
    let sim = match seed {
        Some(seed) => Simulation::seeded(config, &surface, &rects, seed)?,
        None => Simulation::new(config, &surface, &rects)?,
    };
    Ok(sim)
}

/// Matrix rain screensaver with falling tetrominoes.
#[derive(Debug, Parser)]
#[command(
    name = "matrixtris",
    version,
    about = "Matrix digital rain in the terminal; the falling streams carry tetrominoes that stack up and clear.",
    long_about = "matrixtris is a terminal screensaver.\n\n\
        Streams of glyphs fall down the screen, many of them carrying a tetromino that rotates, \
        sometimes hard-drops, and lands on the stack below. When a display fills past a threshold \
        its bottom rows flash, vanish, and the rest slides down.\n\n\
        Any key or moving the mouse exits. With --preview: P / Space pause, Q / Esc quit.\n\n\
        Use --theme to load a btop-style theme file (theme[key]=\"#RRGGBB\")."
)]
pub struct Args {
    /// Device pixels per grid cell. Scales the clear-drop animation.
    #[arg(long, default_value = "16", value_name = "PX")]
    pub cell_size: u32,

    /// Fraction of a display's rows that must hold blocks before a clear starts.
    #[arg(long, default_value = "0.30", value_name = "FRACTION")]
    pub fill_threshold: f32,

    /// Maximum rows removed per clear.
    #[arg(long, default_value = "4", value_name = "N")]
    pub rows_per_clear: usize,

    /// Ticks the clear band flashes before it is removed.
    #[arg(long, default_value = "20", value_name = "TICKS")]
    pub flash_ticks: u32,

    /// Milliseconds per simulation tick (45 ≈ 22 fps).
    #[arg(long, default_value = "45", value_name = "MS")]
    pub frame_ms: u64,

    /// Seed for the random source; random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Split the terminal into N side-by-side displays.
    #[arg(
        long,
        default_value = "1",
        value_name = "N",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub monitors: u16,

    /// Explicit display geometry in device pixels (repeatable). Overrides --monitors.
    #[arg(long = "monitor", value_name = "WxH+X+Y")]
    pub monitor: Vec<DeviceRect>,

    /// Single-display mode: run only on display N (0-based), stretched over the terminal.
    #[arg(long, value_name = "N")]
    pub target_monitor: Option<usize>,

    /// Preview mode: keys other than Q / Esc do not exit, mouse movement is ignored.
    #[arg(long)]
    pub preview: bool,

    /// Show per-display fill and clear phase on the top line.
    #[arg(long)]
    pub hud: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the green palette if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Rain colour palette.
    #[arg(long, default_value = "matrix")]
    pub palette: Palette,

    /// Run the simulation without a terminal and log a summary.
    #[arg(long)]
    pub headless: bool,

    /// Ticks to run with --headless.
    #[arg(long, default_value = "1000", value_name = "N")]
    pub ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Matrix,
    Amber,
    #[value(alias = "blue")]
    Ice,
}

impl Args {
    /// Core tunables taken from the command line; everything else keeps its default.
    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            cell_size: self.cell_size,
            fill_threshold: self.fill_threshold,
            rows_per_clear: self.rows_per_clear,
            flash_ticks: self.flash_ticks,
            ..SimConfig::default()
        }
    }

    /// `--monitors N` as N side-by-side rectangles on whole-cell boundaries.
    /// The last display takes the leftover columns.
    fn split_displays(&self, grid_cols: u32, grid_rows: u32, cell: u32) -> Vec<DeviceRect> {
        let n = u32::from(self.monitors);
        if n <= 1 {
            return Vec::new();
        }
        let per = grid_cols / n;
        (0..n)
            .map(|i| {
                let cols = if i + 1 == n { grid_cols - per * i } else { per };
                DeviceRect::new((per * i * cell) as i32, 0, cols * cell, grid_rows * cell)
            })
            .collect()
    }

    /// Fit the requested displays onto a terminal of `term_cols` x `term_rows`.
    ///
    /// Each grid cell is two terminal columns wide. Explicit `--monitor` rectangles are shifted
    /// so their bounding box starts at the origin, and the cell size grows until that box fits.
    /// With `--target-monitor N` only display N is sized and it gets the whole grid.
    pub fn layout(&self, base: &SimConfig, term_cols: u16, term_rows: u16) -> Result<Layout> {
        let grid_cols = u32::from(term_cols / 2);
        let grid_rows = u32::from(term_rows);
        if grid_cols == 0 || grid_rows == 0 {
            bail!("terminal too small ({term_cols}x{term_rows})");
        }
        let mut config = base.clone();
        let mut rects = Vec::new();

        let mut monitors = self.monitor.as_slice();
        if let Some(n) = self.target_monitor {
            let count = if monitors.is_empty() {
                usize::from(self.monitors)
            } else {
                monitors.len()
            };
            let chosen = if n < count {
                n
            } else {
                warn!("display {n} does not exist; using display 0");
                0
            };
            info!("single-display mode on display {chosen}");
            monitors = monitors.get(chosen..=chosen).unwrap_or_default();
        }

        if let Some(bbox) = DeviceRect::bounding_box(monitors) {
            let fit = bbox
                .width
                .div_ceil(grid_cols)
                .max(bbox.height.div_ceil(grid_rows));
            config.cell_size = config.cell_size.max(fit);
            rects = monitors
                .iter()
                .map(|r| DeviceRect::new(r.x - bbox.x, r.y - bbox.y, r.width, r.height))
                .collect();
        }
        let surface = Surface::new(grid_cols * config.cell_size, grid_rows * config.cell_size);
        if self.target_monitor.is_some() {
            rects.clear();
        } else if rects.is_empty() {
            rects = self.split_displays(grid_cols, grid_rows, config.cell_size);
        }

        Ok(Layout {
            config,
            surface,
            rects,
        })
    }
}
