//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use matrixtris::Rgb;
use matrixtris::pieces::PIECE_COLORS;
use matrixtris::stream::GRADIENT_LEN;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Rain gradient, bright tip to near-black.
const MATRIX_RAIN: [&str; GRADIENT_LEN] = [
    "#DAFFE4", "#78FFA0", "#3CFF78", "#14FA5A", "#00E64B", "#00C83C", "#00A530", "#008224",
    "#005F1A", "#004112", "#002A0B", "#001C07",
];

const AMBER_RAIN: [&str; GRADIENT_LEN] = [
    "#FFF2D0", "#FFD880", "#FFC040", "#FFAA10", "#F09000", "#D07800", "#A86000", "#804800",
    "#603400", "#402200", "#2A1600", "#1C0E00",
];

const ICE_RAIN: [&str; GRADIENT_LEN] = [
    "#E0F8FF", "#A0E8FF", "#60D4FF", "#30C0FF", "#10A8F0", "#0090D0", "#0074A8", "#005A84",
    "#004262", "#002C42", "#001C2C", "#00121C",
];

/// Colours for every layer the renderer draws.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Screen background.
    pub bg: Color,
    /// Leading glyph of a stream.
    pub tip: Color,
    /// The two glyphs behind the tip.
    pub head: Color,
    pub rain: [Color; GRADIENT_LEN],
    /// Clear-band highlight at full strength; scaled down as the flash runs out.
    pub flash: Color,
    pub hud_fg: Color,
    pub div_line: Color,
    /// Piece colours, catalog order I O T S Z J L.
    pub pieces: [Color; 7],
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::matrix_default()
    }
}

fn rgb(c: Rgb) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

fn gradient(hexes: &[&str; GRADIENT_LEN]) -> [Color; GRADIENT_LEN] {
    hexes.map(|h| parse_hex(h).unwrap_or(Color::Green))
}

const PIECE_KEYS: [&str; 7] = [
    "piece_i", "piece_o", "piece_t", "piece_s", "piece_z", "piece_j", "piece_l",
];

impl Theme {
    /// Classic green-on-black.
    pub fn matrix_default() -> Self {
        Self {
            bg: Color::Rgb(0, 0, 0),
            tip: Color::Rgb(240, 255, 245),
            head: Color::Rgb(200, 255, 215),
            rain: gradient(&MATRIX_RAIN),
            flash: Color::Rgb(0, 255, 85),
            hud_fg: Color::Rgb(120, 255, 160),
            div_line: Color::Rgb(0, 95, 26),
            pieces: PIECE_COLORS.map(rgb),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Missing keys keep the palette's defaults; a missing path means no file at all.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::default_for_palette(palette);
        theme.apply_map(&map);
        Ok(theme)
    }

    pub fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::matrix_default();
        t.apply_palette(palette);
        t
    }

    /// Recolour the rain for the chosen palette. Landed pieces keep their own colours.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        let (rain, tip, head, flash) = match palette {
            crate::Palette::Matrix => return,
            crate::Palette::Amber => (&AMBER_RAIN, "#FFFAF0", "#FFE8B0", "#FFAA00"),
            crate::Palette::Ice => (&ICE_RAIN, "#F4FCFF", "#C8F0FF", "#00C8FF"),
        };
        self.rain = gradient(rain);
        self.tip = parse_hex(tip).unwrap_or(self.tip);
        self.head = parse_hex(head).unwrap_or(self.head);
        self.flash = parse_hex(flash).unwrap_or(self.flash);
        self.hud_fg = self.rain[1];
        self.div_line = self.rain[8];
    }

    fn apply_map(&mut self, map: &HashMap<String, String>) {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        if let Some(c) = get("main_bg") {
            self.bg = c;
        }
        if let Some(c) = get("tip") {
            self.tip = c;
        }
        if let Some(c) = get("head") {
            self.head = c;
        }
        for (i, slot) in self.rain.iter_mut().enumerate() {
            if let Some(c) = get(&format!("rain{i}")) {
                *slot = c;
            }
        }
        if let Some(c) = get("flash") {
            self.flash = c;
        }
        if let Some(c) = get("hud_fg") {
            self.hud_fg = c;
        }
        if let Some(c) = get("div_line") {
            self.div_line = c;
        }
        for (slot, key) in self.pieces.iter_mut().zip(PIECE_KEYS) {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
    }

    /// Piece colours as the simulation stores them in landed cells.
    pub fn piece_palette(&self) -> [Rgb; 7] {
        let mut out = PIECE_COLORS;
        for (slot, color) in out.iter_mut().zip(self.pieces) {
            if let Color::Rgb(r, g, b) = color {
                *slot = Rgb(r, g, b);
            }
        }
        out
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let (r, g, b) = if s.len() == 6 {
        let r = u8::from_str_radix(&s[0..2], 16).map_err(|_| bad())?;
        let g = u8::from_str_radix(&s[2..4], 16).map_err(|_| bad())?;
        let b = u8::from_str_radix(&s[4..6], 16).map_err(|_| bad())?;
        (r, g, b)
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16).map_err(|_| bad())? * 17;
        let g = u8::from_str_radix(&s[1..2], 16).map_err(|_| bad())? * 17;
        let b = u8::from_str_radix(&s[2..3], 16).map_err(|_| bad())? * 17;
        (r, g, b)
    } else {
        return Err(bad());
    };
    Ok(Color::Rgb(r, g, b))
}

/// Scale a colour by `level / 255`. Non-RGB colours pass through.
pub fn scale(color: Color, level: u8) -> Color {
    match color {
        Color::Rgb(r, g, b) => rgb(Rgb(r, g, b).dim(level)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[main_bg]="#000000""##);
        assert_eq!(map.get("main_bg"), Some(&"#000000".to_string()));
    }

    #[test]
    fn test_default_gradient_matches_rain() {
        let t = Theme::default();
        assert_eq!(t.rain[0], Color::Rgb(218, 255, 228));
        assert_eq!(t.rain[11], Color::Rgb(0, 28, 7));
        assert_eq!(t.piece_palette(), PIECE_COLORS);
    }

    #[test]
    fn test_theme_file_overrides_keys() {
        let map = parse_theme_file(
            "# comment\ntheme[rain3]=\"#010203\"\ntheme[piece_t]='#0A0B0C'\ntheme[flash]=\"nope\"\n",
        );
        let mut t = Theme::default();
        t.apply_map(&map);
        assert_eq!(t.rain[3], Color::Rgb(1, 2, 3));
        assert_eq!(t.piece_palette()[2], Rgb(10, 11, 12));
        // Unparsable value keeps the default.
        assert_eq!(t.flash, Color::Rgb(0, 255, 85));
    }

    #[test]
    fn test_palettes_recolor_rain_only() {
        let amber = Theme::default_for_palette(crate::Palette::Amber);
        assert_ne!(amber.rain, Theme::default().rain);
        assert_eq!(amber.pieces, Theme::default().pieces);
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(Color::Rgb(200, 100, 0), 0), Color::Rgb(0, 0, 0));
        assert_eq!(scale(Color::Rgb(200, 100, 0), 255), Color::Rgb(200, 100, 0));
        assert_eq!(scale(Color::Reset, 10), Color::Reset);
    }
}
