//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Neon palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours indexed by grid cell value − 1 (T, O, L, J, I, S, Z).
    pub pieces: [Color; 7],
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Inactive / secondary text.
    pub inactive_fg: Color,
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
        Self::neon_default()
    }
}

impl Theme {
    /// Hardcoded neon defaults: pink, cyan, green, magenta, orange, yellow,
    /// blue on a near-black well.
    pub fn neon_default() -> Self {
        Self {
            pieces: [
                parse_hex("#FF0D72").unwrap(), // T / pink
                parse_hex("#0DC2FF").unwrap(), // O / cyan
                parse_hex("#0DFF72").unwrap(), // L / green
                parse_hex("#F538FF").unwrap(), // J / magenta
                parse_hex("#FF8E0D").unwrap(), // I / orange
                parse_hex("#FFE138").unwrap(), // S / yellow
                parse_hex("#3877FF").unwrap(), // Z / blue
            ],
            bg: parse_hex("#0A0A12").unwrap(),
            div_line: parse_hex("#2A2A3A").unwrap(),
            main_fg: parse_hex("#C8C8D8").unwrap(),
            title: parse_hex("#FFE138").unwrap(),
            inactive_fg: parse_hex("#5C6370").unwrap(),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or
    /// `theme[key]='value'`. Falls back to the neon defaults if path is None
    /// or the file is missing/invalid. `palette` selects the colour variant.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Default theme for a palette when no file is loaded.
    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::neon_default();
        t.apply_palette(palette);
        t
    }

    /// Override piece colours for high-contrast or colorblind variants.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.pieces = [
                    parse_hex("#FF0000").unwrap(), // red
                    parse_hex("#FFFF00").unwrap(), // yellow
                    parse_hex("#00FF00").unwrap(), // green
                    parse_hex("#FF00FF").unwrap(), // magenta
                    parse_hex("#FF8800").unwrap(), // orange
                    parse_hex("#00FFFF").unwrap(), // cyan
                    parse_hex("#0088FF").unwrap(), // blue
                ];
            }
            crate::Palette::Colorblind => {
                // Avoid red/green alone; distinct hue + lightness steps
                self.pieces = [
                    parse_hex("#0077BB").unwrap(), // blue
                    parse_hex("#EE7733").unwrap(), // orange
                    parse_hex("#009988").unwrap(), // teal
                    parse_hex("#EE3377").unwrap(), // magenta
                    parse_hex("#33BBEE").unwrap(), // light blue
                    parse_hex("#BBBB00").unwrap(), // yellow
                    parse_hex("#CC3311").unwrap(), // red (distinct from blue/orange)
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        // Keys follow btop theme naming; fallbacks are the neon defaults.
        Self {
            pieces: [
                get("cpu_start").unwrap_or_else(|| parse_hex("#FF0D72").unwrap()),
                get("cpu_mid")
                    .or_else(|| get("hi_fg"))
                    .unwrap_or_else(|| parse_hex("#0DC2FF").unwrap()),
                get("mem_box")
                    .or_else(|| get("cpu_end"))
                    .unwrap_or_else(|| parse_hex("#0DFF72").unwrap()),
                get("net_box").unwrap_or_else(|| parse_hex("#F538FF").unwrap()),
                get("temp_end")
                    .or_else(|| get("proc_misc"))
                    .unwrap_or_else(|| parse_hex("#FF8E0D").unwrap()),
                get("title").unwrap_or_else(|| parse_hex("#FFE138").unwrap()),
                get("cpu_box").unwrap_or_else(|| parse_hex("#3877FF").unwrap()),
            ],
            bg: get("meter_bg").unwrap_or_else(|| parse_hex("#0A0A12").unwrap()),
            div_line: get("div_line").unwrap_or_else(|| parse_hex("#2A2A3A").unwrap()),
            main_fg: get("main_fg").unwrap_or_else(|| parse_hex("#C8C8D8").unwrap()),
            title: get("title").unwrap_or_else(|| parse_hex("#FFE138").unwrap()),
            inactive_fg: get("inactive_fg").unwrap_or_else(|| parse_hex("#5C6370").unwrap()),
        }
    }

    /// Piece colour for a nonzero grid cell value (1..=7).
    #[inline]
    pub fn piece_color(&self, value: u8) -> Color {
        self.pieces[(value.saturating_sub(1) as usize) % 7]
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
    let (r, g, b) = if s.len() == 6 {
        let r =
            u8::from_str_radix(&s[0..2], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let g =
            u8::from_str_radix(&s[2..4], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let b =
            u8::from_str_radix(&s[4..6], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        (r, g, b)
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let g = u8::from_str_radix(&s[1..2], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let b = u8::from_str_radix(&s[2..3], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        (r, g, b)
    } else {
        return Err(ThemeError::InvalidHex(s.to_string()));
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#FF0D72").unwrap();
        assert!(matches!(c, Color::Rgb(0xFF, 0x0D, 0x72)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_piece_color_wraps_by_value() {
        let t = Theme::neon_default();
        assert_eq!(t.piece_color(1), t.pieces[0]);
        assert_eq!(t.piece_color(7), t.pieces[6]);
        assert_eq!(t.piece_color(8), t.pieces[0]);
    }
}
