//! Neontris — neon classic falling-block puzzle game in the terminal.

mod app;
mod game;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that the engine needs (grid size, drop timing,
/// piece RNG seed).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub cols: u16,
    pub rows: u16,
    pub base_drop_ms: u64,
    pub drop_step_ms: u64,
    pub min_drop_ms: u64,
    pub seed: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let seed = args.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0x1234_5678)
    });
    let config = GameConfig {
        cols: args.width,
        rows: args.height,
        base_drop_ms: args.base_drop_ms,
        drop_step_ms: args.drop_step_ms,
        min_drop_ms: args.min_drop_ms,
        seed,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Neon classic falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "neontris",
    version,
    about = "Neon classic falling-block puzzle in the terminal. Stack pieces, clear full rows to score.",
    long_about = "Neontris is a terminal falling-block puzzle game.\n\n\
        Pieces fall into a well; full horizontal rows vanish and score points. Each cleared row \
        in one landing is worth double the previous one. Every 100 points raises the level and \
        speeds up the fall.\n\n\
        CONTROLS (normal):\n  Left/Right  Move    Up         Rotate      Down       Soft drop\n  Enter/Space Start   P          Pause       Q / Esc    Quit\n\n\
        CONTROLS (vim):\n  h/l         Move    k or i     Rotate      j          Soft drop\n\n\
        Mouse drags on the board work as swipes: sideways to move, down to drop, up to rotate. \
        Use --theme to load a btop-style theme file."
)]
pub struct Args {
    /// Playfield width in columns (grid cells).
    #[arg(long, default_value = "10", value_name = "COLS")]
    pub width: u16,

    /// Playfield height in rows (grid cells).
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: u16,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the neon palette if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Skip the title screen and start playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the line-clear flash animation.
    #[arg(long)]
    pub no_animation: bool,

    /// Drop interval at level 1, in ms.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub base_drop_ms: u64,

    /// How much the drop interval shrinks per level, in ms.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub drop_step_ms: u64,

    /// Floor for the drop interval at high levels, in ms.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub min_drop_ms: u64,

    /// Piece RNG seed for a reproducible sequence (random if not set).
    #[arg(long, value_name = "N")]
    pub seed: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
