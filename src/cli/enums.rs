//! CLI enum types for palette options.

use clap::ValueEnum;

use crate::palette::PaletteMode;

/// Palette applied to captured photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Filter {
    /// Original colors
    None,
    /// Four shades of gray
    #[value(name = "2bit")]
    TwoBit,
    /// Four shades of green
    #[value(name = "gameboy")]
    GameBoy,
}

impl From<Filter> for PaletteMode {
    fn from(f: Filter) -> Self {
        match f {
            Filter::None => PaletteMode::None,
            Filter::TwoBit => PaletteMode::TwoBit,
            Filter::GameBoy => PaletteMode::GameBoy,
        }
    }
}
