//! Four-color palette quantization.
//!
//! Every pixel is reduced to its ITU-R BT.601 luma, bucketed into one of four
//! bands of 64 levels, and replaced with the palette color for that band.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A palette entry (R, G, B).
pub type Rgb = [u8; 3];

/// Grayscale palette, darkest to lightest.
pub const TWO_BIT_PALETTE: [Rgb; 4] = [[0, 0, 0], [85, 85, 85], [170, 170, 170], [255, 255, 255]];

/// Green-tinted handheld palette, darkest to lightest.
pub const GAMEBOY_PALETTE: [Rgb; 4] = [
    [15, 56, 15],
    [48, 98, 48],
    [139, 149, 109],
    [155, 189, 15],
];

/// Palette a frame is quantized with. Also recorded on each saved photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PaletteMode {
    /// Original camera colors, no quantization
    #[serde(rename = "none")]
    None,
    /// Four shades of gray
    #[default]
    #[serde(rename = "2bit")]
    TwoBit,
    /// Four shades of green
    #[serde(rename = "gameboy")]
    GameBoy,
}

impl PaletteMode {
    /// All modes, in the order they are offered to the user.
    pub const ALL: [PaletteMode; 3] = [PaletteMode::TwoBit, PaletteMode::GameBoy, PaletteMode::None];

    /// Parse a mode from its persisted name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "2bit" | "two_bit" | "two-bit" => Some(Self::TwoBit),
            "gameboy" | "game_boy" | "game-boy" => Some(Self::GameBoy),
            _ => None,
        }
    }

    /// Persisted name of the mode.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TwoBit => "2bit",
            Self::GameBoy => "gameboy",
        }
    }

    /// The four colors of this mode, or `None` for the identity mode.
    pub fn palette(self) -> Option<&'static [Rgb; 4]> {
        match self {
            Self::None => None,
            Self::TwoBit => Some(&TWO_BIT_PALETTE),
            Self::GameBoy => Some(&GAMEBOY_PALETTE),
        }
    }
}

impl fmt::Display for PaletteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// Unknown names fall back to the grayscale palette, the capture default.
impl<'de> Deserialize<'de> for PaletteMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name).unwrap_or_default())
    }
}

/// BT.601 luma, rounded to the nearest integer.
///
/// Integer math with coefficients scaled by 1000; adding 500 before the
/// division rounds halves up.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    ((weighted + 500) / 1000) as u8
}

/// Palette index (0-3) for a luma value.
#[inline]
pub fn bucket(luma: u8) -> usize {
    (luma as usize / 64).min(3)
}

/// Quantize interleaved pixel data in place.
///
/// `bytes_per_pixel` is 3 for RGB or 4 for RGBA; the alpha byte is left
/// untouched. With [`PaletteMode::None`] the buffer is not modified.
pub fn quantize(data: &mut [u8], bytes_per_pixel: usize, mode: PaletteMode) {
    let Some(palette) = mode.palette() else {
        return;
    };

    for pixel in data.chunks_exact_mut(bytes_per_pixel) {
        let color = palette[bucket(luma(pixel[0], pixel[1], pixel[2]))];
        pixel[..3].copy_from_slice(&color);
    }
}

/// Quantize a frame in place.
pub fn quantize_frame(frame: &mut crate::camera::Frame, mode: PaletteMode) {
    let bpp = frame.bytes_per_pixel();
    quantize(&mut frame.data, bpp, mode);
}
