//! Colour palettes shared by the rasteriser and the composer.
//!
//! The composer only needs a palette's accent colour (for the progress bar);
//! the other colours are carried so callers that draw the stills can use the
//! same table.

use crate::timeline::Rgb;

/// One colour set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb,
    pub accent: Rgb,
    pub text: Rgb,
    pub sub: Rgb,
}

/// The fixed palette table.
pub const PALETTES: [Palette; 5] = [
    Palette {
        background: Rgb(8, 8, 20),
        accent: Rgb(120, 80, 255),
        text: Rgb(255, 255, 255),
        sub: Rgb(180, 160, 255),
    },
    Palette {
        background: Rgb(5, 15, 10),
        accent: Rgb(0, 220, 120),
        text: Rgb(255, 255, 255),
        sub: Rgb(150, 255, 200),
    },
    Palette {
        background: Rgb(20, 5, 5),
        accent: Rgb(255, 60, 60),
        text: Rgb(255, 255, 255),
        sub: Rgb(255, 160, 160),
    },
    Palette {
        background: Rgb(5, 10, 25),
        accent: Rgb(0, 180, 255),
        text: Rgb(255, 255, 255),
        sub: Rgb(140, 210, 255),
    },
    Palette {
        background: Rgb(15, 10, 5),
        accent: Rgb(255, 160, 0),
        text: Rgb(255, 255, 255),
        sub: Rgb(255, 210, 120),
    },
];

/// Look up a palette; indices wrap around the table.
pub fn palette(index: usize) -> &'static Palette {
    &PALETTES[index % PALETTES.len()]
}

/// The palette to use after `last`, so consecutive runs never repeat colours.
///
/// The caller owns the rotation state and persists it however it likes.
pub fn next_palette_index(last: usize) -> usize {
    (last + 1) % PALETTES.len()
}
