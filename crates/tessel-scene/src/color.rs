//! RGB colors and the built-in named palette.

use serde::{Deserialize, Serialize};

/// An opaque RGB color. Transparency is carried separately as `alpha`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const PURPLE: Color = Color::rgb(255, 0, 255);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const BROWN: Color = Color::rgb(165, 42, 42);
    pub const PINK: Color = Color::rgb(255, 192, 203);
    pub const LIGHT_GRAY: Color = Color::rgb(211, 211, 211);
    pub const LIGHT_BLUE: Color = Color::rgb(173, 216, 230);
    pub const LIGHT_GREEN: Color = Color::rgb(144, 238, 144);

    /// Every palette entry with its lookup name.
    pub const PALETTE: [(&'static str, Color); 14] = [
        ("white", Color::WHITE),
        ("black", Color::BLACK),
        ("red", Color::RED),
        ("green", Color::GREEN),
        ("blue", Color::BLUE),
        ("yellow", Color::YELLOW),
        ("purple", Color::PURPLE),
        ("orange", Color::ORANGE),
        ("cyan", Color::CYAN),
        ("brown", Color::BROWN),
        ("pink", Color::PINK),
        ("lightgray", Color::LIGHT_GRAY),
        ("lightblue", Color::LIGHT_BLUE),
        ("lightgreen", Color::LIGHT_GREEN),
    ];

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Look up a palette color by name (case-insensitive).
    pub fn named(name: &str) -> Option<Color> {
        Self::PALETTE
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, c)| *c)
    }

    /// The color as RGBA bytes with the given alpha.
    pub fn with_alpha(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}
