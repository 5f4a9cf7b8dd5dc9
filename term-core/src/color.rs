//! Color attributes: the indexed/default/RGB sentinel model a `Cell`
//! carries, and the 256-entry palette it is resolved against at draw time.

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        RgbColor { red, green, blue }
    }
}

/// A cell's stored foreground/background value. `PaletteIndex` covers both
/// the 16 ANSI colors and the 256-color cube/greyscale extension; `Rgb` is
/// the 24-bit direct-color form (SGR `38;2;r;g;b` / `48;2;r;g;b`). The
/// `Default` variant is the sentinel spec.md describes as "indexed color
/// code of -1" — resolved to whichever of the palette's `foreground`/
/// `background` applies.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ColorAttribute {
    Default,
    PaletteIndex(u8),
    Rgb(RgbColor),
}

impl Default for ColorAttribute {
    fn default() -> Self {
        ColorAttribute::Default
    }
}

/// 256-entry resolved color table plus the default fg/bg/cursor colors a
/// `ColorAttribute::Default` resolves against.
#[derive(Clone)]
pub struct ColorPalette {
    pub colors: [RgbColor; 256],
    pub foreground: RgbColor,
    pub background: RgbColor,
    pub cursor: RgbColor,
}

impl ColorPalette {
    pub fn resolve_fg(&self, color: ColorAttribute) -> RgbColor {
        match color {
            ColorAttribute::Default => self.foreground,
            ColorAttribute::PaletteIndex(idx) => self.colors[idx as usize],
            ColorAttribute::Rgb(c) => c,
        }
    }

    pub fn resolve_bg(&self, color: ColorAttribute) -> RgbColor {
        match color {
            ColorAttribute::Default => self.background,
            ColorAttribute::PaletteIndex(idx) => self.colors[idx as usize],
            ColorAttribute::Rgb(c) => c,
        }
    }

    /// Overrides a single indexed slot (OSC `4;n;#RRGGBB`).
    pub fn set_index(&mut self, idx: u8, color: RgbColor) {
        self.colors[idx as usize] = color;
    }

    fn with_colors(colors: [RgbColor; 256]) -> Self {
        ColorPalette {
            colors,
            // Matches TSM_COLOR_FOREGROUND/TSM_COLOR_BACKGROUND's
            // documented default values.
            foreground: RgbColor::new(0x18, 0x18, 0x18),
            background: RgbColor::new(0xd8, 0xd8, 0xd8),
            cursor: RgbColor::new(0x52, 0xad, 0x70),
        }
    }

    /// The standard xterm 256-color cube: 16 ANSI colors, a 6x6x6 color
    /// cube, and a 24-step greyscale ramp.
    pub fn xterm() -> Self {
        let mut colors = [RgbColor::default(); 256];

        // The default 16-entry terminal palette, matching the values
        // documented for `set_custom_palette` in the original header this
        // spec was distilled from (TSM_COLOR_BLACK..TSM_COLOR_WHITE).
        static ANSI: [RgbColor; 16] = [
            RgbColor::new(0x00, 0x00, 0x00), // Black
            RgbColor::new(0xab, 0x46, 0x42), // Red
            RgbColor::new(0xa1, 0xb5, 0x6c), // Green
            RgbColor::new(0xf7, 0xca, 0x88), // Yellow
            RgbColor::new(0x7c, 0xaf, 0xc2), // Blue
            RgbColor::new(0xba, 0x8b, 0xaf), // Magenta
            RgbColor::new(0x86, 0xc1, 0xb9), // Cyan
            RgbColor::new(0xaa, 0xaa, 0xaa), // Light grey
            RgbColor::new(0x55, 0x55, 0x55), // Dark grey
            RgbColor::new(0xab, 0x46, 0x42), // Light red
            RgbColor::new(0xa1, 0xb5, 0x6c), // Light green
            RgbColor::new(0xf7, 0xca, 0x88), // Light yellow
            RgbColor::new(0x7c, 0xaf, 0xc2), // Light blue
            RgbColor::new(0xba, 0x8b, 0xaf), // Light magenta
            RgbColor::new(0x86, 0xc1, 0xb9), // Light cyan
            RgbColor::new(0xff, 0xff, 0xff), // White
        ];
        colors[0..16].copy_from_slice(&ANSI);

        static RAMP6: [u8; 6] = [0x00, 0x33, 0x66, 0x99, 0xCC, 0xFF];
        for idx in 0..216 {
            let red = RAMP6[idx % 6];
            let green = RAMP6[idx / 6 % 6];
            let blue = RAMP6[idx / 6 / 6 % 6];
            colors[16 + idx] = RgbColor::new(red, green, blue);
        }

        static GREYS: [u8; 24] = [
            0x08, 0x12, 0x1c, 0x26, 0x30, 0x3a, 0x44, 0x4e, 0x58, 0x62, 0x6c, 0x76, 0x80, 0x8a,
            0x94, 0x9e, 0xa8, 0xb2, 0xbc, 0xc6, 0xd0, 0xda, 0xe4, 0xee,
        ];
        for (idx, &grey) in GREYS.iter().enumerate() {
            colors[232 + idx] = RgbColor::new(grey, grey, grey);
        }

        Self::with_colors(colors)
    }
}

impl Default for ColorPalette {
    fn default() -> ColorPalette {
        ColorPalette::xterm()
    }
}

impl std::fmt::Debug for ColorPalette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorPalette")
            .field("foreground", &self.foreground)
            .field("background", &self.background)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_resolves_to_fg_bg() {
        let pal = ColorPalette::xterm();
        assert_eq!(pal.resolve_fg(ColorAttribute::Default), pal.foreground);
        assert_eq!(pal.resolve_bg(ColorAttribute::Default), pal.background);
    }

    #[test]
    fn red_is_index_one() {
        let pal = ColorPalette::xterm();
        assert_eq!(
            pal.resolve_fg(ColorAttribute::PaletteIndex(1)),
            RgbColor::new(0xab, 0x46, 0x42)
        );
    }
}
