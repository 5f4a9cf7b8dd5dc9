//! Named palettes recognized by `set_palette` (spec §6/§2.2).
//!
//! Each named palette overrides the 16 ANSI slots and the default
//! foreground/background/cursor colors; the 256-color cube and greyscale
//! ramp beyond index 15 are shared with the stock xterm table, since none
//! of the named palettes below redefine them.

use crate::color::{ColorPalette, RgbColor};

const fn c(r: u8, g: u8, b: u8) -> RgbColor {
    RgbColor::new(r, g, b)
}

fn with_ansi16(ansi: [RgbColor; 16], foreground: RgbColor, background: RgbColor) -> ColorPalette {
    let mut pal = ColorPalette::xterm();
    pal.colors[0..16].copy_from_slice(&ansi);
    pal.foreground = foreground;
    pal.background = background;
    pal
}

// Solarized's 16-slot ANSI mapping (base03/base02 .. base3 plus the 8
// accent colors), as commonly published for terminal emulators.
const SOLARIZED_BASE03: RgbColor = c(0x00, 0x2b, 0x36);
const SOLARIZED_BASE02: RgbColor = c(0x07, 0x36, 0x42);
const SOLARIZED_BASE01: RgbColor = c(0x58, 0x6e, 0x75);
const SOLARIZED_BASE00: RgbColor = c(0x65, 0x7b, 0x83);
const SOLARIZED_BASE0: RgbColor = c(0x83, 0x94, 0x96);
const SOLARIZED_BASE1: RgbColor = c(0x93, 0xa1, 0xa1);
const SOLARIZED_BASE2: RgbColor = c(0xee, 0xe8, 0xd5);
const SOLARIZED_BASE3: RgbColor = c(0xfd, 0xf6, 0xe3);
const SOLARIZED_YELLOW: RgbColor = c(0xb5, 0x89, 0x00);
const SOLARIZED_ORANGE: RgbColor = c(0xcb, 0x4b, 0x16);
const SOLARIZED_RED: RgbColor = c(0xdc, 0x32, 0x2f);
const SOLARIZED_MAGENTA: RgbColor = c(0xd3, 0x36, 0x82);
const SOLARIZED_VIOLET: RgbColor = c(0x6c, 0x71, 0xc4);
const SOLARIZED_BLUE: RgbColor = c(0x26, 0x8b, 0xd2);
const SOLARIZED_CYAN: RgbColor = c(0x2a, 0xa1, 0x98);
const SOLARIZED_GREEN: RgbColor = c(0x85, 0x99, 0x00);

fn solarized_ansi16() -> [RgbColor; 16] {
    [
        SOLARIZED_BASE02,
        SOLARIZED_RED,
        SOLARIZED_GREEN,
        SOLARIZED_YELLOW,
        SOLARIZED_BLUE,
        SOLARIZED_MAGENTA,
        SOLARIZED_CYAN,
        SOLARIZED_BASE2,
        SOLARIZED_BASE03,
        SOLARIZED_ORANGE,
        SOLARIZED_BASE01,
        SOLARIZED_BASE00,
        SOLARIZED_BASE0,
        SOLARIZED_VIOLET,
        SOLARIZED_BASE1,
        SOLARIZED_BASE3,
    ]
}

fn solarized() -> ColorPalette {
    with_ansi16(solarized_ansi16(), SOLARIZED_BASE0, SOLARIZED_BASE03)
}

fn solarized_black() -> ColorPalette {
    // Same accent colors, pure black background for higher contrast on
    // projectors/low-gamut displays -- the variant libtsm's header lists
    // alongside plain "solarized".
    with_ansi16(solarized_ansi16(), SOLARIZED_BASE0, c(0x00, 0x00, 0x00))
}

fn solarized_white() -> ColorPalette {
    with_ansi16(solarized_ansi16(), SOLARIZED_BASE00, SOLARIZED_BASE3)
}

fn soft_black() -> ColorPalette {
    // A low-contrast dark scheme: soft grey-on-near-black rather than the
    // stock pure white-on-black of the default xterm table.
    let mut ansi = [RgbColor::default(); 16];
    ansi[0..8].copy_from_slice(&[
        c(0x1c, 0x1c, 0x1c),
        c(0xc7, 0x6b, 0x6b),
        c(0x6b, 0xc7, 0x6b),
        c(0xc7, 0xb6, 0x6b),
        c(0x6b, 0x87, 0xc7),
        c(0xb6, 0x6b, 0xc7),
        c(0x6b, 0xc7, 0xc7),
        c(0xc7, 0xc7, 0xc7),
    ]);
    for i in 0..8 {
        let base = ansi[i];
        ansi[8 + i] = c(
            base.red.saturating_add(0x20),
            base.green.saturating_add(0x20),
            base.blue.saturating_add(0x20),
        );
    }
    with_ansi16(ansi, c(0xc7, 0xc7, 0xc7), c(0x12, 0x12, 0x12))
}

// base16 "default" scheme's accent colors.
fn base16_accents() -> [RgbColor; 8] {
    [
        c(0xac, 0x41, 0x42), // red
        c(0xd2, 0x84, 0x45), // orange
        c(0xf4, 0xbf, 0x75), // yellow
        c(0x90, 0xa9, 0x59), // green
        c(0x6a, 0x9f, 0xb5), // blue
        c(0xaa, 0x75, 0x9f), // magenta
        c(0x75, 0xb5, 0xaa), // cyan
        c(0xd0, 0xd0, 0xd0), // white
    ]
}

fn base16_dark() -> ColorPalette {
    let accents = base16_accents();
    let mut ansi = [RgbColor::default(); 16];
    ansi[0] = c(0x15, 0x15, 0x15);
    ansi[1..8].copy_from_slice(&accents[..7]);
    ansi[8] = c(0x50, 0x50, 0x50);
    ansi[9..16].copy_from_slice(&accents[..7]);
    with_ansi16(ansi, c(0xd0, 0xd0, 0xd0), c(0x15, 0x15, 0x15))
}

fn base16_light() -> ColorPalette {
    let accents = base16_accents();
    let mut ansi = [RgbColor::default(); 16];
    ansi[0] = c(0xf5, 0xf5, 0xf5);
    ansi[1..8].copy_from_slice(&accents[..7]);
    ansi[8] = c(0xb0, 0xb0, 0xb0);
    ansi[9..16].copy_from_slice(&accents[..7]);
    with_ansi16(ansi, c(0x20, 0x20, 0x20), c(0xf5, 0xf5, 0xf5))
}

/// Resolves a palette name as accepted by `Vte::set_palette` (spec §6).
/// Returns `None` for `"custom"` (the caller's most recently installed
/// custom table should be used instead, tracked separately by the VTE) and
/// for any unrecognized name, which falls back to the stock xterm table.
pub fn named(name: &str) -> Option<ColorPalette> {
    match name {
        "solarized" => Some(solarized()),
        "solarized-black" => Some(solarized_black()),
        "solarized-white" => Some(solarized_white()),
        "soft-black" => Some(soft_black()),
        "base16-dark" => Some(base16_dark()),
        "base16-light" => Some(base16_light()),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn solarized_background_is_base03() {
        let pal = solarized();
        assert_eq!(pal.background, SOLARIZED_BASE03);
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(named("not-a-palette").is_none());
        assert!(named("custom").is_none());
    }

    #[test]
    fn all_named_resolve() {
        for name in [
            "solarized",
            "solarized-black",
            "solarized-white",
            "soft-black",
            "base16-dark",
            "base16-light",
        ] {
            assert!(named(name).is_some(), "{}", name);
        }
    }
}
