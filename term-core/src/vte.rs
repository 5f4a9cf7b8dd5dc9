//! The VTE: drives a [`vtparse::VTParser`] against a [`Screen`], translating
//! dispatched escape sequences into screen operations (spec §4.4).

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use log::debug;
use vtparse::{CsiParam, VTActor, VTParser};

use crate::cell::CellAttrs;
use crate::charset::{Charset, CharsetSlot, CharsetState};
use crate::color::{ColorAttribute, ColorPalette, RgbColor};
use crate::mouse::{MouseEncoder, MouseMode};
use crate::screen::{EraseRange, Screen, ScreenFlags};

bitflags! {
    /// Bit positions match `TSM_VTE_FLAG_*` in the original public header.
    pub struct VteFlags: u32 {
        const CURSOR_KEY_MODE              = 0x0000_0001;
        const KEYPAD_APPLICATION_MODE      = 0x0000_0002;
        const LINE_FEED_NEW_LINE_MODE      = 0x0000_0004;
        const EIGHT_BIT_MODE               = 0x0000_0008;
        const SEVEN_BIT_MODE               = 0x0000_0010;
        const USE_C1                       = 0x0000_0020;
        const KEYBOARD_ACTION_MODE         = 0x0000_0040;
        const INSERT_REPLACE_MODE          = 0x0000_0080;
        const SEND_RECEIVE_MODE            = 0x0000_0100;
        const TEXT_CURSOR_MODE             = 0x0000_0200;
        const INVERSE_SCREEN_MODE          = 0x0000_0400;
        const ORIGIN_MODE                  = 0x0000_0800;
        const AUTO_WRAP_MODE               = 0x0000_1000;
        const AUTO_REPEAT_MODE             = 0x0000_2000;
        const NATIONAL_CHARSET_MODE        = 0x0000_4000;
        const BACKGROUND_COLOR_ERASE_MODE  = 0x0000_8000;
        const PREPEND_ESCAPE               = 0x0001_0000;
        const TITE_INHIBIT_MODE            = 0x0002_0000;
    }
}

#[derive(Debug, Clone)]
struct SavedCursor {
    x: usize,
    y: usize,
    attrs: CellAttrs,
    charset: CharsetState,
    origin_mode: bool,
}

/// Arguments to the write-out callback: bytes the embedder should send
/// verbatim to the child process (keyboard/mouse reports, DSR/DA replies).
pub type WriteCallback = Box<dyn FnMut(&[u8])>;
/// Arguments to the OSC callback: the raw semicolon-delimited fields.
pub type OscCallback = Box<dyn FnMut(&[&[u8]])>;
/// Fires whenever the effective mouse tracking mode or coordinate kind
/// changes, so the embedder can install/remove pointer hooks.
pub type MouseModeCallback = Box<dyn FnMut(MouseMode)>;

/// Kernel-style severities for the optional caller-supplied log callback.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Stored per-instance rather than globally: hosts that don't wire up
/// `log`'s global logger can still observe malformed-sequence diagnostics
/// and mode-change notices this way. When absent, `log`'s facade macros are
/// the only sink.
pub type LogCallback = Box<dyn FnMut(LogLevel, &str)>;

pub struct Vte {
    screen: Rc<RefCell<Screen>>,
    parser: VTParser,
    charset: CharsetState,
    palette: ColorPalette,
    custom_palette: Option<ColorPalette>,
    flags: VteFlags,
    saved_cursor: Option<SavedCursor>,
    mouse: MouseEncoder,
    write_cb: WriteCallback,
    osc_cb: Option<OscCallback>,
    mouse_mode_cb: Option<MouseModeCallback>,
    log_cb: Option<LogCallback>,
}

impl Vte {
    pub fn new(screen: Rc<RefCell<Screen>>, write_cb: WriteCallback) -> Self {
        Vte {
            screen,
            parser: VTParser::new(),
            charset: CharsetState::default(),
            palette: ColorPalette::xterm(),
            custom_palette: None,
            flags: VteFlags::AUTO_WRAP_MODE | VteFlags::TEXT_CURSOR_MODE | VteFlags::AUTO_REPEAT_MODE,
            saved_cursor: None,
            mouse: MouseEncoder::default(),
            write_cb,
            osc_cb: None,
            mouse_mode_cb: None,
            log_cb: None,
        }
    }

    pub fn set_osc_callback(&mut self, cb: OscCallback) {
        self.osc_cb = Some(cb);
    }

    pub fn set_mouse_mode_callback(&mut self, cb: MouseModeCallback) {
        self.mouse_mode_cb = Some(cb);
    }

    pub fn set_log_callback(&mut self, cb: LogCallback) {
        self.log_cb = Some(cb);
    }

    /// Emits through `log`'s facade and, if installed, the caller's own
    /// callback. `log` remains the only sink when no callback is set.
    fn log(&mut self, level: LogLevel, msg: std::fmt::Arguments) {
        match level {
            LogLevel::Debug => debug!("{}", msg),
            LogLevel::Info => log::info!("{}", msg),
            LogLevel::Warn => log::warn!("{}", msg),
            LogLevel::Error => log::error!("{}", msg),
        }
        if let Some(cb) = self.log_cb.as_mut() {
            cb(level, &msg.to_string());
        }
    }

    pub fn screen(&self) -> Rc<RefCell<Screen>> {
        self.screen.clone()
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn flags(&self) -> VteFlags {
        self.flags
    }

    pub fn mouse_encoder_mut(&mut self) -> &mut MouseEncoder {
        &mut self.mouse
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.mouse.effective_mode()
    }

    /// Writes bytes to the configured write callback directly, bypassing
    /// the parser. Used for keyboard/mouse report bytes, which never
    /// re-enter the VTE as input.
    pub fn write_direct(&mut self, bytes: &[u8]) {
        self.write_out(bytes);
    }

    /// Feeds a chunk of input bytes through the parser. Splitting a byte
    /// stream across calls at any boundary and feeding the pieces in order
    /// produces the same screen state and write-out as one call (spec §5
    /// "Ordering").
    pub fn input(&mut self, bytes: &[u8]) {
        let mut parser = std::mem::replace(&mut self.parser, VTParser::new());
        parser.parse(bytes, self);
        self.parser = parser;
    }

    fn write_out(&mut self, bytes: &[u8]) {
        (self.write_cb)(bytes);
    }

    /// Applies a named palette (spec §6 "Palette names"), or restores the
    /// custom palette most recently installed via `set_palette_entry`'s
    /// bulk sibling when `name` is `"custom"`.
    pub fn set_palette(&mut self, name: &str) -> crate::error::Result<()> {
        if name == "custom" {
            let custom = self.custom_palette.clone();
            match custom {
                Some(p) => {
                    self.palette = p;
                    Ok(())
                }
                None => Err(crate::error::Error::NotFound),
            }
        } else {
            match crate::palette::named(name) {
                Some(p) => {
                    self.palette = p;
                    Ok(())
                }
                None => Err(crate::error::Error::NotFound),
            }
        }
    }

    pub fn install_custom_palette(&mut self, palette: ColorPalette) {
        self.custom_palette = Some(palette.clone());
        self.palette = palette;
    }

    fn mode_changed(&mut self) {
        let mode = self.mouse.effective_mode();
        if let Some(cb) = self.mouse_mode_cb.as_mut() {
            cb(mode);
        }
    }

    // --- CSI dispatch -----------------------------------------------

    fn param(params: &[i64], idx: usize, default: i64) -> i64 {
        match params.get(idx) {
            Some(&0) | None => default,
            Some(&v) => v,
        }
    }

    fn csi(&mut self, params: &[CsiParam], byte: u8) {
        let has_private_marker = matches!(params.first(), Some(CsiParam::P(b'?')));
        let ints: Vec<i64> = params
            .iter()
            .filter_map(|p| p.as_integer())
            .collect();

        match (has_private_marker, byte) {
            (false, b'A') => self.screen_mut().move_cursor_rel(0, -Self::param(&ints, 0, 1)),
            (false, b'B') => self.screen_mut().move_cursor_rel(0, Self::param(&ints, 0, 1)),
            (false, b'C') => self.screen_mut().move_cursor_rel(Self::param(&ints, 0, 1), 0),
            (false, b'D') => self.screen_mut().move_cursor_rel(-Self::param(&ints, 0, 1), 0),
            (false, b'E') => {
                let n = Self::param(&ints, 0, 1);
                self.screen_mut().move_down_scrolling(n.max(0) as usize);
                let y = self.screen_mut().cursor().1;
                self.screen_mut().move_cursor_to(0, y);
            }
            (false, b'F') => {
                let n = Self::param(&ints, 0, 1);
                self.screen_mut().move_up_scrolling(n.max(0) as usize);
                let y = self.screen_mut().cursor().1;
                self.screen_mut().move_cursor_to(0, y);
            }
            (false, b'G') | (false, b'`') => {
                let x = Self::param(&ints, 0, 1).max(1) as usize - 1;
                let y = self.screen_mut().cursor().1;
                self.screen_mut().move_cursor_to(x, y);
            }
            (false, b'H') | (false, b'f') => {
                let row = Self::param(&ints, 0, 1).max(1) as usize - 1;
                let col = Self::param(&ints, 1, 1).max(1) as usize - 1;
                self.screen_mut().move_cursor_to(col, row);
            }
            (false, b'd') => {
                let row = Self::param(&ints, 0, 1).max(1) as usize - 1;
                let x = self.screen_mut().cursor().0;
                self.screen_mut().move_cursor_to(x, row);
            }
            (false, b'J') => {
                let range = match Self::param(&ints, 0, 0) {
                    0 => EraseRange::CursorToScreen,
                    1 => EraseRange::ScreenToCursor,
                    _ => EraseRange::WholeScreen,
                };
                self.screen_mut().erase(range, false);
            }
            (false, b'K') => {
                let range = match Self::param(&ints, 0, 0) {
                    0 => EraseRange::CursorToEndOfLine,
                    1 => EraseRange::HomeToCursorOnLine,
                    _ => EraseRange::CurrentLine,
                };
                self.screen_mut().erase(range, false);
            }
            (false, b'L') => {
                let n = Self::param(&ints, 0, 1).max(0) as usize;
                self.screen_mut().insert_lines(n);
            }
            (false, b'M') => {
                let n = Self::param(&ints, 0, 1).max(0) as usize;
                self.screen_mut().delete_lines(n);
            }
            (false, b'@') => {
                let n = Self::param(&ints, 0, 1).max(0) as usize;
                self.screen_mut().insert_chars(n);
            }
            (false, b'P') => {
                let n = Self::param(&ints, 0, 1).max(0) as usize;
                self.screen_mut().delete_chars(n);
            }
            (false, b'S') => {
                let n = Self::param(&ints, 0, 1).max(0) as usize;
                self.screen_mut().scroll_up_within_margins(n);
            }
            (false, b'T') => {
                let n = Self::param(&ints, 0, 1).max(0) as usize;
                self.screen_mut().scroll_down_within_margins(n);
            }
            (false, b'g') => match Self::param(&ints, 0, 0) {
                0 => self.screen_mut().clear_tab_stop(),
                3 => self.screen_mut().clear_all_tab_stops(),
                _ => {}
            },
            (false, b'r') => {
                let top = Self::param(&ints, 0, 1).max(1) as usize - 1;
                let bottom = Self::param(&ints, 1, self.screen_mut().size().1 as i64) as usize;
                self.screen_mut().set_margins(top, bottom);
            }
            (false, b'm') => self.sgr(&params_to_sgr(params)),
            (false, b'n') => self.dsr(Self::param(&ints, 0, 0)),
            (false, b'c') => self.write_out(b"\x1b[?62;1;6c"),
            (true, b'h') => self.dec_private_mode(&ints, true),
            (true, b'l') => self.dec_private_mode(&ints, false),
            (false, b'h') => self.ansi_mode(&ints, true),
            (false, b'l') => self.ansi_mode(&ints, false),
            _ => {
                self.log(
                    LogLevel::Debug,
                    format_args!("unhandled CSI final byte {:?} params {:?}", byte as char, ints),
                );
            }
        }
    }

    fn screen_mut(&self) -> std::cell::RefMut<'_, Screen> {
        self.screen.borrow_mut()
    }

    fn dsr(&mut self, code: i64) {
        match code {
            5 => self.write_out(b"\x1b[0n"),
            6 => {
                let (x, y) = self.screen_mut().cursor();
                let reply = format!("\x1b[{};{}R", y + 1, x + 1);
                self.write_out(reply.as_bytes());
            }
            _ => {}
        }
    }

    fn ansi_mode(&mut self, params: &[i64], set: bool) {
        for &p in params {
            if p == 4 {
                self.screen_mut().set_flag(ScreenFlags::INSERT_MODE, set);
                self.flags.set(VteFlags::INSERT_REPLACE_MODE, set);
            } else if p == 20 {
                self.flags.set(VteFlags::LINE_FEED_NEW_LINE_MODE, set);
            }
        }
    }

    fn dec_private_mode(&mut self, params: &[i64], set: bool) {
        for &p in params {
            match p {
                1 => self.flags.set(VteFlags::CURSOR_KEY_MODE, set),
                5 => {
                    self.screen_mut().set_flag(ScreenFlags::INVERSE, set);
                    self.flags.set(VteFlags::INVERSE_SCREEN_MODE, set);
                }
                6 => {
                    self.screen_mut().set_flag(ScreenFlags::REL_ORIGIN, set);
                    self.flags.set(VteFlags::ORIGIN_MODE, set);
                    self.screen_mut().move_cursor_to(0, 0);
                }
                7 => {
                    self.screen_mut().set_flag(ScreenFlags::AUTO_WRAP, set);
                    self.flags.set(VteFlags::AUTO_WRAP_MODE, set);
                }
                8 => self.flags.set(VteFlags::AUTO_REPEAT_MODE, set),
                9 => self.mouse.set_mode(if set { Some(MouseMode::X10) } else { None }),
                25 => {
                    self.screen_mut().set_flag(ScreenFlags::HIDE_CURSOR, !set);
                    self.flags.set(VteFlags::TEXT_CURSOR_MODE, set);
                }
                47 | 1047 => self.switch_alternate(set, p == 1047),
                1000 => self.mouse.set_mode(if set { Some(MouseMode::Normal) } else { None }),
                1002 => self.mouse.set_mode(if set { Some(MouseMode::ButtonEvent) } else { None }),
                1003 => self.mouse.set_mode(if set { Some(MouseMode::AnyEvent) } else { None }),
                1005 => self.mouse.set_utf8(set),
                1006 => self.mouse.set_sgr(set),
                1016 => self.mouse.set_sgr_pixels(set),
                1049 => {
                    if set {
                        self.push_saved_cursor();
                        self.switch_alternate(true, true);
                    } else {
                        self.switch_alternate(false, true);
                        self.pop_saved_cursor();
                    }
                }
                2004 => {} // bracketed paste: tracked by the embedder, not the core.
                _ => self.log(LogLevel::Debug, format_args!("unhandled DEC private mode {}", p)),
            }
        }
        self.mode_changed();
    }

    fn switch_alternate(&mut self, enable: bool, clear: bool) {
        if self.flags.contains(VteFlags::TITE_INHIBIT_MODE) && enable {
            return;
        }
        self.screen_mut().set_alternate(enable, clear);
    }

    fn push_saved_cursor(&mut self) {
        let (x, y) = self.screen_mut().cursor();
        self.saved_cursor = Some(SavedCursor {
            x,
            y,
            attrs: self.screen_mut().def_attr(),
            charset: self.charset.clone(),
            origin_mode: self.flags.contains(VteFlags::ORIGIN_MODE),
        });
    }

    fn pop_saved_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor.take() {
            self.screen_mut().move_cursor_to(saved.x, saved.y);
            self.screen_mut().set_def_attr(saved.attrs);
            self.charset = saved.charset;
            self.flags.set(VteFlags::ORIGIN_MODE, saved.origin_mode);
            self.screen_mut()
                .set_flag(ScreenFlags::REL_ORIGIN, saved.origin_mode);
        }
    }

    fn sgr(&mut self, params: &[i64]) {
        let mut screen = self.screen_mut();
        let mut attrs = screen.def_attr();
        let mut i = 0;
        if params.is_empty() {
            attrs = CellAttrs::default();
        }
        while i < params.len() {
            match params[i] {
                0 => attrs = CellAttrs::default(),
                1 => attrs.set_bold(true),
                3 => attrs.set_italic(true),
                4 => attrs.set_underline(true),
                5 => attrs.set_blink(true),
                7 => attrs.set_inverse(true),
                22 => attrs.set_bold(false),
                23 => attrs.set_italic(false),
                24 => attrs.set_underline(false),
                25 => attrs.set_blink(false),
                27 => attrs.set_inverse(false),
                30..=37 => attrs.foreground = ColorAttribute::PaletteIndex((params[i] - 30) as u8),
                39 => attrs.foreground = ColorAttribute::Default,
                40..=47 => attrs.background = ColorAttribute::PaletteIndex((params[i] - 40) as u8),
                49 => attrs.background = ColorAttribute::Default,
                90..=97 => attrs.foreground = ColorAttribute::PaletteIndex((params[i] - 90 + 8) as u8),
                100..=107 => attrs.background = ColorAttribute::PaletteIndex((params[i] - 100 + 8) as u8),
                38 | 48 => {
                    let (color, consumed) = parse_extended_color(&params[i + 1..]);
                    if let Some(c) = color {
                        if params[i] == 38 {
                            attrs.foreground = c;
                        } else {
                            attrs.background = c;
                        }
                    }
                    i += consumed;
                }
                _ => {}
            }
            i += 1;
        }
        screen.set_def_attr(attrs);
    }

    fn osc(&mut self, params: &[&[u8]]) {
        if let Some(cb) = self.osc_cb.as_mut() {
            cb(params);
        }
        let Some(first) = params.first() else { return };
        let Ok(code) = std::str::from_utf8(first).unwrap_or("").parse::<u32>() else {
            return;
        };
        match code {
            0 | 1 | 2 => {} // window/icon title: forwarded to the callback only.
            4 => {
                // `4;n;#RRGGBB` (repeatable pairs).
                let mut idx = 1;
                while idx + 1 < params.len() {
                    if let (Ok(n), Some(rgb)) = (
                        std::str::from_utf8(params[idx]).unwrap_or("").parse::<u8>(),
                        parse_hash_rgb(params[idx + 1]),
                    ) {
                        self.palette.set_index(n, rgb);
                    }
                    idx += 2;
                }
            }
            10 => {
                if let Some(rgb) = params.get(1).and_then(|p| parse_hash_rgb(p)) {
                    self.palette.foreground = rgb;
                }
            }
            11 => {
                if let Some(rgb) = params.get(1).and_then(|p| parse_hash_rgb(p)) {
                    self.palette.background = rgb;
                }
            }
            104 => self.palette = self.custom_palette.clone().unwrap_or_else(ColorPalette::xterm),
            _ => self.log(LogLevel::Debug, format_args!("unhandled OSC code {}", code)),
        }
    }

    fn esc(&mut self, intermediates: &[u8], byte: u8) {
        match (intermediates, byte) {
            ([], b'7') => self.push_saved_cursor(),
            ([], b'8') => self.pop_saved_cursor(),
            ([], b'c') => self.screen_mut().reset(),
            ([], b'D') => self.screen_mut().move_down_scrolling(1),
            ([], b'M') => self.screen_mut().move_up_scrolling(1),
            ([], b'E') => {
                self.screen_mut().move_down_scrolling(1);
                let y = self.screen_mut().cursor().1;
                self.screen_mut().move_cursor_to(0, y);
            }
            ([b'('], _) => self.charset.designate(CharsetSlot::G0, scs_charset(byte)),
            ([b')'], _) => self.charset.designate(CharsetSlot::G1, scs_charset(byte)),
            ([b'*'], _) => self.charset.designate(CharsetSlot::G2, scs_charset(byte)),
            ([b'+'], _) => self.charset.designate(CharsetSlot::G3, scs_charset(byte)),
            ([], b'n') => self.charset.invoke_gl(CharsetSlot::G2),
            ([], b'o') => self.charset.invoke_gl(CharsetSlot::G3),
            ([], b'N') => self.charset.single_shift(CharsetSlot::G2),
            ([], b'O') => self.charset.single_shift(CharsetSlot::G3),
            _ => self.log(
                LogLevel::Debug,
                format_args!("unhandled ESC sequence {:?} {:?}", intermediates, byte as char),
            ),
        }
    }

    fn c0(&mut self, control: u8) {
        match control {
            0x07 => {} // BEL: no built-in bell action; the embedder observes via its own hook.
            0x08 => self.screen_mut().backspace(),
            0x09 => {
                self.screen_mut().tab_right(1);
            }
            0x0A | 0x0B | 0x0C => {
                self.screen_mut().newline();
                if self.flags.contains(VteFlags::LINE_FEED_NEW_LINE_MODE) {
                    self.screen_mut().carriage_return();
                }
            }
            0x0D => self.screen_mut().carriage_return(),
            0x0E => self.charset.invoke_gl(CharsetSlot::G1),
            0x0F => self.charset.invoke_gl(CharsetSlot::G0),
            _ => {}
        }
    }
}

fn scs_charset(byte: u8) -> Charset {
    match byte {
        b'0' => Charset::DecSpecialGraphics,
        b'A' => Charset::Uk,
        _ => Charset::Ascii,
    }
}

fn parse_hash_rgb(bytes: &[u8]) -> Option<RgbColor> {
    let s = std::str::from_utf8(bytes).ok()?;
    let s = s.strip_prefix('#')?;
    if s.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&s[0..2], 16).ok()?;
    let g = u8::from_str_radix(&s[2..4], 16).ok()?;
    let b = u8::from_str_radix(&s[4..6], 16).ok()?;
    Some(RgbColor::new(r, g, b))
}

fn params_to_sgr(params: &[CsiParam]) -> Vec<i64> {
    params.iter().filter_map(|p| p.as_integer()).collect()
}

/// Parses the `5;n` / `2;r;g;b` tail of an extended SGR color (`38`/`48`),
/// returning the resolved color and how many extra params it consumed.
fn parse_extended_color(rest: &[i64]) -> (Option<ColorAttribute>, usize) {
    match rest.first() {
        Some(5) => {
            let idx = rest.get(1).copied().unwrap_or(0) as u8;
            (Some(ColorAttribute::PaletteIndex(idx)), 2)
        }
        Some(2) => {
            let r = rest.get(1).copied().unwrap_or(0) as u8;
            let g = rest.get(2).copied().unwrap_or(0) as u8;
            let b = rest.get(3).copied().unwrap_or(0) as u8;
            (Some(ColorAttribute::Rgb(RgbColor::new(r, g, b))), 4)
        }
        _ => (None, 1),
    }
}

impl VTActor for Vte {
    fn print(&mut self, c: char) {
        let cp = self.charset.remap_and_consume_shift(c as u32);
        self.screen_mut().write_codepoint(cp);
    }

    fn execute_c0_or_c1(&mut self, control: u8) {
        self.c0(control);
    }

    fn dcs_hook(&mut self, _mode: u8, _params: &[i64], _intermediates: &[u8], _ignored: bool) {}

    fn dcs_put(&mut self, _byte: u8) {}

    fn dcs_unhook(&mut self) {}

    fn esc_dispatch(&mut self, _params: &[i64], intermediates: &[u8], _ignored: bool, byte: u8) {
        self.esc(intermediates, byte);
    }

    fn csi_dispatch(&mut self, params: &[CsiParam], _parameters_truncated: bool, byte: u8) {
        self.csi(params, byte);
    }

    fn osc_dispatch(&mut self, params: &[&[u8]]) {
        self.osc(params);
    }

    fn apc_dispatch(&mut self, _data: Vec<u8>) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DefaultTerminalConfig;
    use k9::assert_equal as assert_eq;
    use std::sync::Arc;

    fn vte_with(w: usize, h: usize) -> (Vte, Rc<RefCell<Vec<u8>>>) {
        let screen = Rc::new(RefCell::new(Screen::new(w, h, Arc::new(DefaultTerminalConfig))));
        let written = Rc::new(RefCell::new(Vec::new()));
        let written2 = written.clone();
        let vte = Vte::new(screen, Box::new(move |b| written2.borrow_mut().extend_from_slice(b)));
        (vte, written)
    }

    #[test]
    fn hello_prints_to_screen() {
        let (mut vte, _) = vte_with(80, 24);
        vte.input(b"Hello");
        let s = vte.screen();
        let s = s.borrow();
        assert_eq!(s.cursor(), (5, 0));
    }

    #[test]
    fn csi_cursor_move_and_erase() {
        let (mut vte, _) = vte_with(80, 24);
        vte.input(b"\x1b[10;5H\x1b[2J");
        let s = vte.screen();
        let s = s.borrow();
        assert_eq!(s.cursor(), (4, 9));
    }

    #[test]
    fn sgr_sets_palette_color() {
        let (mut vte, _) = vte_with(80, 24);
        vte.input(b"\x1b[31mX");
        let s = vte.screen();
        let s = s.borrow();
        assert_eq!(s.cursor(), (1, 0));

        let mut found = None;
        s.draw(|cell| {
            if cell.col == 0 && cell.row == 0 {
                found = Some(cell.attrs);
            }
            true
        });
        let attrs = found.expect("drawn cell at (0,0)");
        assert_eq!(attrs.foreground, ColorAttribute::PaletteIndex(1));
    }

    #[test]
    fn alternate_screen_via_1049() {
        let (mut vte, _) = vte_with(80, 24);
        vte.input(b"ABC\x1b[?1049h");
        {
            let s = vte.screen();
            assert!(s.borrow().is_alternate());
        }
        vte.input(b"\x1b[?1049l");
        let s = vte.screen();
        assert!(!s.borrow().is_alternate());
    }

    #[test]
    fn input_split_across_calls_matches_single_call() {
        let bytes = b"\x1b[1;2HHello\x1b[0m";
        let (mut one_shot, _) = vte_with(80, 24);
        one_shot.input(bytes);

        let (mut split, _) = vte_with(80, 24);
        for chunk in bytes.chunks(3) {
            split.input(chunk);
        }

        assert_eq!(one_shot.screen().borrow().cursor(), split.screen().borrow().cursor());
    }

    #[test]
    fn log_callback_sees_unhandled_csi() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (mut vte, _) = vte_with(80, 24);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        vte.set_log_callback(Box::new(move |level, msg| {
            seen2.borrow_mut().push((level, msg.to_string()));
        }));
        vte.input(b"\x1b[5z"); // no such CSI final byte in this dispatcher
        let logged = seen.borrow();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].0, LogLevel::Debug);
    }
}
