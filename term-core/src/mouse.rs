//! Mouse event encoding: X10, SGR, and SGR-pixel wire formats (spec §4.4
//! "Mouse encoder").

use bitflags::bitflags;

bitflags! {
    /// Wire-format modifier bits, already in the shape the encoded report
    /// OR's into the button code (spec §4.4 "Button encoding").
    pub struct MouseModifiers: u8 {
        const SHIFT = 4;
        const META  = 8;
        const CTRL  = 16;
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    /// No button held; only valid for `MouseEvent::Motion` under any-event
    /// tracking.
    None,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MouseEvent {
    Press,
    Release,
    Motion,
}

/// The effective tracking mode, reported to the `mouse_mode_cb` whenever it
/// changes so the embedder can install or remove pointer hooks.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MouseMode {
    Disabled,
    /// DEC mode 9: click-only, cell coordinates, X10 wire format.
    X10,
    /// DEC mode 1000: click and release, no motion.
    Normal,
    /// DEC mode 1002: click, release, and motion while a button is held.
    ButtonEvent,
    /// DEC mode 1003: click, release, and all motion.
    AnyEvent,
}

/// Which of the three tracking modes (1000/1002/1003/9) is enabled, plus
/// the independent coordinate-format toggles (1005/1006/1016) and last
/// reported cell, for motion dedup.
#[derive(Debug, Default)]
pub struct MouseEncoder {
    mode: Option<MouseMode>,
    sgr: bool,
    sgr_pixels: bool,
    utf8: bool,
    last_cell: Option<(i64, i64)>,
}

impl MouseEncoder {
    pub fn set_mode(&mut self, mode: Option<MouseMode>) {
        self.mode = mode;
        self.last_cell = None;
    }

    pub fn set_sgr(&mut self, on: bool) {
        self.sgr = on;
    }

    pub fn set_sgr_pixels(&mut self, on: bool) {
        self.sgr_pixels = on;
    }

    pub fn set_utf8(&mut self, on: bool) {
        self.utf8 = on;
    }

    pub fn effective_mode(&self) -> MouseMode {
        self.mode.unwrap_or(MouseMode::Disabled)
    }

    /// Encodes a mouse event as the bytes to write to the child process, or
    /// `None` if tracking is disabled or the event is a motion the current
    /// mode doesn't report (including a same-cell motion dedup against the
    /// last reported cell; a click is always reported regardless of dedup).
    pub fn handle_mouse(
        &mut self,
        cell: (i64, i64),
        pixel: (i64, i64),
        button: MouseButton,
        event: MouseEvent,
        modifiers: MouseModifiers,
    ) -> Option<Vec<u8>> {
        let mode = self.mode?;
        let is_motion = event == MouseEvent::Motion;

        if is_motion {
            match mode {
                MouseMode::AnyEvent => {}
                MouseMode::ButtonEvent if button != MouseButton::None => {}
                _ => return None,
            }
            if self.last_cell == Some(cell) {
                return None;
            }
        }
        self.last_cell = Some(cell);

        let mut code: u16 = match button {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::WheelUp => 64,
            MouseButton::WheelDown => 65,
            MouseButton::None => 3,
        };
        if is_motion {
            code += 32;
        }
        code |= modifiers.bits() as u16;

        if self.sgr || self.sgr_pixels {
            let (x, y) = if self.sgr_pixels { pixel } else { cell };
            let suffix = if event == MouseEvent::Release { 'm' } else { 'M' };
            Some(format!("\x1b[<{};{};{}{}", code, x + 1, y + 1, suffix).into_bytes())
        } else {
            let b = if event == MouseEvent::Release { 3 } else { code as u8 };
            Some(vec![
                0x1b,
                b'[',
                b'M',
                b.wrapping_add(32),
                clamp_x10(cell.0),
                clamp_x10(cell.1),
            ])
        }
    }
}

fn clamp_x10(v: i64) -> u8 {
    (v + 33).clamp(0, 255) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disabled_by_default() {
        let mut enc = MouseEncoder::default();
        assert_eq!(enc.effective_mode(), MouseMode::Disabled);
        assert!(enc
            .handle_mouse((0, 0), (0, 0), MouseButton::Left, MouseEvent::Press, MouseModifiers::empty())
            .is_none());
    }

    #[test]
    fn x10_click_encodes_wire_format() {
        let mut enc = MouseEncoder::default();
        enc.set_mode(Some(MouseMode::X10));
        let bytes = enc
            .handle_mouse((0, 0), (0, 0), MouseButton::Left, MouseEvent::Press, MouseModifiers::empty())
            .unwrap();
        assert_eq!(bytes, vec![0x1b, b'[', b'M', 32, 33, 33]);
    }

    #[test]
    fn sgr_release_uses_lowercase_m() {
        let mut enc = MouseEncoder::default();
        enc.set_mode(Some(MouseMode::Normal));
        enc.set_sgr(true);
        let bytes = enc
            .handle_mouse((3, 4), (0, 0), MouseButton::Left, MouseEvent::Release, MouseModifiers::empty())
            .unwrap();
        assert_eq!(bytes, b"\x1b[<0;4;5m".to_vec());
    }

    #[test]
    fn motion_dedup_against_last_cell() {
        let mut enc = MouseEncoder::default();
        enc.set_mode(Some(MouseMode::AnyEvent));
        enc.set_sgr(true);
        let first = enc.handle_mouse(
            (1, 1),
            (0, 0),
            MouseButton::None,
            MouseEvent::Motion,
            MouseModifiers::empty(),
        );
        assert!(first.is_some());
        let second = enc.handle_mouse(
            (1, 1),
            (0, 0),
            MouseButton::None,
            MouseEvent::Motion,
            MouseModifiers::empty(),
        );
        assert!(second.is_none());
    }

    #[test]
    fn button_event_mode_ignores_motion_without_button() {
        let mut enc = MouseEncoder::default();
        enc.set_mode(Some(MouseMode::ButtonEvent));
        let result = enc.handle_mouse(
            (2, 2),
            (0, 0),
            MouseButton::None,
            MouseEvent::Motion,
            MouseModifiers::empty(),
        );
        assert!(result.is_none());
    }
}
