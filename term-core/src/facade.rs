//! The public Facade: reference-counted `Screen`/`Vte` pair plus the
//! validating entry points a caller uses to drive the terminal (spec §4.5).

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use log::{log_enabled, Level};

use crate::cell::AgeTick;
use crate::config::TerminalConfiguration;
use crate::error::{Error, Result};
use crate::keyboard::{self, KeyModifiers};
use crate::mouse::{MouseButton, MouseEncoder, MouseEvent, MouseModifiers, MouseMode};
use crate::screen::{DrawCell, Screen};
use crate::vte::{LogCallback, MouseModeCallback, OscCallback, Vte, VteFlags, WriteCallback};

/// A `Screen` + `Vte` pair sharing one reference-counted grid, matching the
/// "VTE holds a strong reference to its Screen" relationship (spec §4.5).
/// Not `Send`/`Sync`: the whole model is single-threaded and non-reentrant
/// (SPEC_FULL §2.1 Concurrency).
pub struct Terminal {
    screen: Rc<RefCell<Screen>>,
    vte: Vte,
    config: Arc<dyn TerminalConfiguration>,
}

impl Terminal {
    pub fn new(
        cols: usize,
        rows: usize,
        config: Arc<dyn TerminalConfiguration>,
        write_cb: WriteCallback,
    ) -> Result<Terminal> {
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidArgument);
        }
        let screen = Rc::new(RefCell::new(Screen::new(cols, rows, config.clone())));
        let vte = Vte::new(screen.clone(), write_cb);
        Ok(Terminal { screen, vte, config })
    }

    pub fn set_osc_callback(&mut self, cb: OscCallback) {
        self.vte.set_osc_callback(cb);
    }

    pub fn set_mouse_mode_callback(&mut self, cb: MouseModeCallback) {
        self.vte.set_mouse_mode_callback(cb);
    }

    /// Installs a per-instance logging sink for hosts not wired to `log`'s
    /// global logger. `log`'s facade macros still fire regardless.
    pub fn set_log_callback(&mut self, cb: LogCallback) {
        self.vte.set_log_callback(cb);
    }

    /// Feeds input bytes through the VTE. Never fails: malformed sequences
    /// are recovered from internally and logged at DEBUG (spec §7).
    pub fn input(&mut self, bytes: &[u8]) {
        if log_enabled!(Level::Trace) {
            log::trace!("terminal input: {} bytes", bytes.len());
        }
        self.vte.input(bytes);
    }

    pub fn resize(&mut self, cols: usize, rows: usize) -> Result<()> {
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidArgument);
        }
        self.screen.borrow_mut().resize(cols, rows);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.screen.borrow_mut().reset();
    }

    /// Translates a key-down event to wire bytes and writes them directly
    /// via the configured write callback, mirroring `handle_keyboard`'s ABI
    /// signature (spec §4.4).
    pub fn handle_keyboard(&mut self, keysym: u32, ascii: u32, mods: KeyModifiers, unicode: u32) {
        let flags = self.vte.flags();
        let bytes = keyboard::handle_keyboard(
            keysym,
            ascii,
            mods,
            unicode,
            flags.contains(VteFlags::CURSOR_KEY_MODE),
            flags.contains(VteFlags::KEYPAD_APPLICATION_MODE),
            self.config.backspace_sends_delete(),
        );
        if let Some(bytes) = bytes {
            if self.config.scroll_to_bottom_on_key_input() {
                self.screen.borrow_mut().scrollback_reset();
            }
            self.vte_write(&bytes);
        }
    }

    /// Translates a mouse event to wire bytes (if the current tracking mode
    /// reports it) and writes them via the configured write callback.
    pub fn handle_mouse(
        &mut self,
        cell: (i64, i64),
        pixel: (i64, i64),
        button: MouseButton,
        event: MouseEvent,
        modifiers: MouseModifiers,
    ) {
        if let Some(bytes) = self.mouse_encoder().handle_mouse(cell, pixel, button, event, modifiers) {
            self.vte_write(&bytes);
        }
    }

    fn mouse_encoder(&mut self) -> &mut MouseEncoder {
        self.vte.mouse_encoder_mut()
    }

    fn vte_write(&mut self, bytes: &[u8]) {
        self.vte.write_direct(bytes);
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.vte.mouse_mode()
    }

    pub fn set_palette(&mut self, name: &str) -> Result<()> {
        self.vte.set_palette(name)
    }

    pub fn selection_start(&mut self, x: usize, y: usize) -> Result<()> {
        let (cols, rows) = self.screen.borrow().size();
        if x >= cols || y >= rows {
            return Err(Error::InvalidArgument);
        }
        self.screen.borrow_mut().selection_start(x, y);
        Ok(())
    }

    pub fn selection_target(&mut self, x: usize, y: usize) -> Result<()> {
        let (cols, rows) = self.screen.borrow().size();
        if x >= cols || y >= rows {
            return Err(Error::InvalidArgument);
        }
        self.screen.borrow_mut().selection_target(x, y);
        Ok(())
    }

    pub fn selection_reset(&mut self) {
        self.screen.borrow_mut().selection_reset();
    }

    pub fn selection_copy(&self) -> Result<String> {
        self.screen.borrow().selection_copy().ok_or(Error::NoSelection)
    }

    /// Runs a draw pass over the shared screen, returning the age watermark
    /// as of the start of the pass (spec §4.3 "Draw iteration").
    pub fn draw<F: FnMut(&DrawCell) -> bool>(&self, callback: F) -> AgeTick {
        self.screen.borrow().draw(callback)
    }

    pub fn screen(&self) -> Rc<RefCell<Screen>> {
        self.screen.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DefaultTerminalConfig;
    use k9::assert_equal as assert_eq;

    fn terminal(cols: usize, rows: usize) -> (Terminal, Rc<RefCell<Vec<u8>>>) {
        let written = Rc::new(RefCell::new(Vec::new()));
        let written2 = written.clone();
        let term = Terminal::new(
            cols,
            rows,
            Arc::new(DefaultTerminalConfig),
            Box::new(move |b| written2.borrow_mut().extend_from_slice(b)),
        )
        .unwrap();
        (term, written)
    }

    #[test]
    fn new_rejects_zero_size() {
        let err = Terminal::new(
            0,
            24,
            Arc::new(DefaultTerminalConfig),
            Box::new(|_| {}),
        )
        .unwrap_err();
        assert_eq!(err, Error::InvalidArgument);
    }

    #[test]
    fn sgr_mouse_click_reports_through_write_callback() {
        let (mut term, written) = terminal(80, 24);
        term.input(b"\x1b[?1000h\x1b[?1006h");
        term.handle_mouse(
            (3, 4),
            (0, 0),
            MouseButton::Left,
            MouseEvent::Press,
            MouseModifiers::empty(),
        );
        assert_eq!(written.borrow().as_slice(), b"\x1b[<0;4;5M");
    }

    #[test]
    fn keyboard_up_arrow_respects_cursor_key_mode() {
        let (mut term, written) = terminal(80, 24);
        term.input(b"\x1b[?1h"); // DECCKM: application cursor keys
        term.handle_keyboard(keyboard::keysym::UP, 0, KeyModifiers::empty(), 0);
        assert_eq!(written.borrow().as_slice(), b"\x1bOA");
    }

    #[test]
    fn selection_copy_across_three_lines() {
        let (mut term, _) = terminal(10, 5);
        term.input(b"one\r\ntwo\r\nthree");
        term.selection_start(0, 0).unwrap();
        term.selection_target(4, 2).unwrap();
        let text = term.selection_copy().unwrap();
        assert_eq!(text, "one\ntwo\nthree");
    }

    #[test]
    fn selection_start_out_of_bounds_is_invalid_argument() {
        let (mut term, _) = terminal(10, 5);
        let err = term.selection_start(100, 100).unwrap_err();
        assert_eq!(err, Error::InvalidArgument);
    }

    #[test]
    fn selection_copy_without_selection_is_no_selection() {
        let (term, _) = terminal(10, 5);
        let err = term.selection_copy().unwrap_err();
        assert_eq!(err, Error::NoSelection);
    }
}
