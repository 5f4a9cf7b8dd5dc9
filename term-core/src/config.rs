//! Host-supplied configuration trait (spec §2.1 Ambient stack).
//!
//! Grounded directly on `term/src/config.rs`: a small object-safe trait
//! with sensible defaults, so a caller that doesn't care can pass
//! `Arc::new(DefaultTerminalConfig)` and get libtsm-equivalent behavior.

/// Host-supplied terminal configuration. Implementations are held as
/// `Arc<dyn TerminalConfiguration>` by the `Vte`/`Screen` pair so the host
/// can swap behavior without rebuilding the terminal.
pub trait TerminalConfiguration: std::fmt::Debug {
    /// Scroll-back capacity in lines. libtsm has no fixed default in the
    /// public header; `term`'s default of 3500 is a reasonable, widely
    /// used value and is kept here.
    fn scrollback_size(&self) -> usize {
        3500
    }

    /// Classifies whether `s` (typically a single grapheme) should be
    /// treated as "part of a word" for double-click word selection. This
    /// is ambient, host-facing configuration (SPEC_FULL §2.2); the core
    /// does not itself detect double-click gestures, only exposes this
    /// classifier for a caller that wants to build that on top.
    fn is_double_click_word(&self, s: &str) -> bool {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => false,
            (Some(_), Some(_)) => true,
            (Some(c), None) => !matches!(
                c,
                ' ' | '\t' | '\n' | '{' | '[' | '}' | ']' | '(' | ')' | '"' | '\''
            ),
        }
    }

    /// Whether scroll-back should jump back to the bottom whenever new
    /// keyboard input is sent, matching interactive-terminal convention.
    fn scroll_to_bottom_on_key_input(&self) -> bool {
        true
    }

    /// Whether Backspace sends ASCII BS (0x08, the default) or DEL (0x7F).
    /// libtsm's header documents the default as plain backspace.
    fn backspace_sends_delete(&self) -> bool {
        false
    }
}

/// A `TerminalConfiguration` using every trait default, for callers and
/// tests that don't need to customize anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTerminalConfig;

impl TerminalConfiguration for DefaultTerminalConfig {}
