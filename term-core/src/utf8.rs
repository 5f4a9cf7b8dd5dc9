//! Streaming UTF-8 <-> UCS-4 conversion and cell-width lookup.
//!
//! `vtparse` already decodes UTF-8 internally (via `utf8parse`) for the
//! purpose of dispatching `print` tokens, but this module is independent of
//! that: it exists so the round-trip (`utf8_to_ucs4(ucs4_to_utf8(cp)) ==
//! cp`) is directly testable, and so the keyboard encoder (which must
//! re-encode a `unicode` code point supplied by the caller into UTF-8
//! bytes) has somewhere to call.

use unicode_width::UnicodeWidthChar;

const REPLACEMENT: u32 = 0xFFFD;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DecodeState {
    Ground,
    /// Collecting `need` more continuation bytes into `accum`, having
    /// already validated the leader byte's class.
    Need { need: u8, accum: u32, min: u32 },
}

/// Incremental UTF-8 decoder. Feed bytes one at a time; each call yields
/// `Some(cp)` when a code point completes, `None` while still accumulating.
/// Malformed input yields `U+FFFD` and the decoder keeps going.
#[derive(Debug, Clone)]
pub struct Utf8Decoder {
    state: DecodeState,
}

impl Default for Utf8Decoder {
    fn default() -> Self {
        Utf8Decoder {
            state: DecodeState::Ground,
        }
    }
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte. Returns the decoded code point(s): normally at most
    /// one, but a bad continuation byte can both terminate the pending
    /// sequence with `U+FFFD` *and* start a fresh one from the same byte,
    /// so the return type allows for two.
    pub fn feed(&mut self, byte: u8) -> Utf8Step {
        match self.state {
            DecodeState::Ground => match classify_leader(byte) {
                Leader::Ascii => Utf8Step::one(byte as u32),
                Leader::Invalid => Utf8Step::one(REPLACEMENT),
                Leader::Continuation => Utf8Step::one(REPLACEMENT),
                Leader::Multi { need, accum, min } => {
                    self.state = DecodeState::Need { need, accum, min };
                    Utf8Step::none()
                }
            },
            DecodeState::Need { need, accum, min } => {
                if is_continuation(byte) {
                    let accum = (accum << 6) | (byte as u32 & 0x3F);
                    if need == 1 {
                        self.state = DecodeState::Ground;
                        Utf8Step::one(validate(accum, min))
                    } else {
                        self.state = DecodeState::Need {
                            need: need - 1,
                            accum,
                            min,
                        };
                        Utf8Step::none()
                    }
                } else {
                    // Sequence aborted early: emit replacement for what we
                    // had, then re-process this byte as a fresh leader.
                    self.state = DecodeState::Ground;
                    let mut step = Utf8Step::one(REPLACEMENT);
                    step.extend(self.feed(byte));
                    step
                }
            }
        }
    }

    /// True if a partial multi-byte sequence is pending.
    pub fn in_progress(&self) -> bool {
        !matches!(self.state, DecodeState::Ground)
    }
}

/// Up to two decoded code points produced by a single `feed` call.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Step {
    first: Option<u32>,
    second: Option<u32>,
}

impl Utf8Step {
    fn none() -> Self {
        Utf8Step::default()
    }
    fn one(cp: u32) -> Self {
        Utf8Step {
            first: Some(cp),
            second: None,
        }
    }
    fn extend(&mut self, other: Utf8Step) {
        for cp in other.into_iter() {
            if self.first.is_none() {
                self.first = Some(cp);
            } else {
                self.second = Some(cp);
            }
        }
    }
}

impl IntoIterator for Utf8Step {
    type Item = u32;
    type IntoIter = std::iter::Chain<std::option::IntoIter<u32>, std::option::IntoIter<u32>>;
    fn into_iter(self) -> Self::IntoIter {
        self.first.into_iter().chain(self.second)
    }
}

enum Leader {
    Ascii,
    Continuation,
    Invalid,
    Multi { need: u8, accum: u32, min: u32 },
}

fn classify_leader(byte: u8) -> Leader {
    if byte < 0x80 {
        Leader::Ascii
    } else if byte & 0xC0 == 0x80 {
        Leader::Continuation
    } else if byte & 0xE0 == 0xC0 {
        Leader::Multi {
            need: 1,
            accum: (byte & 0x1F) as u32,
            min: 0x80,
        }
    } else if byte & 0xF0 == 0xE0 {
        Leader::Multi {
            need: 2,
            accum: (byte & 0x0F) as u32,
            min: 0x800,
        }
    } else if byte & 0xF8 == 0xF0 {
        Leader::Multi {
            need: 3,
            accum: (byte & 0x07) as u32,
            min: 0x1_0000,
        }
    } else {
        Leader::Invalid
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

fn validate(cp: u32, min: u32) -> u32 {
    if cp < min || cp > 0x10_FFFF || (0xD800..=0xDFFF).contains(&cp) {
        REPLACEMENT
    } else {
        cp
    }
}

/// Encodes a single UCS-4 code point as UTF-8 bytes, appending to `out`.
/// Invalid code points (surrogates, > U+10FFFF) encode as `U+FFFD`.
pub fn ucs4_to_utf8(cp: u32, out: &mut Vec<u8>) {
    let cp = if cp > 0x10_FFFF || (0xD800..=0xDFFF).contains(&cp) {
        REPLACEMENT
    } else {
        cp
    };
    match char::from_u32(cp) {
        Some(c) => {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
        None => out.extend_from_slice("\u{FFFD}".as_bytes()),
    }
}

/// One-shot decode of a single valid code point's UTF-8 encoding, for the
/// round-trip test property. Panics are avoided: invalid input decodes to
/// `U+FFFD` the same way the streaming decoder would.
pub fn utf8_to_ucs4(bytes: &[u8]) -> u32 {
    let mut decoder = Utf8Decoder::new();
    let mut last = REPLACEMENT;
    for &b in bytes {
        for cp in decoder.feed(b) {
            last = cp;
        }
    }
    last
}

/// wcwidth-equivalent: 0 (zero-width/combining or control), 1 (narrow), or
/// 2 (wide). Grounded on the `unicode-width` crate's tables, with the
/// spec's explicit control/NUL override layered on top.
pub fn width(cp: u32) -> u8 {
    if cp == 0 {
        return 0;
    }
    if cp < 0x20 || (0x7F..=0x9F).contains(&cp) {
        // C0/C1 controls: zero width for rendering purposes.
        return 0;
    }
    match char::from_u32(cp) {
        Some(c) => match c.width() {
            Some(w) => w as u8,
            None => 0,
        },
        None => 1,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ascii_round_trip() {
        let mut buf = Vec::new();
        ucs4_to_utf8('A' as u32, &mut buf);
        assert_eq!(buf, b"A");
        assert_eq!(utf8_to_ucs4(&buf), 'A' as u32);
    }

    #[test]
    fn multibyte_round_trip() {
        for cp in [0x7Fu32, 0x80, 0x7FF, 0x800, 0xFFFF, 0x10000, 0x10FFFF] {
            let mut buf = Vec::new();
            ucs4_to_utf8(cp, &mut buf);
            assert_eq!(utf8_to_ucs4(&buf), cp, "cp = {:x}", cp);
        }
    }

    #[test]
    fn surrogate_encodes_as_replacement() {
        let mut buf = Vec::new();
        ucs4_to_utf8(0xD800, &mut buf);
        assert_eq!(utf8_to_ucs4(&buf), REPLACEMENT);
    }

    #[test]
    fn invalid_continuation_reprocesses_byte() {
        let mut decoder = Utf8Decoder::new();
        // 0xC2 starts a 2-byte sequence, but 'A' is not a continuation
        // byte: expect U+FFFD then 'A'.
        let mut out = Vec::new();
        out.extend(decoder.feed(0xC2));
        out.extend(decoder.feed(b'A'));
        assert_eq!(out, vec![REPLACEMENT, 'A' as u32]);
    }

    #[test]
    fn width_basic() {
        assert_eq!(width(0), 0);
        assert_eq!(width('A' as u32), 1);
        assert_eq!(width(0x7), 0); // BEL
        assert_eq!(width(0x4E2D), 2); // 中
    }
}
