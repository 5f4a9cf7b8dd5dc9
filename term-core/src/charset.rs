//! G0..G3 character set slots, SCS designation, and GL/GR invocation.
//!
//! Grounded on the substitution-table approach `wezterm-term`'s performer
//! uses when flushing printable text (map each 0x20..0x7F code point
//! through the currently invoked table before it reaches the screen).

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Charset {
    Ascii,
    /// DEC Special Graphics and Line Drawing Set (`ESC ( 0`).
    DecSpecialGraphics,
    Uk,
}

impl Default for Charset {
    fn default() -> Self {
        Charset::Ascii
    }
}

/// Which of G0..G3 is currently invoked into GL (`gl`) or GR (`gr`), plus
/// a pending single-shift (`glt`, consumed by the very next printed
/// character only).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CharsetSlot {
    G0,
    G1,
    G2,
    G3,
}

impl Charset {
    /// Remaps a printable code point (0x20..0x7F) through this charset.
    /// Code points outside that range, and anything decoded from a
    /// genuine multi-byte UTF-8 sequence, bypass remapping entirely (the
    /// caller is expected to only call this for the 7-bit printable range
    /// straight off the wire).
    pub fn remap(&self, cp: u32) -> u32 {
        match self {
            Charset::Ascii => cp,
            Charset::Uk => {
                if cp == '#' as u32 {
                    0xA3 // pound sign
                } else {
                    cp
                }
            }
            Charset::DecSpecialGraphics => dec_special_graphics(cp).unwrap_or(cp),
        }
    }
}

/// DEC Special Graphics mapping for the 0x60..0x7E range (the VT100 line
/// drawing set used by e.g. `ncurses`' ACS characters).
fn dec_special_graphics(cp: u32) -> Option<u32> {
    let c = char::from_u32(cp)?;
    let mapped = match c {
        '`' => '\u{25C6}', // diamond
        'a' => '\u{2592}', // checkerboard
        'b' => '\u{2409}', // HT symbol
        'c' => '\u{240C}', // FF symbol
        'd' => '\u{240D}', // CR symbol
        'e' => '\u{240A}', // LF symbol
        'f' => '\u{00B0}', // degree
        'g' => '\u{00B1}', // plus/minus
        'h' => '\u{2424}', // NL symbol
        'i' => '\u{240B}', // VT symbol
        'j' => '\u{2518}', // bottom-right corner
        'k' => '\u{2510}', // top-right corner
        'l' => '\u{250C}', // top-left corner
        'm' => '\u{2514}', // bottom-left corner
        'n' => '\u{253C}', // crossing lines
        'o' => '\u{23BA}', // scan line 1
        'p' => '\u{23BB}', // scan line 3
        'q' => '\u{2500}', // horizontal line
        'r' => '\u{23BC}', // scan line 7
        's' => '\u{23BD}', // scan line 9
        't' => '\u{251C}', // left tee
        'u' => '\u{2524}', // right tee
        'v' => '\u{2534}', // bottom tee
        'w' => '\u{252C}', // top tee
        'x' => '\u{2502}', // vertical line
        'y' => '\u{2264}', // less-equal
        'z' => '\u{2265}', // greater-equal
        '{' => '\u{03C0}', // pi
        '|' => '\u{2260}', // not-equal
        '}' => '\u{00A3}', // pound sterling
        '~' => '\u{00B7}', // centered dot
        _ => return None,
    };
    Some(mapped as u32)
}

/// The four designated character sets and which slots are currently
/// invoked into GL/GR, plus any pending single-shift.
#[derive(Debug, Clone)]
pub struct CharsetState {
    pub g: [Charset; 4],
    pub gl: CharsetSlot,
    pub gr: CharsetSlot,
    /// A single-shift (SS2/SS3) consumes exactly the next printed
    /// character, then reverts.
    pub single_shift: Option<CharsetSlot>,
}

impl Default for CharsetState {
    fn default() -> Self {
        CharsetState {
            g: [Charset::Ascii; 4],
            gl: CharsetSlot::G0,
            gr: CharsetSlot::G1,
            single_shift: None,
        }
    }
}

impl CharsetState {
    pub fn designate(&mut self, slot: CharsetSlot, charset: Charset) {
        self.g[slot_index(slot)] = charset;
    }

    pub fn invoke_gl(&mut self, slot: CharsetSlot) {
        self.gl = slot;
    }

    pub fn invoke_gr(&mut self, slot: CharsetSlot) {
        self.gr = slot;
    }

    pub fn single_shift(&mut self, slot: CharsetSlot) {
        self.single_shift = Some(slot);
    }

    /// Remaps one printable code point through whichever slot is active
    /// right now, consuming a pending single-shift if present.
    pub fn remap_and_consume_shift(&mut self, cp: u32) -> u32 {
        if !(0x20..0x7F).contains(&cp) {
            return cp;
        }
        let slot = self.single_shift.take().unwrap_or(self.gl);
        self.g[slot_index(slot)].remap(cp)
    }
}

fn slot_index(slot: CharsetSlot) -> usize {
    match slot {
        CharsetSlot::G0 => 0,
        CharsetSlot::G1 => 1,
        CharsetSlot::G2 => 2,
        CharsetSlot::G3 => 3,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dec_graphics_remaps_q_to_horizontal_line() {
        let mut state = CharsetState::default();
        state.designate(CharsetSlot::G0, Charset::DecSpecialGraphics);
        assert_eq!(state.remap_and_consume_shift('q' as u32), 0x2500);
    }

    #[test]
    fn single_shift_consumed_once() {
        let mut state = CharsetState::default();
        state.designate(CharsetSlot::G2, Charset::DecSpecialGraphics);
        state.single_shift(CharsetSlot::G2);
        assert_eq!(state.remap_and_consume_shift('q' as u32), 0x2500);
        // second character reverts to GL (ASCII)
        assert_eq!(state.remap_and_consume_shift('q' as u32), 'q' as u32);
    }

    #[test]
    fn uk_charset_remaps_hash_to_pound() {
        let mut state = CharsetState::default();
        state.designate(CharsetSlot::G0, Charset::Uk);
        assert_eq!(state.remap_and_consume_shift('#' as u32), 0xA3);
    }
}
