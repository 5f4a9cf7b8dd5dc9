//! `Line`: one row's cell storage.
//!
//! A line's backing `Vec<Cell>` is never truncated on a column shrink: the
//! visible prefix is just `cells[..current_width]`. This gives "resize
//! wider re-reveals old content" (spec §4.3 Resize) for free, mirroring how
//! `term/src/screen.rs` keeps cells past the physical width intact rather
//! than discarding them. `prev`/`next` scroll-back linkage (spec §3) is not
//! stored per-line; the owning `Screen`'s `VecDeque` order is the list, and
//! selection anchors use stable row numbers rather than line pointers (see
//! SPEC_FULL §5).

use crate::cell::{AgeTick, Cell, CellAttrs};

#[derive(Debug, Clone)]
pub struct Line {
    cells: Vec<Cell>,
    /// Most recent age assigned to any cell in this line; lets a caller
    /// skip an entire line during a coarse redraw pass.
    pub age: AgeTick,
    /// Set on a line that wraps into the next one because an auto-wrap
    /// occurred at its end, rather than an explicit newline. Used by
    /// selection's "real length" computation and by rewrap-on-resize.
    pub wrapped: bool,
}

impl Line {
    pub fn blank(width: usize, attrs: CellAttrs, age: AgeTick) -> Line {
        Line {
            cells: vec![Cell::blank(attrs, age); width.max(1)],
            age,
            wrapped: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Ensures the backing storage is at least `width` cells wide, padding
    /// with blanks using `attrs`/`age` if it must grow. Never shrinks.
    pub fn ensure_width(&mut self, width: usize, attrs: CellAttrs, age: AgeTick) {
        if self.cells.len() < width {
            self.cells.resize(width, Cell::blank(attrs, age));
        }
    }

    pub fn cell(&self, x: usize) -> Option<&Cell> {
        self.cells.get(x)
    }

    pub fn cell_mut(&mut self, x: usize) -> Option<&mut Cell> {
        self.cells.get_mut(x)
    }

    pub fn set_cell(&mut self, x: usize, cell: Cell) {
        if x >= self.cells.len() {
            let pad = Cell::blank(cell.attrs, cell.age);
            self.cells.resize(x + 1, pad);
        }
        self.cells[x] = cell;
        self.age = self.age.max(cell.age);
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Index one past the last non-blank cell -- the "real" length used by
    /// selection-copy to avoid trailing spaces (spec §4.3 Selection model).
    pub fn real_len(&self, visible_width: usize) -> usize {
        let limit = visible_width.min(self.cells.len());
        self.cells[..limit]
            .iter()
            .rposition(|c| !c.is_blank())
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Resets every cell to blank with the given default attributes,
    /// stamping `age` on all of them. Used by full-screen erase and by
    /// `reset()`.
    pub fn clear(&mut self, attrs: CellAttrs, age: AgeTick) {
        for cell in &mut self.cells {
            *cell = Cell::blank(attrs, age);
        }
        self.age = age;
        self.wrapped = false;
    }

    /// Invalidates the grapheme at or immediately before `x`: if `x` is
    /// the continuation half of a wide glyph, blanks both halves. Needed
    /// before overwriting a cell so a write never leaves a dangling
    /// wide-glyph half (spec Open Questions).
    pub fn invalidate_grapheme_at_or_before(&mut self, x: usize, attrs: CellAttrs, age: AgeTick) {
        if x < self.cells.len() && self.cells[x].attrs.is_wide_continuation() && x > 0 {
            self.cells[x - 1] = Cell::blank(attrs, age);
            self.cells[x] = Cell::blank(attrs, age);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shrink_then_grow_preserves_content() {
        let mut line = Line::blank(10, CellAttrs::default(), 1);
        line.set_cell(
            9,
            Cell {
                symbol: crate::symbol::SymbolId::from_codepoint(65),
                attrs: CellAttrs::default(),
                age: 2,
            },
        );
        // A "shrink" is just rendering fewer cells; storage is untouched.
        assert_eq!(line.len(), 10);
        line.ensure_width(5, CellAttrs::default(), 3);
        assert_eq!(line.len(), 10); // ensure_width never shrinks
    }

    #[test]
    fn real_len_skips_trailing_blanks() {
        let mut line = Line::blank(10, CellAttrs::default(), 1);
        line.set_cell(
            2,
            Cell {
                symbol: crate::symbol::SymbolId::from_codepoint(65),
                attrs: CellAttrs::default(),
                age: 1,
            },
        );
        assert_eq!(line.real_len(10), 3);
    }
}
