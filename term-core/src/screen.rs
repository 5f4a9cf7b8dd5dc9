//! The Screen grid: line/cell storage, scroll-back, alternate buffer,
//! cursor, margins, tab stops, age tracking, selection, and draw iteration
//! (spec §4.3).

use std::collections::VecDeque;
use std::sync::Arc;

use bitflags::bitflags;

use crate::cell::{AgeTick, Cell, CellAttrs};
use crate::color::ColorAttribute;
use crate::config::TerminalConfiguration;
use crate::line::Line;
use crate::selection::{cols_for_row, AnchorBinding, DocPos, Selection, SelectionAnchor};
use crate::symbol::{SymbolId, SymbolRegistry};
use crate::utf8::width;

bitflags! {
    /// Bit positions match `TSM_SCREEN_*` in the original public header
    /// exactly (spec §6: "part of the ABI of the library surface").
    pub struct ScreenFlags: u32 {
        const INSERT_MODE = 0x01;
        const AUTO_WRAP   = 0x02;
        const REL_ORIGIN  = 0x04;
        const INVERSE     = 0x08;
        const HIDE_CURSOR = 0x10;
        const FIXED_POS   = 0x20;
        const ALTERNATE   = 0x40;
    }
}

/// Default tab stop spacing (spec SPEC_FULL §2.2).
const DEFAULT_TAB_WIDTH: usize = 8;

/// Age watermark: once `age_counter` reaches this, an age reset fires
/// (spec §9 "Age wraparound"). Kept small-ish relative to `u64::MAX` so
/// tests can exercise wraparound without looping billions of times, while
/// still being "half the representable range" in spirit: half of a
/// deliberately narrower working range.
const AGE_RESET_THRESHOLD: AgeTick = 1 << 40;

#[derive(Debug, Clone)]
struct TabStops {
    stops: Vec<bool>,
}

impl TabStops {
    fn new(width: usize) -> Self {
        let mut stops = vec![false; width.max(1)];
        for (i, stop) in stops.iter_mut().enumerate() {
            *stop = i % DEFAULT_TAB_WIDTH == 0;
        }
        TabStops { stops }
    }

    fn resize(&mut self, width: usize) {
        if width > self.stops.len() {
            self.stops.resize(width, false);
        } else {
            self.stops.truncate(width.max(1));
        }
    }

    fn set(&mut self, col: usize) {
        if col < self.stops.len() {
            self.stops[col] = true;
        }
    }

    fn clear(&mut self, col: usize) {
        if col < self.stops.len() {
            self.stops[col] = false;
        }
    }

    fn clear_all(&mut self) {
        for s in &mut self.stops {
            *s = false;
        }
    }

    fn next_stop(&self, from: usize) -> usize {
        let last = self.stops.len().saturating_sub(1);
        for col in (from + 1)..self.stops.len() {
            if self.stops[col] {
                return col;
            }
        }
        last
    }

    fn prev_stop(&self, from: usize) -> usize {
        for col in (0..from).rev() {
            if self.stops[col] {
                return col;
            }
        }
        0
    }
}

/// What a draw pass hands the callback for one visible cell (spec §6
/// "Draw callback").
#[derive(Debug, Clone, Copy)]
pub struct DrawCell {
    pub col: usize,
    pub row: usize,
    pub symbol: SymbolId,
    pub width: u8,
    pub attrs: CellAttrs,
    pub age: AgeTick,
    pub is_cursor: bool,
}

/// Which subrange an `erase` call targets (spec §4.3 "erase subranges").
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EraseRange {
    CursorToEndOfLine,
    HomeToCursorOnLine,
    CurrentLine,
    ScreenToCursor,
    CursorToScreen,
    WholeScreen,
}

pub struct Screen {
    size_x: usize,
    size_y: usize,
    margin_top: usize,
    margin_bottom: usize,
    cursor_x: usize,
    cursor_y: usize,
    pending_wrap: bool,
    flags: ScreenFlags,
    def_attr: CellAttrs,
    tab_stops: TabStops,

    main_lines: Vec<Line>,
    alt_lines: Option<Vec<Line>>,

    scrollback: VecDeque<Line>,
    sb_max: usize,
    /// How many scroll-back lines are currently scrolled into view (0 =
    /// viewing the live screen).
    sb_view_offset: usize,

    /// Monotonically increasing id assigned to every line ever created;
    /// selection anchors reference scroll-back lines by this id rather
    /// than by pointer (SPEC_FULL §5).
    next_line_id: u64,
    line_ids: VecDeque<u64>,
    main_line_ids: Vec<u64>,
    alt_line_ids: Option<Vec<u64>>,

    age_counter: AgeTick,

    selection: Selection,

    registry: SymbolRegistry,
    config: Arc<dyn TerminalConfiguration>,
}

impl Screen {
    pub fn new(size_x: usize, size_y: usize, config: Arc<dyn TerminalConfiguration>) -> Self {
        let size_x = size_x.max(1);
        let size_y = size_y.max(1);
        let def_attr = CellAttrs::default();
        let mut main_lines = Vec::with_capacity(size_y);
        let mut main_line_ids = Vec::with_capacity(size_y);
        let mut next_line_id = 0u64;
        for _ in 0..size_y {
            main_lines.push(Line::blank(size_x, def_attr, 0));
            main_line_ids.push(next_line_id);
            next_line_id += 1;
        }
        Screen {
            size_x,
            size_y,
            margin_top: 0,
            margin_bottom: size_y,
            cursor_x: 0,
            cursor_y: 0,
            pending_wrap: false,
            flags: ScreenFlags::AUTO_WRAP,
            def_attr,
            tab_stops: TabStops::new(size_x),
            main_lines,
            alt_lines: None,
            scrollback: VecDeque::new(),
            sb_max: config.scrollback_size(),
            sb_view_offset: 0,
            next_line_id,
            line_ids: VecDeque::new(),
            main_line_ids,
            alt_line_ids: None,
            age_counter: 1,
            selection: Selection::default(),
            registry: SymbolRegistry::new(),
            config,
        }
    }

    // --- basic accessors -------------------------------------------------

    pub fn size(&self) -> (usize, usize) {
        (self.size_x, self.size_y)
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn flags(&self) -> ScreenFlags {
        self.flags
    }

    pub fn set_flag(&mut self, flag: ScreenFlags, on: bool) {
        self.flags.set(flag, on);
    }

    pub fn def_attr(&self) -> CellAttrs {
        self.def_attr
    }

    pub fn set_def_attr(&mut self, attr: CellAttrs) {
        self.def_attr = attr;
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SymbolRegistry {
        &mut self.registry
    }

    pub fn age_counter(&self) -> AgeTick {
        self.age_counter
    }

    pub fn is_alternate(&self) -> bool {
        self.flags.contains(ScreenFlags::ALTERNATE)
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }

    fn bump_age(&mut self) -> AgeTick {
        self.age_counter += 1;
        if self.age_counter >= AGE_RESET_THRESHOLD {
            self.reset_age();
        }
        self.age_counter
    }

    /// Forces a full redraw by zeroing every cell/line's age and
    /// restarting the counter at 1 (spec §9 "Age wraparound").
    fn reset_age(&mut self) {
        for line in self.main_lines.iter_mut() {
            for cell in line.cells_mut() {
                cell.age = 0;
            }
            line.age = 0;
        }
        if let Some(alt) = self.alt_lines.as_mut() {
            for line in alt.iter_mut() {
                for cell in line.cells_mut() {
                    cell.age = 0;
                }
                line.age = 0;
            }
        }
        for line in self.scrollback.iter_mut() {
            for cell in line.cells_mut() {
                cell.age = 0;
            }
            line.age = 0;
        }
        self.age_counter = 1;
    }

    fn active_lines(&self) -> &Vec<Line> {
        if self.is_alternate() {
            self.alt_lines.as_ref().unwrap_or(&self.main_lines)
        } else {
            &self.main_lines
        }
    }

    fn active_lines_mut(&mut self) -> &mut Vec<Line> {
        if self.flags.contains(ScreenFlags::ALTERNATE) {
            self.alt_lines.get_or_insert_with(|| {
                (0..self.size_y)
                    .map(|_| Line::blank(self.size_x, self.def_attr, 0))
                    .collect()
            })
        } else {
            &mut self.main_lines
        }
    }

    fn active_ids_mut(&mut self) -> &mut Vec<u64> {
        if self.flags.contains(ScreenFlags::ALTERNATE) {
            if self.alt_line_ids.is_none() {
                let mut ids = Vec::with_capacity(self.size_y);
                for _ in 0..self.size_y {
                    ids.push(self.next_line_id);
                    self.next_line_id += 1;
                }
                self.alt_line_ids = Some(ids);
            }
            self.alt_line_ids.as_mut().unwrap()
        } else {
            &mut self.main_line_ids
        }
    }

    fn line_mut(&mut self, y: usize) -> &mut Line {
        &mut self.active_lines_mut()[y]
    }

    // --- writing -----------------------------------------------------

    /// Writes a single decoded code point at the cursor, following spec
    /// §4.3 "Writing a symbol". Width-2 glyphs occupy two cells; the
    /// continuation cell is the zero-width placeholder draw iteration
    /// skips.
    pub fn write_codepoint(&mut self, cp: u32) {
        let w = width(cp);
        if w == 0 && cp != 0 {
            // Combining mark: append to the previous cell's symbol rather
            // than occupying a new cell.
            if self.cursor_x > 0 {
                let (x, y) = (self.cursor_x - 1, self.cursor_y);
                let attrs = self.active_lines()[y].cell(x).map(|c| c.attrs);
                if let Some(attrs) = attrs {
                    let prev_symbol = self.active_lines()[y].cell(x).unwrap().symbol;
                    let new_symbol = self.registry.append(prev_symbol, cp);
                    let age = self.bump_age();
                    self.active_lines_mut()[y].set_cell(
                        x,
                        Cell {
                            symbol: new_symbol,
                            attrs,
                            age,
                        },
                    );
                }
            }
            return;
        }

        if self.pending_wrap && self.flags.contains(ScreenFlags::AUTO_WRAP) {
            self.newline();
            self.cursor_x = 0;
            self.pending_wrap = false;
        }

        if w == 2 && self.cursor_x + 2 > self.size_x {
            if self.flags.contains(ScreenFlags::AUTO_WRAP) {
                self.newline();
                self.cursor_x = 0;
            } else {
                // Clip: glyph does not fit and auto-wrap is off.
                self.pending_wrap = true;
                return;
            }
        }

        if self.flags.contains(ScreenFlags::INSERT_MODE) {
            self.insert_cells(w as usize);
        }

        let symbol = self.registry.intern(cp);
        let attrs = self.def_attr;
        let age = self.bump_age();
        let (x, y) = (self.cursor_x, self.cursor_y);
        self.active_lines_mut()[y].invalidate_grapheme_at_or_before(x, attrs, age);
        self.active_lines_mut()[y].set_cell(x, Cell { symbol, attrs, age });
        if w == 2 {
            self.active_lines_mut()[y].set_cell(x + 1, Cell::wide_continuation(attrs, age));
        }

        self.cursor_x += w as usize;
        if self.cursor_x >= self.size_x {
            self.cursor_x = self.size_x;
            self.pending_wrap = true;
        }
    }

    /// Moves to column 0 of the next line, scrolling within margins if the
    /// cursor is already on the bottom margin row.
    pub fn newline(&mut self) {
        self.pending_wrap = false;
        if self.cursor_y + 1 >= self.margin_bottom {
            self.scroll_up_within_margins(1);
        } else {
            self.cursor_y += 1;
        }
    }

    pub fn carriage_return(&mut self) {
        self.cursor_x = 0;
        self.pending_wrap = false;
    }

    pub fn backspace(&mut self) {
        self.pending_wrap = false;
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        }
    }

    // --- cursor movement ------------------------------------------------

    fn origin_top(&self) -> usize {
        if self.flags.contains(ScreenFlags::REL_ORIGIN) {
            self.margin_top
        } else {
            0
        }
    }

    fn origin_bottom(&self) -> usize {
        if self.flags.contains(ScreenFlags::REL_ORIGIN) {
            self.margin_bottom
        } else {
            self.size_y
        }
    }

    pub fn move_cursor_to(&mut self, x: usize, y: usize) {
        self.pending_wrap = false;
        let top = self.origin_top();
        let bottom = self.origin_bottom();
        self.cursor_x = x.min(self.size_x.saturating_sub(1));
        self.cursor_y = (top + y).clamp(top, bottom.saturating_sub(1));
    }

    pub fn move_cursor_rel(&mut self, dx: i64, dy: i64) {
        self.pending_wrap = false;
        let top = self.origin_top() as i64;
        let bottom = self.origin_bottom() as i64;
        let x = (self.cursor_x as i64 + dx).clamp(0, self.size_x as i64 - 1);
        let y = (self.cursor_y as i64 + dy).clamp(top, bottom - 1);
        self.cursor_x = x as usize;
        self.cursor_y = y as usize;
    }

    pub fn move_down_scrolling(&mut self, n: usize) {
        for _ in 0..n {
            self.newline();
        }
    }

    pub fn move_up_scrolling(&mut self, n: usize) {
        for _ in 0..n {
            if self.cursor_y == self.margin_top {
                self.scroll_down_within_margins(1);
            } else if self.cursor_y > 0 {
                self.cursor_y -= 1;
            }
        }
    }

    pub fn tab_right(&mut self, n: usize) {
        for _ in 0..n {
            let next = self.tab_stops.next_stop(self.cursor_x);
            self.cursor_x = next.min(self.size_x - 1);
        }
    }

    pub fn tab_left(&mut self, n: usize) {
        for _ in 0..n {
            self.cursor_x = self.tab_stops.prev_stop(self.cursor_x);
        }
    }

    pub fn set_tab_stop(&mut self) {
        self.tab_stops.set(self.cursor_x);
    }

    pub fn clear_tab_stop(&mut self) {
        self.tab_stops.clear(self.cursor_x);
    }

    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.clear_all();
    }

    // --- margins ----------------------------------------------------

    /// Ignores the request outright (leaves margins unchanged) when the
    /// region would be less than two rows tall or would reach past the
    /// screen, matching `tsm_screen_set_margins` (spec §3 invariant
    /// `margin_top < margin_bottom <= size_y`).
    pub fn set_margins(&mut self, top: usize, bottom: usize) {
        if top + 1 >= bottom || bottom > self.size_y {
            return;
        }
        self.margin_top = top;
        self.margin_bottom = bottom;
        self.cursor_x = 0;
        self.cursor_y = self.origin_top();
        self.pending_wrap = false;
    }

    pub fn reset_margins(&mut self) {
        self.margin_top = 0;
        self.margin_bottom = self.size_y;
    }

    // --- scrolling -----------------------------------------------------

    /// Scrolls the margin region up by `n`, evicting top lines to
    /// scroll-back when the margin covers row 0 and the alternate screen
    /// is not active (spec §4.3 "Scroll-back policy").
    pub fn scroll_up_within_margins(&mut self, n: usize) {
        let top = self.margin_top;
        let bottom = self.margin_bottom;
        let evict_to_scrollback = top == 0 && !self.is_alternate();
        for _ in 0..n.min(bottom - top) {
            let evicted = self.active_lines_mut().remove(top);
            let evicted_id = self.active_ids_mut().remove(top);
            let def_attr = self.def_attr;
            let age = self.age_counter;
            self.active_lines_mut()
                .insert(bottom - 1, Line::blank(self.size_x, def_attr, age));
            self.active_ids_mut().insert(bottom - 1, self.alloc_line_id());

            if evict_to_scrollback {
                self.push_scrollback(evicted, evicted_id);
                self.adjust_anchors_for_top_eviction();
            }
        }
        self.bump_age();
    }

    pub fn scroll_down_within_margins(&mut self, n: usize) {
        let top = self.margin_top;
        let bottom = self.margin_bottom;
        for _ in 0..n.min(bottom - top) {
            self.active_lines_mut().remove(bottom - 1);
            self.active_ids_mut().remove(bottom - 1);
            let def_attr = self.def_attr;
            let age = self.age_counter;
            self.active_lines_mut()
                .insert(top, Line::blank(self.size_x, def_attr, age));
            self.active_ids_mut().insert(top, self.alloc_line_id());
        }
        self.bump_age();
    }

    fn alloc_line_id(&mut self) -> u64 {
        let id = self.next_line_id;
        self.next_line_id += 1;
        id
    }

    fn push_scrollback(&mut self, line: Line, id: u64) {
        if self.sb_max == 0 {
            // No room at all: discarded entirely (spec "Boundary
            // behaviors": selection extending past sb_max==0 only sees
            // on-screen content).
            return;
        }
        self.scrollback.push_back(line);
        self.line_ids.push_back(id);
        if self.scrollback.len() > self.sb_max {
            self.scrollback.pop_front();
            self.line_ids.pop_front();
        }
    }

    /// Adjusts selection anchors after a line has left the top of the
    /// visible grid (spec §4.3 "Selection model" and §5 ownership note).
    fn adjust_anchors_for_top_eviction(&mut self) {
        let rebind = |anchor: &mut SelectionAnchor, ids: &VecDeque<u64>, has_room: bool| {
            if let AnchorBinding::Row(y) = anchor.binding {
                if y == 0 {
                    anchor.binding = if has_room {
                        AnchorBinding::StableLine(*ids.back().unwrap())
                    } else {
                        AnchorBinding::Top
                    };
                } else {
                    anchor.binding = AnchorBinding::Row(y - 1);
                }
            }
        };
        let has_room = self.sb_max > 0;
        let ids = self.line_ids.clone();
        rebind(&mut self.selection.start, &ids, has_room);
        rebind(&mut self.selection.end, &ids, has_room);
    }

    pub fn scrollback_up(&mut self, n: usize) {
        self.sb_view_offset = (self.sb_view_offset + n).min(self.scrollback.len());
    }

    pub fn scrollback_down(&mut self, n: usize) {
        self.sb_view_offset = self.sb_view_offset.saturating_sub(n);
    }

    /// `tsm_screen_sb_page_up`: scrolls back a full screen height at a
    /// time, clamped to however much scroll-back actually exists.
    pub fn scrollback_page_up(&mut self) {
        self.scrollback_up(self.size_y);
    }

    /// `tsm_screen_sb_page_down`.
    pub fn scrollback_page_down(&mut self) {
        self.scrollback_down(self.size_y);
    }

    pub fn scrollback_reset(&mut self) {
        self.sb_view_offset = 0;
    }

    pub fn scrollback_view_offset(&self) -> usize {
        self.sb_view_offset
    }

    // --- insert/delete -----------------------------------------------

    pub fn insert_lines(&mut self, n: usize) {
        if self.cursor_y < self.margin_top || self.cursor_y >= self.margin_bottom {
            return;
        }
        let bottom = self.margin_bottom;
        let y = self.cursor_y;
        let def_attr = self.def_attr;
        for _ in 0..n.min(bottom - y) {
            self.active_lines_mut().remove(bottom - 1);
            self.active_ids_mut().remove(bottom - 1);
            let age = self.age_counter;
            self.active_lines_mut()
                .insert(y, Line::blank(self.size_x, def_attr, age));
            let id = self.alloc_line_id();
            self.active_ids_mut().insert(y, id);
        }
        self.bump_age();
    }

    pub fn delete_lines(&mut self, n: usize) {
        if self.cursor_y < self.margin_top || self.cursor_y >= self.margin_bottom {
            return;
        }
        let bottom = self.margin_bottom;
        let y = self.cursor_y;
        let def_attr = self.def_attr;
        for _ in 0..n.min(bottom - y) {
            self.active_lines_mut().remove(y);
            self.active_ids_mut().remove(y);
            let age = self.age_counter;
            self.active_lines_mut()
                .insert(bottom - 1, Line::blank(self.size_x, def_attr, age));
            let id = self.alloc_line_id();
            self.active_ids_mut().insert(bottom - 1, id);
        }
        self.bump_age();
    }

    fn insert_cells(&mut self, n: usize) {
        let (x, y) = (self.cursor_x, self.cursor_y);
        let size_x = self.size_x;
        let def_attr = self.def_attr;
        let age = self.age_counter;
        let last_cell = {
            let line = self.line_mut(y);
            line.ensure_width(size_x, def_attr, age);
            let cells = line.cells_mut();
            let tail_start = x.min(cells.len());
            let shift = n.min(cells.len().saturating_sub(tail_start));
            if shift > 0 && tail_start + shift <= cells.len() {
                cells.copy_within(tail_start..cells.len() - shift, tail_start + shift);
            }
            for cell in cells.iter_mut().skip(tail_start).take(n) {
                *cell = Cell::blank(def_attr, age);
            }
            if shift > 0 {
                cells.last().copied()
            } else {
                None
            }
        };
        // A shift can leave the first half of a wide glyph at the rightmost
        // column with its second half pushed past the edge. Replace the
        // dangling half with a blank rather than draw an orphaned head.
        if let Some(last) = last_cell {
            if !last.attrs.is_wide_continuation() && !last.is_blank() {
                let dangling = width(self.registry.resolve(last.symbol).base()) == 2;
                if dangling {
                    *self.line_mut(y).cells_mut().last_mut().unwrap() = Cell::blank(def_attr, age);
                }
            }
        }
    }

    pub fn insert_chars(&mut self, n: usize) {
        self.insert_cells(n);
        self.bump_age();
    }

    pub fn delete_chars(&mut self, n: usize) {
        let (x, y) = (self.cursor_x, self.cursor_y);
        let size_x = self.size_x;
        let def_attr = self.def_attr;
        let age = self.bump_age();
        let line = self.line_mut(y);
        line.ensure_width(size_x, def_attr, age);
        let cells = line.cells_mut();
        let tail_start = x.min(cells.len());
        let n = n.min(cells.len() - tail_start);
        cells.copy_within(tail_start + n.., tail_start);
        for cell in cells.iter_mut().rev().take(n) {
            *cell = Cell::blank(def_attr, age);
        }
    }

    // --- erase --------------------------------------------------------

    pub fn erase(&mut self, range: EraseRange, protect: bool) {
        let age = self.bump_age();
        let def_attr = self.def_attr;
        let (cx, cy) = (self.cursor_x, self.cursor_y);
        let size_x = self.size_x;
        let size_y = self.size_y;
        let clear_cells = |line: &mut Line, lo: usize, hi: usize| {
            line.ensure_width(size_x, def_attr, age);
            let hi = hi.min(line.len());
            for cell in line.cells_mut()[lo..hi].iter_mut() {
                if !protect || !cell.attrs.protect() {
                    *cell = Cell::blank(def_attr, age);
                }
            }
        };
        match range {
            EraseRange::CursorToEndOfLine => {
                let line = self.line_mut(cy);
                clear_cells(line, cx, size_x);
            }
            EraseRange::HomeToCursorOnLine => {
                let line = self.line_mut(cy);
                clear_cells(line, 0, cx + 1);
            }
            EraseRange::CurrentLine => {
                let line = self.line_mut(cy);
                clear_cells(line, 0, size_x);
            }
            EraseRange::ScreenToCursor => {
                for y in 0..cy {
                    let line = self.line_mut(y);
                    clear_cells(line, 0, size_x);
                }
                let line = self.line_mut(cy);
                clear_cells(line, 0, cx + 1);
            }
            EraseRange::CursorToScreen => {
                let line = self.line_mut(cy);
                clear_cells(line, cx, size_x);
                for y in (cy + 1)..size_y {
                    let line = self.line_mut(y);
                    clear_cells(line, 0, size_x);
                }
            }
            EraseRange::WholeScreen => {
                for y in 0..size_y {
                    let line = self.line_mut(y);
                    clear_cells(line, 0, size_x);
                }
            }
        }
    }

    // --- alternate screen ------------------------------------------------

    /// Switches to/from the alternate screen, preserving the main grid's
    /// contents and cursor (spec §4.3 "Alternate screen").
    pub fn set_alternate(&mut self, enable: bool, clear_on_entry: bool) {
        if enable == self.is_alternate() {
            return;
        }
        self.flags.set(ScreenFlags::ALTERNATE, enable);
        if enable {
            if self.alt_lines.is_none() || clear_on_entry {
                let def_attr = self.def_attr;
                self.alt_lines = Some(
                    (0..self.size_y)
                        .map(|_| Line::blank(self.size_x, def_attr, self.age_counter))
                        .collect(),
                );
                let mut next_id = self.next_line_id;
                self.alt_line_ids = Some(
                    (0..self.size_y)
                        .map(|_| {
                            let id = next_id;
                            next_id += 1;
                            id
                        })
                        .collect(),
                );
                self.next_line_id = next_id;
            }
        }
        self.bump_age();
    }

    // --- resize ---------------------------------------------------------

    /// Resizes to `(w, h)` per spec §4.3 "Resize".
    pub fn resize(&mut self, w: usize, h: usize) {
        let w = w.max(1);
        let h = h.max(1);
        if w == self.size_x && h == self.size_y {
            return;
        }
        self.size_x = w;
        self.tab_stops.resize(w);

        self.resize_population(h, true);
        if self.alt_lines.is_some() {
            self.resize_population(h, false);
        }

        self.size_y = h;
        self.margin_top = 0;
        self.margin_bottom = h;
        self.cursor_x = self.cursor_x.min(w.saturating_sub(1));
        self.cursor_y = self.cursor_y.min(h.saturating_sub(1));
        self.pending_wrap = false;
        self.bump_age();
    }

    fn resize_population(&mut self, h: usize, is_main: bool) {
        let def_attr = self.def_attr;
        let age = self.age_counter;
        let size_x = self.size_x;
        let cursor_y = self.cursor_y;

        let lines: &mut Vec<Line> = if is_main {
            &mut self.main_lines
        } else {
            self.alt_lines.as_mut().unwrap()
        };
        for line in lines.iter_mut() {
            line.ensure_width(size_x, def_attr, age);
        }

        if h > lines.len() {
            let need = h - lines.len();
            // Promote from scroll-back first (main grid only), then pad
            // with blanks.
            if is_main {
                let from_sb = need.min(self.scrollback.len());
                let mut promoted: Vec<Line> = Vec::with_capacity(from_sb);
                let mut promoted_ids: Vec<u64> = Vec::with_capacity(from_sb);
                for _ in 0..from_sb {
                    if let Some(l) = self.scrollback.pop_back() {
                        promoted.push(l);
                    }
                    if let Some(id) = self.line_ids.pop_back() {
                        promoted_ids.push(id);
                    }
                }
                promoted.reverse();
                promoted_ids.reverse();
                for l in &mut promoted {
                    l.ensure_width(size_x, def_attr, age);
                }
                self.main_lines.splice(0..0, promoted);
                self.main_line_ids.splice(0..0, promoted_ids);
            }
            let lines: &mut Vec<Line> = if is_main {
                &mut self.main_lines
            } else {
                self.alt_lines.as_mut().unwrap()
            };
            let remaining = h.saturating_sub(lines.len());
            for _ in 0..remaining {
                lines.push(Line::blank(size_x, def_attr, age));
            }
            let ids: &mut Vec<u64> = if is_main {
                &mut self.main_line_ids
            } else {
                self.alt_line_ids.as_mut().unwrap()
            };
            while ids.len() < lines.len() {
                let id = self.next_line_id;
                self.next_line_id += 1;
                ids.push(id);
            }
        } else if h < lines.len() {
            let excess = lines.len() - h;
            if is_main {
                // Evict from the top into scroll-back; the alternate
                // population (is_main == false) just truncates below.
                for _ in 0..excess.min(cursor_y) {
                    if self.main_lines.is_empty() {
                        break;
                    }
                    let evicted = self.main_lines.remove(0);
                    let id = self.main_line_ids.remove(0);
                    self.push_scrollback(evicted, id);
                    self.cursor_y = self.cursor_y.saturating_sub(1);
                }
            }
            let lines: &mut Vec<Line> = if is_main {
                &mut self.main_lines
            } else {
                self.alt_lines.as_mut().unwrap()
            };
            let ids: &mut Vec<u64> = if is_main {
                &mut self.main_line_ids
            } else {
                self.alt_line_ids.as_mut().unwrap()
            };
            while lines.len() > h {
                lines.pop();
                ids.pop();
            }
        }
    }

    // --- reset ------------------------------------------------------

    pub fn reset(&mut self) {
        let (w, h) = (self.size_x, self.size_y);
        let config = self.config.clone();
        *self = Screen::new(w, h, config);
    }

    // --- selection --------------------------------------------------

    pub fn selection_start(&mut self, x: usize, y: usize) {
        let row = self.row_to_doc_row(y);
        self.selection.start(SelectionAnchor {
            binding: AnchorBinding::Row(row as i64),
            x: x as i32,
        });
    }

    pub fn selection_target(&mut self, x: usize, y: usize) {
        let row = self.row_to_doc_row(y);
        self.selection.extend_to(SelectionAnchor {
            binding: AnchorBinding::Row(row as i64),
            x: x as i32,
        });
    }

    pub fn selection_reset(&mut self) {
        self.selection.reset();
    }

    /// Anchors use the row index within `main_lines` directly; there is no
    /// extra translation needed since anchors are only meaningful for the
    /// main grid (alternate-screen selection is not part of this spec's
    /// scope beyond what §4.3 already implies).
    fn row_to_doc_row(&self, y: usize) -> usize {
        y
    }

    /// Normalizes an anchor into a `DocPos`: `StableLine` ids resolve via
    /// their position in the combined (scroll-back ++ main) timeline;
    /// `Row` resolves to `scrollback.len() + y`; `Top` resolves to
    /// `i64::MIN` so it always sorts first.
    fn anchor_doc_pos(&self, anchor: &SelectionAnchor) -> DocPos {
        let row = match anchor.binding {
            AnchorBinding::Top => crate::selection::SELECTION_TOP,
            AnchorBinding::Row(y) => self.scrollback.len() as i64 + y,
            AnchorBinding::StableLine(id) => self
                .line_ids
                .iter()
                .position(|&lid| lid == id)
                .map(|pos| pos as i64)
                .unwrap_or(crate::selection::SELECTION_TOP),
        };
        DocPos { row, col: anchor.x }
    }

    /// Renders the active selection to plain text, per spec §4.3
    /// "Selection model". Returns `None` if there is no active selection
    /// (maps to `Error::NoSelection` at the Facade).
    pub fn selection_copy(&self) -> Option<String> {
        if !self.selection.active {
            return None;
        }
        let mut start = self.anchor_doc_pos(&self.selection.start);
        let mut end = self.anchor_doc_pos(&self.selection.end);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }

        let mut out = String::new();
        let total_sb = self.scrollback.len() as i64;
        let mut row = start.row.max(0);
        let mut first = true;
        while row <= end.row {
            let line = if row < total_sb {
                self.scrollback.get(row as usize)
            } else {
                let idx = (row - total_sb) as usize;
                self.main_lines.get(idx)
            };
            let Some(line) = line else { row += 1; continue; };
            let real_len = line.real_len(self.size_x);
            let cols = cols_for_row(start, end, row, real_len);
            if !first {
                out.push('\n');
            }
            first = false;
            for x in cols {
                if let Some(cell) = line.cell(x) {
                    if cell.attrs.is_wide_continuation() {
                        continue;
                    }
                    if let Some(c) = self.registry.base_char(cell.symbol) {
                        if c != '\0' {
                            out.push(c);
                        } else {
                            out.push(' ');
                        }
                    } else {
                        out.push(' ');
                    }
                }
            }
            row += 1;
        }
        Some(out)
    }

    // --- draw -------------------------------------------------------

    /// Visits every visible cell in row-major order (spec §4.3 "Draw
    /// iteration"). Returns the `age_counter` value as of the start of the
    /// pass. `callback` returning `true` stops the pass early.
    pub fn draw<F: FnMut(&DrawCell) -> bool>(&self, mut callback: F) -> AgeTick {
        let start_age = self.age_counter;
        let hide_cursor = self.flags.contains(ScreenFlags::HIDE_CURSOR);
        let scrolled_away = self.sb_view_offset > 0;
        'rows: for y in 0..self.size_y {
            let line = self.visible_line(y);
            for x in 0..self.size_x {
                let cell = match line.cell(x) {
                    Some(c) => c,
                    None => continue,
                };
                if cell.attrs.is_wide_continuation() {
                    continue;
                }
                let base_cp = self.registry.resolve(cell.symbol).base();
                let w = if cell.is_blank() { 1 } else { width(base_cp).max(1) };
                let is_cursor = !hide_cursor
                    && !scrolled_away
                    && x == self.cursor_x.min(self.size_x - 1)
                    && y == self.cursor_y;
                let draw_cell = DrawCell {
                    col: x,
                    row: y,
                    symbol: cell.symbol,
                    width: w.max(1),
                    attrs: cell.attrs,
                    age: cell.age,
                    is_cursor,
                };
                if callback(&draw_cell) {
                    break 'rows;
                }
            }
        }
        start_age
    }

    /// Resolves row `y` of the current draw pass to a line, pulling from
    /// scroll-back when the view has been paged back (spec §4.3 "Draw
    /// iteration" / "scroll-back up/down"). The alternate screen has no
    /// scroll-back, so paging never applies there.
    fn visible_line(&self, y: usize) -> &Line {
        if self.is_alternate() || self.sb_view_offset == 0 {
            return &self.active_lines()[y];
        }
        let total_sb = self.scrollback.len();
        let start = total_sb.saturating_sub(self.sb_view_offset);
        let abs = start + y;
        if abs < total_sb {
            &self.scrollback[abs]
        } else {
            &self.main_lines[abs - total_sb]
        }
    }

    pub fn resolve_color(&self, attr: ColorAttribute) -> ColorAttribute {
        attr
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("size", &(self.size_x, self.size_y))
            .field("cursor", &(self.cursor_x, self.cursor_y))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::DefaultTerminalConfig;
    use std::sync::Arc;

    fn screen(w: usize, h: usize) -> Screen {
        Screen::new(w, h, Arc::new(DefaultTerminalConfig))
    }

    fn write_str(s: &mut Screen, text: &str) {
        for c in text.chars() {
            s.write_codepoint(c as u32);
        }
    }

    #[test]
    fn hello_scenario() {
        let mut s = screen(80, 40);
        write_str(&mut s, "Hello");
        assert_eq!(s.cursor(), (5, 0));
        let mut seen = Vec::new();
        s.draw(|c| {
            if c.row == 0 && c.col < 5 {
                seen.push(s.registry().base_char(c.symbol).unwrap());
            }
            false
        });
        assert_eq!(seen, vec!['H', 'e', 'l', 'l', 'o']);
    }

    #[test]
    fn pending_wrap_at_last_column_not_wrap_yet() {
        let mut s = screen(5, 2);
        write_str(&mut s, "Hello");
        assert_eq!(s.cursor(), (5, 0));
        assert!(s.pending_wrap);
        s.write_codepoint('!' as u32);
        assert_eq!(s.cursor(), (1, 1));
    }

    #[test]
    fn alternate_screen_preserves_main() {
        let mut s = screen(80, 24);
        write_str(&mut s, "ABC");
        s.set_alternate(true, true);
        s.move_cursor_to(0, 0);
        write_str(&mut s, "XYZ");
        s.set_alternate(false, true);
        let mut row0 = String::new();
        s.draw(|c| {
            if c.row == 0 && c.col < 3 {
                row0.push(s.registry().base_char(c.symbol).unwrap());
            }
            false
        });
        assert_eq!(row0, "ABC");
    }

    #[test]
    fn insert_shift_blanks_dangling_wide_half() {
        let mut s = screen(4, 1);
        write_str(&mut s, "\u{4f60}\u{597d}"); // two wide glyphs, filling all 4 columns
        s.move_cursor_to(0, 0);
        s.insert_chars(1);
        let mut last_col_is_blank = false;
        s.draw(|c| {
            if c.col == 3 {
                last_col_is_blank = c.symbol == crate::symbol::SymbolId::NUL;
            }
            false
        });
        assert!(last_col_is_blank, "dangling wide-glyph half should be replaced with a blank");
    }

    #[test]
    fn set_margins_rejects_region_past_screen() {
        let mut s = screen(80, 24);
        s.set_margins(29, 30); // \x1b[30r on a 24-row screen: top clamps to 29
        assert_eq!(s.margin_top, 0);
        assert_eq!(s.margin_bottom, 24);
        // A subsequent scroll must not index past the grid.
        s.newline();
    }

    #[test]
    fn set_margins_rejects_sub_two_row_region() {
        let mut s = screen(80, 24);
        s.set_margins(5, 5);
        assert_eq!(s.margin_top, 0);
        assert_eq!(s.margin_bottom, 24);
    }

    #[test]
    fn set_margins_accepts_valid_region() {
        let mut s = screen(80, 24);
        s.set_margins(2, 10);
        assert_eq!(s.margin_top, 2);
        assert_eq!(s.margin_bottom, 10);
    }

    #[test]
    fn scroll_with_nonzero_top_margin_does_not_touch_selection_anchor() {
        let mut s = screen(80, 24);
        write_str(&mut s, "Hello");
        s.selection_start(0, 0);
        s.selection_target(4, 0);
        s.set_margins(1, 24);
        s.move_cursor_to(0, 1);
        s.scroll_up_within_margins(3);
        // Row 0 never moved, so the selection over it must be untouched.
        let text = s.selection_copy().unwrap();
        assert_eq!(text, "Hello");
    }

    #[test]
    fn scrollback_page_up_and_down_clamp_to_available_lines() {
        let mut s = Screen::new(80, 24, Arc::new(SbConfig(100)));
        for _ in 0..10 {
            s.newline();
        }
        s.scrollback_page_up();
        assert_eq!(s.scrollback_view_offset(), 10);
        s.scrollback_page_down();
        assert_eq!(s.scrollback_view_offset(), 0);
    }

    #[test]
    fn scrollback_selection_survives_scroll() {
        let mut s = Screen::new(80, 40, Arc::new(SbConfig(10)));
        write_str(&mut s, "Hello World!");
        s.selection_start(0, 0);
        s.selection_target(11, 0);
        for _ in 0..40 {
            s.newline();
        }
        let text = s.selection_copy().unwrap();
        assert_eq!(text, "Hello World!");
    }

    #[derive(Debug)]
    struct SbConfig(usize);
    impl TerminalConfiguration for SbConfig {
        fn scrollback_size(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn erase_to_cursor_respects_protect() {
        let mut s = screen(10, 1);
        let mut attrs = s.def_attr();
        attrs.set_protect(true);
        s.set_def_attr(attrs);
        write_str(&mut s, "AB");
        s.set_def_attr(CellAttrs::default());
        write_str(&mut s, "CD");
        s.move_cursor_to(3, 0);
        s.erase(EraseRange::HomeToCursorOnLine, true);
        let a = s.active_lines()[0].cell(0).unwrap();
        assert!(!a.is_blank());
    }

    #[test]
    fn resize_stability() {
        let mut s = screen(80, 24);
        write_str(&mut s, "hi");
        s.resize(100, 30);
        s.resize(100, 30);
        assert_eq!(s.size(), (100, 30));
    }
}
