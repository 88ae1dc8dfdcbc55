use unicode_segmentation::UnicodeSegmentation;

use crate::terminal::{TerminalOutput, CURSOR_LEFT, CURSOR_RIGHT, DELETE_CHAR};
use crate::width::WidthModel;

/// The command line being edited, split at the cursor.
///
/// `before + after` is always the full line and neither half holds a line
/// break. Every mutation emits the feed instructions that keep the on-screen
/// line in sync without re-rendering it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    before: String,
    after: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> &str {
        &self.after
    }

    pub fn line(&self) -> String {
        format!("{}{}", self.before, self.after)
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Type `text` at the cursor and redraw whatever follows it.
    pub fn insert(&mut self, text: &str, out: &mut dyn TerminalOutput) {
        self.commit(text, out);
        if !self.after.is_empty() {
            self.redraw_after(out);
        }
    }

    /// Append `text` to `before` and feed it, leaving the redraw of `after`
    /// to the caller.
    pub fn commit(&mut self, text: &str, out: &mut dyn TerminalOutput) {
        debug_assert!(!text.contains(|c| c == '\n' || c == '\r'));
        if text.is_empty() {
            return;
        }
        self.before.push_str(text);
        out.feed(text);
    }

    pub fn delete_backward(&mut self, widths: &WidthModel, out: &mut dyn TerminalOutput) -> bool {
        let Some(glyph) = pop_last_glyph(&mut self.before) else {
            return false;
        };
        out.move_up_if_wrapped();
        for _ in 0..widths.columns(&glyph, out) {
            out.feed(CURSOR_LEFT);
            out.feed(DELETE_CHAR);
        }
        if !self.after.is_empty() {
            self.redraw_after(out);
        }
        true
    }

    pub fn delete_forward(&mut self, widths: &WidthModel, out: &mut dyn TerminalOutput) -> bool {
        let Some(glyph) = pop_first_glyph(&mut self.after) else {
            return false;
        };
        for _ in 0..widths.columns(&glyph, out) {
            out.feed(DELETE_CHAR);
        }
        true
    }

    pub fn move_left(&mut self, widths: &WidthModel, out: &mut dyn TerminalOutput) -> bool {
        let Some(glyph) = pop_last_glyph(&mut self.before) else {
            return false;
        };
        out.move_up_if_wrapped();
        for _ in 0..widths.columns(&glyph, out) {
            out.feed(CURSOR_LEFT);
        }
        self.after.insert_str(0, &glyph);
        true
    }

    pub fn move_right(&mut self, widths: &WidthModel, out: &mut dyn TerminalOutput) -> bool {
        let Some(glyph) = pop_first_glyph(&mut self.after) else {
            return false;
        };
        out.move_down_if_wrapped();
        for _ in 0..widths.columns(&glyph, out) {
            out.feed(CURSOR_RIGHT);
        }
        self.before.push_str(&glyph);
        true
    }

    /// Re-split the line so the cursor sits `distance` columns after the
    /// prompt. The cut lands after the first glyph whose accumulated width
    /// reaches `distance`.
    pub fn move_cursor_to(&mut self, distance: isize, widths: &WidthModel, out: &dyn TerminalOutput) {
        let line = self.line();
        let Ok(distance) = usize::try_from(distance) else {
            self.before.clear();
            self.after = line;
            return;
        };
        if distance == 0 {
            self.before.clear();
            self.after = line;
            return;
        }
        let mut columns = 0;
        let mut cut = line.len();
        for (offset, glyph) in line.grapheme_indices(true) {
            columns += widths.columns(glyph, out);
            if columns >= distance {
                cut = offset + glyph.len();
                break;
            }
        }
        self.after = line[cut..].to_string();
        self.before = line[..cut].to_string();
    }

    /// Replace the whole line, cursor at the end. Rendering is up to the caller.
    pub fn replace(&mut self, text: &str) {
        self.before = text.to_string();
        self.after.clear();
    }

    /// Empty the buffer and return the full line.
    pub fn take_line(&mut self) -> String {
        let line = self.line();
        self.before.clear();
        self.after.clear();
        line
    }

    /// Print `after` without moving the cursor.
    pub fn redraw_after(&self, out: &mut dyn TerminalOutput) {
        out.save_cursor_position();
        out.clear_to_end_of_line();
        out.feed(&self.after);
        out.restore_cursor_position();
    }
}

fn pop_last_glyph(text: &mut String) -> Option<String> {
    let (offset, glyph) = text.grapheme_indices(true).next_back()?;
    let glyph = glyph.to_string();
    text.truncate(offset);
    Some(glyph)
}

fn pop_first_glyph(text: &mut String) -> Option<String> {
    let glyph = text.graphemes(true).next()?.to_string();
    text.replace_range(..glyph.len(), "");
    Some(glyph)
}
