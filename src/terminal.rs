use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::Command;

/// Cursor one column left.
pub const CURSOR_LEFT: &str = "\u{1b}[D";
/// Cursor one column right.
pub const CURSOR_RIGHT: &str = "\u{1b}[C";
/// Delete the character under the cursor, shifting the rest of the line left.
pub const DELETE_CHAR: &str = "\u{1b}[P";
/// Erase from the cursor to the end of the display.
pub const ERASE_BELOW: &str = "\u{1b}[0J";

/// The rendering side of a terminal tab, as seen by the editor.
///
/// Implemented by the terminal widget. Every method is a fire-and-forget
/// instruction except the metric and query methods.
pub trait TerminalOutput {
    fn feed(&mut self, text: &str);
    fn clear_to_end_of_line(&mut self);
    fn save_cursor_position(&mut self);
    fn restore_cursor_position(&mut self);
    /// Step back onto the previous row when the cursor sits at a wrap point.
    fn move_up_if_wrapped(&mut self);
    /// Step onto the next row when the cursor sits at the right margin.
    fn move_down_if_wrapped(&mut self);
    fn move_to_beginning_of_line(&mut self);
    /// Remember the current cursor position as the end of the prompt.
    fn mark_prompt_end(&mut self);
    /// Move the cursor to a zero-based screen cell and return its distance,
    /// in columns, from the end of the prompt.
    fn place_cursor(&mut self, column: u16, row: u16) -> Option<isize>;
    /// Rendered width of a plain single-column character in the current font.
    fn reference_char_width(&self) -> f64;
    /// Rendered width of one glyph in the current font.
    fn measure_glyph(&self, glyph: &str) -> f64;
    fn foreground_brightness(&self) -> f64;
    fn background_brightness(&self) -> f64;
    /// Text of the last prompt line printed by the foreground program.
    fn last_prompt_line(&self) -> Option<String>;
    fn flush(&mut self) {}
}

/// Colours used for the highlighted suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintColors {
    pub dark: Color,
    pub light: Color,
}

impl Default for HintColors {
    fn default() -> Self {
        Self {
            dark: Color::DarkYellow,
            light: Color::DarkGreen,
        }
    }
}

impl HintColors {
    /// Pick the colour contrasting with the current background.
    pub fn for_output(&self, output: &dyn TerminalOutput) -> Color {
        if output.foreground_brightness() > output.background_brightness() {
            self.dark
        } else {
            self.light
        }
    }
}

pub fn set_color_sequence(color: Color) -> String {
    ansi_of(&SetForegroundColor(color))
}

pub fn reset_color_sequence() -> String {
    ansi_of(&ResetColor)
}

fn ansi_of(command: &impl Command) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = command.write_ansi(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingOutput;

    #[test]
    fn test_dark_background_uses_dark_hint() {
        let output = RecordingOutput::new();
        output.set_brightness(0.9, 0.1);
        let colors = HintColors::default();
        assert_eq!(colors.for_output(&output), Color::DarkYellow);
    }

    #[test]
    fn test_light_background_uses_light_hint() {
        let output = RecordingOutput::new();
        output.set_brightness(0.1, 0.9);
        let colors = HintColors::default();
        assert_eq!(colors.for_output(&output), Color::DarkGreen);
    }

    #[test]
    fn test_color_sequences() {
        assert_eq!(set_color_sequence(Color::DarkYellow), "\u{1b}[38;5;3m");
        assert_eq!(reset_color_sequence(), "\u{1b}[0m");
    }
}
