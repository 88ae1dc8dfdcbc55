use log::debug;
use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

use crate::completion::Completions;
use crate::line_buffer::LineBuffer;
use crate::terminal::{
    reset_color_sequence, set_color_sequence, HintColors, TerminalOutput, ERASE_BELOW,
};

/// Identifies one completion request. Results carrying an outdated ticket are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Previous,
    Next,
}

/// The suggestion session opened by Tab.
///
/// While running, `suggestions` holds the candidate suffixes still compatible
/// with the line and `position` the highlighted one. The highlighted suffix
/// is drawn after the cursor in a hint colour and is not part of the line
/// until accepted.
#[derive(Debug, Default)]
pub struct Autocomplete {
    suggestions: Vec<String>,
    position: usize,
    option_menu: bool,
    generation: u64,
    colors: HintColors,
}

impl Autocomplete {
    pub fn new(colors: HintColors) -> Self {
        Self {
            colors,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        !self.suggestions.is_empty()
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_option_menu(&self) -> bool {
        self.option_menu
    }

    pub fn selected(&self) -> Option<&str> {
        self.suggestions.get(self.position).map(String::as_str)
    }

    /// Open a completion request, superseding any earlier one.
    pub fn request(&mut self) -> CompletionTicket {
        self.generation += 1;
        CompletionTicket(self.generation)
    }

    /// Supersede outstanding requests after the line changed.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    fn is_current(&self, ticket: CompletionTicket) -> bool {
        if ticket.0 == self.generation {
            return true;
        }
        debug!(
            "Dropping completion results of request {} (current is {})",
            ticket.0, self.generation
        );
        false
    }

    /// Forget the session without touching the screen.
    pub fn reset(&mut self) {
        self.suggestions.clear();
        self.position = 0;
        self.option_menu = false;
    }

    /// First Tab. Consumes the common prefix of all candidates into the line;
    /// a lone candidate is accepted outright. Returns true when the accepted
    /// text entered a directory, so the caller should [`descend`].
    ///
    /// [`descend`]: Autocomplete::descend
    pub fn start(
        &mut self,
        ticket: CompletionTicket,
        completions: Completions,
        buffer: &mut LineBuffer,
        out: &mut dyn TerminalOutput,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.reset();
        let Completions {
            mut suggestions,
            option_menu,
        } = completions;

        let prefix = longest_common_prefix(&suggestions);
        for suggestion in &mut suggestions {
            suggestion.replace_range(..prefix.len(), "");
        }
        buffer.commit(&prefix, out);

        if suggestions.len() > 1 {
            self.suggestions = suggestions;
            self.option_menu = option_menu;
            self.render(buffer, out);
            return false;
        }
        if !prefix.is_empty() && !buffer.after().is_empty() {
            buffer.redraw_after(out);
        }
        prefix.ends_with('/')
    }

    /// Whether the line just entered a directory whose entries should be
    /// offered next.
    pub fn wants_descent(&self, buffer: &LineBuffer) -> bool {
        buffer.before().ends_with('/') && self.selected().map_or(true, str::is_empty)
    }

    /// Offer the entries of the directory the line now ends in, without
    /// consuming anything into the line.
    pub fn descend(
        &mut self,
        ticket: CompletionTicket,
        completions: Completions,
        buffer: &LineBuffer,
        out: &mut dyn TerminalOutput,
    ) {
        if !self.is_current(ticket) {
            return;
        }
        self.suggestions = completions.suggestions;
        self.option_menu = completions.option_menu;
        self.position = 0;
        if self.is_running() {
            self.render(buffer, out);
        }
    }

    /// Keep only the suggestions compatible with `typed`, which the caller
    /// has already appended to the line.
    pub fn narrow(&mut self, typed: &str, buffer: &mut LineBuffer, out: &mut dyn TerminalOutput) {
        let Some(current) = self.selected().map(str::to_string) else {
            return;
        };

        if self.option_menu {
            let with_argument = format!("{} ", typed);
            if self.suggestions.contains(&with_argument) {
                self.commit_argument_option(&with_argument, &current, buffer, out);
                return;
            }
            self.suggestions
                .retain(|s| s != typed && (s.starts_with(typed) || is_option_token(s)));
        } else {
            self.suggestions.retain(|s| s.starts_with(typed));
        }

        match self.suggestions.len() {
            0 => self.cancel(buffer, out),
            1 => {
                let only = self.suggestions[0].clone();
                match only.strip_prefix(typed) {
                    Some(rest) => self.finish(rest, buffer, out),
                    None => self.cancel(buffer, out),
                }
            }
            _ => {
                let option_menu = self.option_menu;
                self.position = self.position.min(self.suggestions.len() - 1);
                for (i, suggestion) in self.suggestions.iter_mut().enumerate() {
                    if *suggestion == current {
                        self.position = i;
                    }
                    if !option_menu || !is_option_token(suggestion) {
                        suggestion.replace_range(..typed.len(), "");
                    }
                }
                let prefix = longest_common_prefix(&self.suggestions);
                for suggestion in &mut self.suggestions {
                    suggestion.replace_range(..prefix.len(), "");
                }
                buffer.commit(&prefix, out);
                self.render(buffer, out);
            }
        }
    }

    /// An option taking an argument was typed: the letter menu is over and
    /// only history matches continuing past the option survive.
    fn commit_argument_option(
        &mut self,
        option: &str,
        current: &str,
        buffer: &mut LineBuffer,
        out: &mut dyn TerminalOutput,
    ) {
        self.suggestions
            .retain(|s| s != option && s.starts_with(option));
        buffer.commit(" ", out);
        self.option_menu = false;
        if self.suggestions.is_empty() {
            self.cancel(buffer, out);
            return;
        }
        self.position = 0;
        for (i, suggestion) in self.suggestions.iter_mut().enumerate() {
            if suggestion == current {
                self.position = i;
            }
            suggestion.replace_range(..option.len(), "");
        }
        self.render(buffer, out);
    }

    /// Tab while running: insert the highlighted option, or the next word of
    /// the highlighted suggestion.
    pub fn accept_selected(&mut self, buffer: &mut LineBuffer, out: &mut dyn TerminalOutput) {
        if !self.option_menu {
            self.accept_next_word(buffer, out);
            return;
        }
        let Some(option) = self.selected().map(str::to_string) else {
            return;
        };
        buffer.commit(&option, out);
        self.narrow(&option, buffer, out);
    }

    /// Accept the highlighted suggestion up to its next word boundary, so
    /// repeated presses walk a path one component at a time.
    pub fn accept_next_word(&mut self, buffer: &mut LineBuffer, out: &mut dyn TerminalOutput) {
        let Some(selected) = self.selected().map(str::to_string) else {
            return;
        };
        let word = next_word(&selected);
        if word.is_empty() {
            self.cancel(buffer, out);
            return;
        }
        buffer.commit(word, out);
        self.narrow(word, buffer, out);
    }

    /// Enter while running: the whole highlighted suggestion joins the line.
    pub fn commit_selected(&mut self, buffer: &mut LineBuffer, out: &mut dyn TerminalOutput) {
        if let Some(selected) = self.selected().map(str::to_string) {
            buffer.commit(&selected, out);
        }
        self.reset();
    }

    pub fn cycle(&mut self, direction: Cycle, buffer: &LineBuffer, out: &mut dyn TerminalOutput) {
        let count = self.suggestions.len();
        if count == 0 {
            return;
        }
        self.position = match direction {
            Cycle::Previous => (self.position + count - 1) % count,
            Cycle::Next => (self.position + 1) % count,
        };
        self.render(buffer, out);
    }

    /// Drop the session and wipe the hint.
    pub fn cancel(&mut self, buffer: &LineBuffer, out: &mut dyn TerminalOutput) {
        self.reset();
        out.feed(ERASE_BELOW);
        out.clear_to_end_of_line();
        out.save_cursor_position();
        out.feed(buffer.after());
        out.restore_cursor_position();
    }

    fn finish(&mut self, rest: &str, buffer: &mut LineBuffer, out: &mut dyn TerminalOutput) {
        self.reset();
        out.feed(ERASE_BELOW);
        out.clear_to_end_of_line();
        buffer.commit(rest, out);
        out.save_cursor_position();
        out.feed(buffer.after());
        out.restore_cursor_position();
    }

    fn render(&self, buffer: &LineBuffer, out: &mut dyn TerminalOutput) {
        let Some(selected) = self.selected() else {
            return;
        };
        out.save_cursor_position();
        out.feed(ERASE_BELOW);
        out.clear_to_end_of_line();
        out.feed(&set_color_sequence(self.colors.for_output(out)));
        out.feed(selected);
        out.feed(&reset_color_sequence());
        out.feed(buffer.after());
        out.restore_cursor_position();
    }
}

/// Longest prefix shared by every string, cut on grapheme boundaries.
pub fn longest_common_prefix(strings: &[String]) -> String {
    let Some((first, rest)) = strings.split_first() else {
        return String::new();
    };
    let mut end = first.len();
    for s in rest {
        let common: usize = first[..end]
            .graphemes(true)
            .zip(s.graphemes(true))
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len())
            .sum();
        end = common;
    }
    first[..end].to_string()
}

/// Single letter, or letter plus space: an entry of the option menu.
fn is_option_token(suggestion: &str) -> bool {
    let mut chars = suggestion.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(_), None, _) => true,
        (Some(_), Some(' '), None) => true,
        _ => false,
    }
}

fn word_runs() -> &'static Regex {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"\w+|\W+").expect("word run pattern is valid"))
}

/// Leading part of `suggestion` up to and including its first word, where
/// lone spaces and slashes do not count as words.
pub fn next_word(suggestion: &str) -> &str {
    for run in word_runs().find_iter(suggestion) {
        let text = run.as_str();
        if text != " " && text != "/" {
            return &suggestion[..run.end()];
        }
    }
    suggestion
}
