use log::{debug, warn};
use std::borrow::Cow;

use crate::autocomplete::{Autocomplete, Cycle};
use crate::bookmarks::BookmarkStore;
use crate::completion::{self, CompletionContext, Completions};
use crate::config::{EditorConfig, PassthroughConfig};
use crate::environment::EnvironmentSource;
use crate::escape::{self, Arrow, InputEvent};
use crate::foreground::{ForegroundController, ForegroundState};
use crate::history::{History, HistoryDirection};
use crate::line_buffer::LineBuffer;
use crate::resolver::CommandResolver;
use crate::terminal::TerminalOutput;
use crate::width::WidthModel;

/// The parts of the world a session talks to.
pub struct Collaborators {
    pub output: Box<dyn TerminalOutput>,
    pub foreground: Box<dyn ForegroundController>,
    pub resolver: Box<dyn CommandResolver>,
    pub bookmarks: Box<dyn BookmarkStore>,
    pub environment: Box<dyn EnvironmentSource>,
}

/// Line editing state of one terminal tab.
///
/// Every keystroke goes through [`Session::handle_input`], which either
/// forwards it to the foreground program or edits the line, and emits the
/// matching feed instructions before returning.
pub struct Session {
    buffer: LineBuffer,
    line_history: History,
    command_input_history: History,
    last_foreground_kind: Option<String>,
    foreground: ForegroundState,
    control_armed: bool,
    autocomplete: Autocomplete,
    widths: WidthModel,
    passthrough: PassthroughConfig,
    size: Option<(u16, u16)>,
    output: Box<dyn TerminalOutput>,
    controller: Box<dyn ForegroundController>,
    resolver: Box<dyn CommandResolver>,
    bookmarks: Box<dyn BookmarkStore>,
    environment: Box<dyn EnvironmentSource>,
}

impl Session {
    pub fn new(config: &EditorConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            output,
            foreground,
            resolver,
            bookmarks,
            environment,
        } = collaborators;
        let widths = WidthModel::new(config.display.width_model, output.as_ref());
        Self {
            buffer: LineBuffer::new(),
            line_history: History::new(config.history.line_limit),
            command_input_history: History::new(Some(config.history.command_input_limit)),
            last_foreground_kind: None,
            foreground: ForegroundState::default(),
            control_armed: false,
            autocomplete: Autocomplete::new(config.hint_colors()),
            widths,
            passthrough: config.passthrough.clone(),
            size: None,
            output,
            controller: foreground,
            resolver,
            bookmarks,
            environment,
        }
    }

    pub fn before(&self) -> &str {
        self.buffer.before()
    }

    pub fn after(&self) -> &str {
        self.buffer.after()
    }

    pub fn line(&self) -> String {
        self.buffer.line()
    }

    pub fn autocomplete(&self) -> &Autocomplete {
        &self.autocomplete
    }

    pub fn line_history(&self) -> &History {
        &self.line_history
    }

    pub fn command_input_history(&self) -> &History {
        &self.command_input_history
    }

    pub fn foreground(&self) -> &ForegroundState {
        &self.foreground
    }

    /// Apply the control modifier to the next chunk only.
    pub fn arm_control(&mut self) {
        self.control_armed = true;
    }

    pub fn is_control_armed(&self) -> bool {
        self.control_armed
    }

    /// Report a change of the foreground command. Starting or ending one
    /// drops any suggestion session; a different kind of command starts with
    /// an empty input history.
    pub fn update_foreground(&mut self, state: ForegroundState) {
        if state.is_active() != self.foreground.is_active() {
            self.autocomplete.reset();
            self.autocomplete.invalidate();
        }
        if state.kind() != self.last_foreground_kind.as_deref() {
            self.command_input_history.reset();
            self.last_foreground_kind = state.kind().map(str::to_string);
        }
        debug!("Foreground is now {:?}", state);
        self.foreground = state;
    }

    pub fn handle_input(&mut self, bytes: &[u8]) {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text),
            Err(e) => {
                warn!("Input is not valid UTF-8 ({}), decoding lossily", e);
                String::from_utf8_lossy(bytes)
            }
        };
        self.handle_text(&text);
        self.output.flush();
    }

    /// Tell the foreground program and the environment about a new window
    /// size. Repeated reports of the same size are ignored.
    pub fn handle_resize(&mut self, columns: u16, rows: u16) {
        if self.size == Some((columns, rows)) {
            return;
        }
        debug!("Terminal resized to {}x{}", columns, rows);
        self.size = Some((columns, rows));
        self.controller.resize(columns, rows);
        self.environment.set_var("COLUMNS", &columns.to_string());
        self.environment.set_var("LINES", &rows.to_string());
    }

    fn handle_text(&mut self, text: &str) {
        if self.foreground.is_active() && self.buffer.is_empty() {
            self.output.mark_prompt_end();
        }
        let text = if std::mem::take(&mut self.control_armed) {
            Cow::Owned(escape::apply_control_modifier(text))
        } else {
            Cow::Borrowed(text)
        };

        if self.foreground.is_active() && self.pass_through(&text) {
            return;
        }
        self.edit(escape::decode(&text));
    }

    /// Forward `text` to the foreground program when it owns the input.
    /// Returns false when the editor should handle it.
    fn pass_through(&mut self, text: &str) -> bool {
        if self.foreground.pager {
            if self.controller.has_pager_channel() {
                if let Err(e) = self.controller.write_pager(text.as_bytes()) {
                    debug!("Pager input dropped: {}", e);
                }
            }
            return true;
        }

        if self.foreground.sandboxed {
            if self.controller.sandbox_alive() {
                if let Err(e) = self.controller.forward_to_sandbox(text) {
                    debug!("Sandbox input dropped: {}", e);
                }
                return true;
            }
            debug!("Sandboxed command stopped without notice, ending it");
            self.controller.end_sandbox();
            self.foreground.sandboxed = false;
        }

        if !self.foreground.interactive || self.at_line_edited_prompt() {
            return false;
        }
        if self.controller.has_input_channel() {
            if let Err(e) = self.controller.write_input(text.as_bytes()) {
                debug!("Foreground input dropped: {}", e);
            }
        }
        true
    }

    fn at_line_edited_prompt(&self) -> bool {
        let Some(command) = self.foreground.command.as_deref() else {
            return false;
        };
        let prompt_line = self.output.last_prompt_line();
        self.passthrough
            .is_line_edited(command, prompt_line.as_deref())
    }

    fn edit(&mut self, event: InputEvent) {
        debug!("Editing event {:?}", event);
        match event {
            InputEvent::Pointer { column, row, .. } => self.place_cursor(column, row),
            InputEvent::EndOfTransmission => self.end_of_transmission(),
            InputEvent::Interrupt => self.interrupt(),
            InputEvent::Backspace => {
                if self.autocomplete.is_running() {
                    self.cancel_suggestions();
                } else if self
                    .buffer
                    .delete_backward(&self.widths, self.output.as_mut())
                {
                    self.autocomplete.invalidate();
                }
            }
            InputEvent::Tab => self.tab(),
            InputEvent::Arrow(Arrow::Up) => self.up_or_down(Cycle::Previous, HistoryDirection::Older),
            InputEvent::Arrow(Arrow::Down) => self.up_or_down(Cycle::Next, HistoryDirection::Newer),
            InputEvent::Arrow(Arrow::Left) => {
                if self.autocomplete.is_running() {
                    self.cancel_suggestions();
                } else {
                    self.buffer.move_left(&self.widths, self.output.as_mut());
                }
            }
            InputEvent::Arrow(Arrow::Right) => {
                if self.autocomplete.is_running() {
                    self.autocomplete
                        .accept_next_word(&mut self.buffer, self.output.as_mut());
                    self.descend_if_entered();
                } else {
                    self.buffer.move_right(&self.widths, self.output.as_mut());
                }
            }
            InputEvent::Escape | InputEvent::Cancel => {
                if self.autocomplete.is_running() {
                    self.cancel_suggestions();
                }
            }
            InputEvent::CarriageReturn => self.submit(),
            InputEvent::Text(text) => self.type_text(&text),
        }
    }

    fn place_cursor(&mut self, column: u16, row: u16) {
        if self.autocomplete.is_running() {
            self.cancel_suggestions();
        }
        let Some(distance) = self.output.place_cursor(column, row) else {
            return;
        };
        self.buffer
            .move_cursor_to(distance, &self.widths, self.output.as_ref());
        self.autocomplete.invalidate();
    }

    fn end_of_transmission(&mut self) {
        if self.foreground.is_active() {
            if self.controller.has_input_channel() {
                self.controller.close_input();
            } else {
                debug!("End of input with no input channel, command already gone");
                self.controller.show_prompt();
            }
            return;
        }
        if self.autocomplete.is_running() {
            self.cancel_suggestions();
        }
        if self
            .buffer
            .delete_forward(&self.widths, self.output.as_mut())
        {
            self.autocomplete.invalidate();
        }
    }

    fn interrupt(&mut self) {
        if self.autocomplete.is_running() {
            self.cancel_suggestions();
            return;
        }
        if self.foreground.is_active() {
            if !self.foreground.sandboxed {
                self.controller.interrupt();
            }
            return;
        }
        self.buffer.take_line();
        self.autocomplete.invalidate();
        self.output.feed("\r\n");
        self.controller.show_prompt();
    }

    fn tab(&mut self) {
        if self.autocomplete.is_running() {
            self.autocomplete
                .accept_selected(&mut self.buffer, self.output.as_mut());
            self.descend_if_entered();
            return;
        }
        let ticket = self.autocomplete.request();
        let completions = self.complete();
        if self
            .autocomplete
            .start(ticket, completions, &mut self.buffer, self.output.as_mut())
        {
            self.descend();
        }
    }

    fn up_or_down(&mut self, cycle: Cycle, direction: HistoryDirection) {
        if self.autocomplete.is_running() {
            self.autocomplete
                .cycle(cycle, &self.buffer, self.output.as_mut());
            return;
        }
        let history = if self.foreground.is_active() {
            &mut self.command_input_history
        } else {
            &mut self.line_history
        };
        let Some(entry) = history.navigate(direction) else {
            return;
        };
        self.output.move_to_beginning_of_line();
        self.output.clear_to_end_of_line();
        self.output.feed(&entry);
        self.buffer.replace(&entry);
        self.autocomplete.invalidate();
    }

    fn type_text(&mut self, text: &str) {
        if text.contains(|c| c == '\n' || c == '\r') {
            let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
            for (i, piece) in normalized.split('\n').enumerate() {
                if i > 0 {
                    self.handle_text("\r");
                }
                if !piece.is_empty() {
                    self.handle_text(piece);
                }
            }
            return;
        }

        self.buffer.commit(text, self.output.as_mut());
        self.autocomplete.invalidate();
        if self.autocomplete.is_running() {
            self.autocomplete
                .narrow(text, &mut self.buffer, self.output.as_mut());
            self.descend_if_entered();
        } else if !self.buffer.after().is_empty() {
            self.buffer.redraw_after(self.output.as_mut());
        }
    }

    fn submit(&mut self) {
        if self.autocomplete.is_running() {
            self.autocomplete
                .commit_selected(&mut self.buffer, self.output.as_mut());
        }
        self.autocomplete.invalidate();
        let line = self.buffer.take_line().trim().to_string();

        if !self.foreground.is_active() {
            self.line_history.record_if_new(&line);
            self.output.feed("\r\n");
            debug!("Executing {:?}", line);
            self.controller.execute(&line);
            return;
        }

        self.output.feed("\n\r");
        if !self.controller.has_input_channel() {
            debug!("Dropping {:?}: foreground input is closed", line);
            return;
        }
        self.command_input_history.record_if_new(&line);
        if let Err(e) = self.controller.write_input(format!("{}\n", line).as_bytes()) {
            debug!("Foreground input dropped: {}", e);
        }
    }

    fn cancel_suggestions(&mut self) {
        self.autocomplete.cancel(&self.buffer, self.output.as_mut());
    }

    fn descend_if_entered(&mut self) {
        if self.autocomplete.wants_descent(&self.buffer) {
            self.descend();
        }
    }

    fn descend(&mut self) {
        let ticket = self.autocomplete.request();
        let completions = self.complete();
        self.autocomplete
            .descend(ticket, completions, &self.buffer, self.output.as_mut());
    }

    fn complete(&self) -> Completions {
        let ctx = CompletionContext {
            foreground_active: self.foreground.is_active(),
            command_input_history: &self.command_input_history,
            line_history: &self.line_history,
            resolver: self.resolver.as_ref(),
            bookmarks: self.bookmarks.as_ref(),
            environment: self.environment.as_ref(),
        };
        completion::generate(self.buffer.before(), &ctx)
    }
}
