//! Recording collaborators shared by the unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use crate::environment::{EnvironmentSource, MapEnvironment};
use crate::foreground::ForegroundController;
use crate::terminal::TerminalOutput;

/// One instruction received by [`RecordingOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Feed(String),
    ClearToEol,
    Save,
    Restore,
    UpIfWrapped,
    DownIfWrapped,
    LineStart,
    PromptEnd,
    Place(u16, u16),
}

#[derive(Debug)]
struct OutputState {
    ops: Vec<Op>,
    glyph_widths: HashMap<String, f64>,
    reference_width: f64,
    foreground_brightness: f64,
    background_brightness: f64,
    prompt_line: Option<String>,
    cursor_distance: Option<isize>,
}

impl Default for OutputState {
    fn default() -> Self {
        Self {
            ops: Vec::new(),
            glyph_widths: HashMap::new(),
            reference_width: 1.0,
            foreground_brightness: 0.9,
            background_brightness: 0.1,
            prompt_line: None,
            cursor_distance: None,
        }
    }
}

/// A terminal that records every instruction. Clones share state, so a test
/// can keep a handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    state: Rc<RefCell<OutputState>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.borrow().ops.clone()
    }

    /// Concatenation of every fed string.
    pub fn fed(&self) -> String {
        self.state
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Feed(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().ops.clear();
    }

    pub fn set_glyph_width(&self, glyph: &str, width: f64) {
        self.state
            .borrow_mut()
            .glyph_widths
            .insert(glyph.to_string(), width);
    }

    pub fn set_reference_width(&self, width: f64) {
        self.state.borrow_mut().reference_width = width;
    }

    pub fn set_brightness(&self, foreground: f64, background: f64) {
        let mut state = self.state.borrow_mut();
        state.foreground_brightness = foreground;
        state.background_brightness = background;
    }

    pub fn set_prompt_line(&self, line: &str) {
        self.state.borrow_mut().prompt_line = Some(line.to_string());
    }

    pub fn set_cursor_distance(&self, distance: Option<isize>) {
        self.state.borrow_mut().cursor_distance = distance;
    }

    fn push(&self, op: Op) {
        self.state.borrow_mut().ops.push(op);
    }
}

impl TerminalOutput for RecordingOutput {
    fn feed(&mut self, text: &str) {
        self.push(Op::Feed(text.to_string()));
    }

    fn clear_to_end_of_line(&mut self) {
        self.push(Op::ClearToEol);
    }

    fn save_cursor_position(&mut self) {
        self.push(Op::Save);
    }

    fn restore_cursor_position(&mut self) {
        self.push(Op::Restore);
    }

    fn move_up_if_wrapped(&mut self) {
        self.push(Op::UpIfWrapped);
    }

    fn move_down_if_wrapped(&mut self) {
        self.push(Op::DownIfWrapped);
    }

    fn move_to_beginning_of_line(&mut self) {
        self.push(Op::LineStart);
    }

    fn mark_prompt_end(&mut self) {
        self.push(Op::PromptEnd);
    }

    fn place_cursor(&mut self, column: u16, row: u16) -> Option<isize> {
        self.push(Op::Place(column, row));
        self.state.borrow().cursor_distance
    }

    fn reference_char_width(&self) -> f64 {
        self.state.borrow().reference_width
    }

    fn measure_glyph(&self, glyph: &str) -> f64 {
        let state = self.state.borrow();
        state
            .glyph_widths
            .get(glyph)
            .copied()
            .unwrap_or(state.reference_width)
    }

    fn foreground_brightness(&self) -> f64 {
        self.state.borrow().foreground_brightness
    }

    fn background_brightness(&self) -> f64 {
        self.state.borrow().background_brightness
    }

    fn last_prompt_line(&self) -> Option<String> {
        self.state.borrow().prompt_line.clone()
    }
}

/// Everything a [`ScriptedForeground`] was asked to do.
#[derive(Debug, Default)]
pub struct ForegroundLog {
    pub input_channel: bool,
    pub pager_channel: bool,
    pub sandbox_alive: bool,
    pub fail_writes: bool,
    pub input: String,
    pub pager: String,
    pub sandbox: String,
    pub closed: usize,
    pub sandbox_ended: usize,
    pub interrupts: usize,
    pub executed: Vec<String>,
    pub prompts: usize,
    pub resizes: Vec<(u16, u16)>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedForeground {
    log: Rc<RefCell<ForegroundLog>>,
}

impl ScriptedForeground {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> std::cell::Ref<'_, ForegroundLog> {
        self.log.borrow()
    }

    pub fn script(&self) -> std::cell::RefMut<'_, ForegroundLog> {
        self.log.borrow_mut()
    }

    fn write(&self, target: impl FnOnce(&mut ForegroundLog) -> &mut String, data: &[u8]) -> io::Result<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "channel closed"));
        }
        target(&mut *log).push_str(&String::from_utf8_lossy(data));
        Ok(())
    }
}

impl ForegroundController for ScriptedForeground {
    fn has_input_channel(&self) -> bool {
        self.log.borrow().input_channel
    }

    fn write_input(&mut self, data: &[u8]) -> io::Result<()> {
        self.write(|log| &mut log.input, data)
    }

    fn close_input(&mut self) {
        let mut log = self.log.borrow_mut();
        log.closed += 1;
        log.input_channel = false;
    }

    fn has_pager_channel(&self) -> bool {
        self.log.borrow().pager_channel
    }

    fn write_pager(&mut self, data: &[u8]) -> io::Result<()> {
        self.write(|log| &mut log.pager, data)
    }

    fn forward_to_sandbox(&mut self, text: &str) -> io::Result<()> {
        self.write(|log| &mut log.sandbox, text.as_bytes())
    }

    fn sandbox_alive(&mut self) -> bool {
        self.log.borrow().sandbox_alive
    }

    fn end_sandbox(&mut self) {
        self.log.borrow_mut().sandbox_ended += 1;
    }

    fn interrupt(&mut self) {
        self.log.borrow_mut().interrupts += 1;
    }

    fn execute(&mut self, line: &str) {
        self.log.borrow_mut().executed.push(line.to_string());
    }

    fn show_prompt(&mut self) {
        self.log.borrow_mut().prompts += 1;
    }

    fn resize(&mut self, columns: u16, rows: u16) {
        self.log.borrow_mut().resizes.push((columns, rows));
    }
}

/// A [`MapEnvironment`] the test can inspect after handing it to a session.
#[derive(Debug, Clone, Default)]
pub struct SharedEnvironment {
    inner: Rc<RefCell<MapEnvironment>>,
}

impl SharedEnvironment {
    pub fn new(environment: MapEnvironment) -> Self {
        Self {
            inner: Rc::new(RefCell::new(environment)),
        }
    }
}

impl EnvironmentSource for SharedEnvironment {
    fn vars(&self) -> Vec<(String, String)> {
        self.inner.borrow().vars()
    }

    fn var(&self, name: &str) -> Option<String> {
        self.inner.borrow().var(name)
    }

    fn set_var(&mut self, name: &str, value: &str) {
        self.inner.borrow_mut().set_var(name, value);
    }

    fn current_dir(&self) -> PathBuf {
        self.inner.borrow().current_dir()
    }
}
