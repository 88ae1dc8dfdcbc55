//! The `tline` demo host: a crossterm terminal driving one [`Session`].
//!
//! crossterm decodes keystrokes into events; the host turns them back into
//! the byte chunks a terminal would send, so the session sees exactly what a
//! terminal widget would hand it.
//!
//! [`Session`]: crate::input::Session

use colored::*;
use crossterm::cursor::{
    MoveTo, MoveToColumn, MoveToNextLine, MoveUp, RestorePosition, SavePosition,
};
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, queue};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;
use unicode_width::UnicodeWidthStr;

use crate::bookmarks::{BookmarkStore, FileBookmarks};
use crate::escape::{Arrow, ESC};
use crate::foreground::ForegroundController;
use crate::terminal::TerminalOutput;

/// Largest coordinate an X10 pointer report can carry.
const MAX_X10_COORDINATE: u16 = 222;

/// Translate a key event into the chunk a terminal sends for it.
pub fn encode_key(key: KeyEvent) -> Option<String> {
    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return None;
    }
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let arrow = |arrow: Arrow, plain: &str| {
        Some(if alt {
            arrow.alt_sequence().to_string()
        } else {
            plain.to_string()
        })
    };

    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let upper = c.to_ascii_uppercase();
            if ('@'..='_').contains(&upper) {
                char::from_u32(u32::from(upper) - 64).map(String::from)
            } else {
                Some(c.to_string())
            }
        }
        KeyCode::Char(c) if alt => Some(format!("{}{}", ESC, c)),
        KeyCode::Char(c) => Some(c.to_string()),
        KeyCode::Enter => Some("\r".to_string()),
        KeyCode::Tab => Some("\t".to_string()),
        KeyCode::BackTab => Some("\u{1b}[Z".to_string()),
        KeyCode::Backspace => Some("\u{7f}".to_string()),
        KeyCode::Esc => Some(ESC.to_string()),
        KeyCode::Up => arrow(Arrow::Up, "\u{1b}[A"),
        KeyCode::Down => arrow(Arrow::Down, "\u{1b}[B"),
        KeyCode::Right => arrow(Arrow::Right, "\u{1b}[C"),
        KeyCode::Left => arrow(Arrow::Left, "\u{1b}[D"),
        KeyCode::Home => Some("\u{1b}[H".to_string()),
        KeyCode::End => Some("\u{1b}[F".to_string()),
        KeyCode::Delete => Some("\u{1b}[3~".to_string()),
        _ => None,
    }
}

/// Translate a left click into an X10 pointer report. Other pointer events,
/// and clicks beyond what X10 can encode, are dropped.
pub fn encode_mouse(event: MouseEvent) -> Option<String> {
    if event.kind != MouseEventKind::Down(MouseButton::Left) {
        return None;
    }
    if event.column > MAX_X10_COORDINATE || event.row > MAX_X10_COORDINATE {
        debug!("Click at {}x{} is out of X10 range", event.column, event.row);
        return None;
    }
    let encode = |value: u16| char::from_u32(u32::from(value) + 33);
    Some(format!(
        "\u{1b}[M {}{}",
        encode(event.column)?,
        encode(event.row)?
    ))
}

/// Terminal state shared by the output adapter and the executor.
#[derive(Debug)]
pub struct Screen {
    light: bool,
    size: (u16, u16),
    prompt_end: Option<(u16, u16)>,
}

pub type SharedScreen = Rc<RefCell<Screen>>;

impl Screen {
    pub fn shared(light: bool, size: (u16, u16)) -> SharedScreen {
        Rc::new(RefCell::new(Self {
            light,
            size,
            prompt_end: None,
        }))
    }

    pub fn set_size(&mut self, columns: u16, rows: u16) {
        self.size = (columns, rows);
    }

    fn record_prompt_end(&mut self) {
        match cursor::position() {
            Ok(position) => self.prompt_end = Some(position),
            Err(e) => debug!("Cursor position unavailable: {}", e),
        }
    }

    /// Zero-based index of the rightmost column.
    fn last_column(&self) -> u16 {
        self.size.0.saturating_sub(1)
    }

    /// Columns between the end of the prompt and a screen cell.
    fn distance_from_prompt(&self, column: u16, row: u16) -> Option<isize> {
        let (prompt_column, prompt_row) = self.prompt_end?;
        let rows = i64::from(row) - i64::from(prompt_row);
        let distance =
            rows * i64::from(self.size.0) + i64::from(column) - i64::from(prompt_column);
        isize::try_from(distance).ok()
    }
}

/// [`TerminalOutput`] writing ANSI sequences to stdout.
pub struct CrosstermOutput {
    screen: SharedScreen,
    stdout: io::Stdout,
}

impl CrosstermOutput {
    pub fn new(screen: SharedScreen) -> Self {
        Self {
            screen,
            stdout: io::stdout(),
        }
    }

    fn emit(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            warn!("Terminal write failed: {}", e);
        }
    }

    fn column(&self) -> Option<u16> {
        cursor::position().ok().map(|(column, _)| column)
    }
}

impl TerminalOutput for CrosstermOutput {
    fn feed(&mut self, text: &str) {
        let result = self.stdout.write_all(text.as_bytes());
        self.emit(result);
    }

    fn clear_to_end_of_line(&mut self) {
        let result = queue!(self.stdout, Clear(ClearType::UntilNewLine));
        self.emit(result);
    }

    fn save_cursor_position(&mut self) {
        let result = queue!(self.stdout, SavePosition);
        self.emit(result);
    }

    fn restore_cursor_position(&mut self) {
        let result = queue!(self.stdout, RestorePosition);
        self.emit(result);
    }

    fn move_up_if_wrapped(&mut self) {
        if self.column() != Some(0) {
            return;
        }
        let last_column = self.screen.borrow().last_column();
        let result = queue!(self.stdout, MoveUp(1), MoveToColumn(last_column));
        self.emit(result);
    }

    fn move_down_if_wrapped(&mut self) {
        let last_column = self.screen.borrow().last_column();
        if self.column() != Some(last_column) {
            return;
        }
        let result = queue!(self.stdout, MoveToNextLine(1));
        self.emit(result);
    }

    fn move_to_beginning_of_line(&mut self) {
        let result = match self.screen.borrow().prompt_end {
            Some((column, row)) => queue!(self.stdout, MoveTo(column, row)),
            None => queue!(self.stdout, MoveToColumn(0)),
        };
        self.emit(result);
    }

    fn mark_prompt_end(&mut self) {
        let _ = self.stdout.flush();
        self.screen.borrow_mut().record_prompt_end();
    }

    fn place_cursor(&mut self, column: u16, row: u16) -> Option<isize> {
        let result = queue!(self.stdout, MoveTo(column, row));
        self.emit(result);
        self.screen.borrow().distance_from_prompt(column, row)
    }

    fn reference_char_width(&self) -> f64 {
        1.0
    }

    fn measure_glyph(&self, glyph: &str) -> f64 {
        glyph.width() as f64
    }

    fn foreground_brightness(&self) -> f64 {
        if self.screen.borrow().light {
            0.1
        } else {
            0.9
        }
    }

    fn background_brightness(&self) -> f64 {
        if self.screen.borrow().light {
            0.9
        } else {
            0.1
        }
    }

    fn last_prompt_line(&self) -> Option<String> {
        None
    }

    fn flush(&mut self) {
        let result = self.stdout.flush();
        self.emit(result);
    }
}

/// Bookmark store shared between the session and the `cd`/`bookmark`
/// builtins.
#[derive(Debug, Clone)]
pub struct SharedBookmarks(pub Rc<RefCell<FileBookmarks>>);

impl BookmarkStore for SharedBookmarks {
    fn bookmarks(&self) -> Vec<(String, PathBuf)> {
        self.0.borrow().bookmarks()
    }

    fn path_of(&self, name: &str) -> Option<PathBuf> {
        self.0.borrow().path_of(name)
    }

    fn rank(&self, path: &str, base: Option<&Path>) -> i64 {
        self.0.borrow().rank(path, base)
    }
}

/// Commands the host runs itself instead of handing them to `sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin<'a> {
    Nothing,
    ChangeDirectory(Option<&'a str>),
    Bookmark {
        name: &'a str,
        path: Option<&'a str>,
    },
    ListBookmarks,
    History,
    Exit,
    External(&'a str),
}

impl<'a> Builtin<'a> {
    pub fn parse(line: &'a str) -> Self {
        let words: Vec<&'a str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => Builtin::Nothing,
            ["cd"] => Builtin::ChangeDirectory(None),
            ["cd", target] => Builtin::ChangeDirectory(Some(*target)),
            ["bookmark"] => Builtin::ListBookmarks,
            ["bookmark", name] => Builtin::Bookmark { name: *name, path: None },
            ["bookmark", name, path] => Builtin::Bookmark {
                name: *name,
                path: Some(*path),
            },
            ["history"] => Builtin::History,
            ["exit"] => Builtin::Exit,
            _ => Builtin::External(line),
        }
    }
}

/// Directory named by a `cd` operand. `~name/sub` resolves below the
/// bookmark `name`; `~` and `~/sub` are the home directory. `None` when the
/// bookmark does not exist.
pub fn resolve_target(target: &str, bookmarks: &dyn BookmarkStore) -> Option<PathBuf> {
    let Some(rest) = target.strip_prefix('~') else {
        return Some(PathBuf::from(target));
    };
    if rest.is_empty() || rest.starts_with('/') {
        return Some(PathBuf::from(shellexpand::tilde(target).into_owned()));
    }
    let (name, sub) = rest.split_once('/').unwrap_or((rest, ""));
    let base = bookmarks.path_of(name)?;
    Some(if sub.is_empty() { base } else { base.join(sub) })
}

/// Runs submitted lines synchronously. Builtins are handled in process;
/// anything else goes to `sh -c` with the terminal out of raw mode. There is
/// never a foreground program left reading input.
#[derive(Clone)]
pub struct DemoExecutor {
    screen: SharedScreen,
    bookmarks: Rc<RefCell<FileBookmarks>>,
    exit: Rc<Cell<bool>>,
    executed: Rc<RefCell<Vec<String>>>,
}

impl DemoExecutor {
    pub fn new(
        screen: SharedScreen,
        bookmarks: Rc<RefCell<FileBookmarks>>,
        exit: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            screen,
            bookmarks,
            exit,
            executed: Rc::default(),
        }
    }

    fn print(&self, text: &str) {
        let mut stdout = io::stdout();
        for line in text.lines() {
            let _ = write!(stdout, "{}\r\n", line);
        }
        let _ = stdout.flush();
    }

    fn change_directory(&mut self, target: Option<&str>) {
        let path = match target {
            None => dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            Some(target) => match resolve_target(target, &*self.bookmarks.borrow()) {
                Some(path) => path,
                None => {
                    self.print(&format!("cd: no bookmark for {}", target).red().to_string());
                    return;
                }
            },
        };
        if let Err(e) = std::env::set_current_dir(&path) {
            self.print(&format!("cd: {}: {}", path.display(), e).red().to_string());
            return;
        }
        let cwd = std::env::current_dir().unwrap_or(path);
        debug!("Changed directory to {}", cwd.display());
        self.bookmarks.borrow_mut().record_visit(&cwd);
        self.save_bookmarks();
    }

    fn add_bookmark(&mut self, name: &str, path: Option<&str>) {
        let path = match path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        self.print(&format!("{} -> {}", format!("~{}", name).green(), path.display()));
        self.bookmarks.borrow_mut().add(name, path);
        self.save_bookmarks();
    }

    fn list_bookmarks(&self) {
        let listing: Vec<String> = self
            .bookmarks
            .borrow()
            .bookmarks()
            .into_iter()
            .map(|(name, path)| format!("{} {}", format!("~{}", name).green(), path.display()))
            .collect();
        self.print(&listing.join("\n"));
    }

    fn list_history(&self) {
        let listing: Vec<String> = self
            .executed
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>5}  {}", (i + 1).to_string().dimmed(), line))
            .collect();
        self.print(&listing.join("\n"));
    }

    fn save_bookmarks(&self) {
        if let Err(e) = self.bookmarks.borrow().save() {
            warn!("Could not save bookmarks: {}", e);
        }
    }

    fn run_external(&mut self, line: &str) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Could not leave raw mode: {}", e);
        }
        match Command::new("sh").arg("-c").arg(line).status() {
            Ok(status) if !status.success() => debug!("{:?} exited with {}", line, status),
            Ok(_) => {}
            Err(e) => self.print(&format!("sh: {}", e).red().to_string()),
        }
        if let Err(e) = terminal::enable_raw_mode() {
            warn!("Could not re-enter raw mode: {}", e);
        }
    }
}

impl ForegroundController for DemoExecutor {
    fn has_input_channel(&self) -> bool {
        false
    }

    fn write_input(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "no foreground program"))
    }

    fn close_input(&mut self) {}

    fn has_pager_channel(&self) -> bool {
        false
    }

    fn write_pager(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "no pager"))
    }

    fn forward_to_sandbox(&mut self, _text: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "no sandbox"))
    }

    fn sandbox_alive(&mut self) -> bool {
        false
    }

    fn end_sandbox(&mut self) {}

    fn interrupt(&mut self) {}

    fn execute(&mut self, line: &str) {
        if !line.is_empty() {
            self.executed.borrow_mut().push(line.to_string());
        }
        match Builtin::parse(line) {
            Builtin::Nothing => {}
            Builtin::ChangeDirectory(target) => self.change_directory(target),
            Builtin::Bookmark { name, path } => self.add_bookmark(name, path),
            Builtin::ListBookmarks => self.list_bookmarks(),
            Builtin::History => self.list_history(),
            Builtin::Exit => {
                info!("Exit requested");
                self.exit.set(true);
                return;
            }
            Builtin::External(line) => self.run_external(line),
        }
        self.show_prompt();
    }

    fn show_prompt(&mut self) {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let name = cwd
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| cwd.display().to_string());
        let mut stdout = io::stdout();
        let _ = write!(stdout, "\r{} {} ", name.blue().bold(), "$".green());
        let _ = stdout.flush();
        self.screen.borrow_mut().record_prompt_end();
    }

    fn resize(&mut self, columns: u16, rows: u16) {
        self.screen.borrow_mut().set_size(columns, rows);
    }
}
