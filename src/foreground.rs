use std::io;

/// What the command-execution side reports about the program owning the tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForegroundState {
    /// Command line of the running foreground command, if any.
    pub command: Option<String>,
    /// The program reads raw keystrokes (editors, REPLs in raw mode).
    pub interactive: bool,
    /// A pager owns the tty input.
    pub pager: bool,
    /// The command runs inside the sandboxed runtime.
    pub sandboxed: bool,
}

impl ForegroundState {
    pub fn running(command: &str) -> Self {
        Self {
            command: Some(command.to_string()),
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.command.is_some()
    }

    /// Program name of the running command; commands of the same kind share
    /// an input history.
    pub fn kind(&self) -> Option<&str> {
        self.command
            .as_deref()
            .and_then(|command| command.split_whitespace().next())
    }
}

/// The command-execution collaborator.
///
/// Write methods may fail when the foreground program has just exited; the
/// session treats such failures as no-ops.
pub trait ForegroundController {
    fn has_input_channel(&self) -> bool;
    /// Write to the foreground command's standard input.
    fn write_input(&mut self, data: &[u8]) -> io::Result<()>;
    /// Signal end of input to the foreground command.
    fn close_input(&mut self);
    fn has_pager_channel(&self) -> bool;
    /// Write to the tty input a pager reads from.
    fn write_pager(&mut self, data: &[u8]) -> io::Result<()>;
    /// Append text to the sandboxed runtime's buffered input.
    fn forward_to_sandbox(&mut self, text: &str) -> io::Result<()>;
    /// Whether the sandboxed runtime is still executing a command.
    fn sandbox_alive(&mut self) -> bool;
    /// Tear down a sandboxed command that stopped without reporting it.
    fn end_sandbox(&mut self);
    fn interrupt(&mut self);
    /// Run a submitted line.
    fn execute(&mut self, line: &str);
    fn show_prompt(&mut self);
    fn resize(&mut self, columns: u16, rows: u16);
}
