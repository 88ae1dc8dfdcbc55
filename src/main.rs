use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    Event, KeyCode, KeyEventKind,
};
use crossterm::terminal;
use crossterm::ExecutableCommand;
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use termline::*;

use bookmarks::FileBookmarks;
use cli::Cli;
use config::EditorConfig;
use environment::ProcessEnvironment;
use foreground::ForegroundController;
use host::{CrosstermOutput, DemoExecutor, Screen, SharedBookmarks};
use input::{Collaborators, Session};

/// Raw mode plus pointer and paste reporting, undone on drop.
struct RawTerminal;

impl RawTerminal {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnableBracketedPaste)?;
        stdout.execute(EnableMouseCapture)?;
        Ok(Self)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = stdout.execute(DisableMouseCapture);
        let _ = stdout.execute(DisableBracketedPaste);
        let _ = terminal::disable_raw_mode();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger; the terminal belongs to the editor, so logs go to a file
    let log_path = cli
        .log_file
        .as_deref()
        .map(|file| PathBuf::from(shellexpand::tilde(file).into_owned()))
        .unwrap_or_else(|| EditorConfig::default_bookmarks_path().with_file_name("tline.log"));
    let sink = output::FileSink::open(&log_path)
        .with_context(|| format!("Could not open log file {}", log_path.display()))?;
    output::init_logger(cli.log_level, Arc::new(sink));
    debug!("Starting tline");

    // Load configuration
    let mut config = EditorConfig::load(cli.config.as_deref().map(Path::new))?;
    if let Some(width_model) = cli.width_model {
        config.display.width_model = width_model;
    }

    let bookmarks_path = config.bookmarks_path();
    let bookmarks = match FileBookmarks::load(&bookmarks_path) {
        Ok(store) => store,
        Err(e) => {
            warn!(
                "Could not read bookmarks from {} ({}), starting empty",
                bookmarks_path.display(),
                e
            );
            FileBookmarks::in_memory()
        }
    };
    let bookmarks = Rc::new(RefCell::new(bookmarks));

    let _raw = RawTerminal::enter()?;
    let (columns, rows) = terminal::size()?;
    let screen = Screen::shared(cli.light, (columns, rows));
    let exit = Rc::new(Cell::new(false));
    let mut executor = DemoExecutor::new(screen.clone(), bookmarks.clone(), exit.clone());

    let mut session = Session::new(
        &config,
        Collaborators {
            output: Box::new(CrosstermOutput::new(screen.clone())),
            foreground: Box::new(executor.clone()),
            resolver: Box::new(config.resolver()),
            bookmarks: Box::new(SharedBookmarks(bookmarks.clone())),
            environment: Box::new(ProcessEnvironment),
        },
    );
    session.handle_resize(columns, rows);
    executor.show_prompt();

    while !exit.get() {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        match event::read()? {
            // F1 stands in for the toolbar control key
            Event::Key(key) if key.code == KeyCode::F(1) && key.kind == KeyEventKind::Press => {
                session.arm_control()
            }
            Event::Key(key) if key.code == KeyCode::F(1) => {}
            Event::Key(key) => {
                if let Some(chunk) = host::encode_key(key) {
                    session.handle_input(chunk.as_bytes());
                }
            }
            Event::Mouse(pointer) => {
                if let Some(chunk) = host::encode_mouse(pointer) {
                    session.handle_input(chunk.as_bytes());
                }
            }
            Event::Paste(text) => session.handle_input(text.as_bytes()),
            Event::Resize(columns, rows) => session.handle_resize(columns, rows),
            _ => {}
        }
    }

    if let Err(e) = bookmarks.borrow().save() {
        warn!("Could not save bookmarks: {}", e);
    }
    info!("tline exiting");
    Ok(())
}
