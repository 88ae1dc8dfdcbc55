use log::{LevelFilter, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::EditorResult;

/// Destination of log lines. The terminal itself belongs to the editor, so
/// log output goes to stderr or a file.
pub trait OutputSink: Send + Sync {
    fn write_line(&self, text: &str);
    fn flush(&self);
}

pub struct StderrSink;

impl OutputSink for StderrSink {
    fn write_line(&self, text: &str) {
        ::std::eprintln!("{}", text);
    }

    fn flush(&self) {
        let _ = ::std::io::stderr().flush();
    }
}

/// Appends to a log file, creating it and its directory when needed.
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: &Path) -> EditorResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl OutputSink for FileSink {
    fn write_line(&self, text: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", text);
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

pub struct OutputLogger {
    level: LevelFilter,
    sink: Arc<dyn OutputSink>,
}

impl OutputLogger {
    pub fn new(level: LevelFilter, sink: Arc<dyn OutputSink>) -> Self {
        Self { level, sink }
    }
}

impl log::Log for OutputLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.sink
            .write_line(&format!("[{}] {}", record.level(), record.args()));
    }

    fn flush(&self) {
        self.sink.flush();
    }
}

/// Install the global logger. `RUST_LOG` overrides `default_level`.
pub fn init_logger(default_level: LevelFilter, sink: Arc<dyn OutputSink>) {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(default_level);

    let logger = OutputLogger::new(level, sink);
    let _ = log::set_boxed_logger(Box::new(logger));
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CollectingSink {
        lines: Mutex<Vec<String>>,
    }

    impl OutputSink for CollectingSink {
        fn write_line(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }

        fn flush(&self) {}
    }

    fn log_at(logger: &OutputLogger, level: Level, message: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .args(format_args!("{}", message))
                .build(),
        );
    }

    #[test]
    fn logger_filters_by_level_and_prefixes_lines() {
        let sink = Arc::new(CollectingSink::default());
        let logger = OutputLogger::new(LevelFilter::Info, sink.clone());

        log_at(&logger, Level::Debug, "hidden");
        log_at(&logger, Level::Warn, "Skipping malformed entry");
        log_at(&logger, Level::Info, "Loaded 2 bookmarks");

        assert_eq!(
            *sink.lines.lock().unwrap(),
            vec![
                "[WARN] Skipping malformed entry".to_string(),
                "[INFO] Loaded 2 bookmarks".to_string(),
            ]
        );
    }

    #[test]
    fn file_sink_appends() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("logs").join("tline.log");

        let sink = FileSink::open(&path).expect("open log");
        sink.write_line("first");
        sink.flush();
        let sink = FileSink::open(&path).expect("reopen log");
        sink.write_line("second");
        sink.flush();

        let content = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(content, "first\nsecond\n");
    }
}
