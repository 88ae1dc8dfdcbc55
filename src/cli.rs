use clap::Parser;

use crate::width::WidthModelKind;

/// tline - a line editor with context-sensitive completion
#[derive(Parser, Debug)]
#[clap(name = "tline")]
#[clap(about = "Line editor with command, path and bookmark completion", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// How wide glyphs are detected (font-metric or unicode-table)
    #[arg(long)]
    pub width_model: Option<WidthModelKind>,

    /// Use hint colours suited to a light background
    #[arg(long)]
    pub light: bool,

    /// Log file path (defaults to tline.log next to the bookmarks file)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: log::LevelFilter,
}
