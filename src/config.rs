use crossterm::style::Color;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EditorResult;
use crate::resolver::{CommandSpec, StaticResolver};
use crate::terminal::HintColors;
use crate::width::WidthModelKind;

pub const DEFAULT_COMMAND_INPUT_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of submitted lines kept; unbounded when absent.
    pub line_limit: Option<usize>,
    /// Maximum number of lines kept for the running foreground program.
    pub command_input_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            line_limit: None,
            command_input_limit: DEFAULT_COMMAND_INPUT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width_model: WidthModelKind,
    /// Hint colour on dark backgrounds, as a crossterm colour name.
    pub dark_hint_color: String,
    /// Hint colour on light backgrounds.
    pub light_hint_color: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width_model: WidthModelKind::default(),
            dark_hint_color: "dark_yellow".to_string(),
            light_hint_color: "dark_green".to_string(),
        }
    }
}

/// Prompts of otherwise interactive interpreters that read a plain line and
/// should get line editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassthroughConfig {
    pub line_edited_interpreters: Vec<String>,
    pub line_edited_prompts: Vec<String>,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            line_edited_interpreters: vec!["ipython".to_string(), "isympy".to_string()],
            line_edited_prompts: vec![
                "help> ".to_string(),
                "Hit Return for more, or q (and Return) to quit: ".to_string(),
                "Do you really want to exit ([y]/n)? ".to_string(),
            ],
        }
    }
}

impl PassthroughConfig {
    /// Whether `command` is sitting at one of the line-edited prompts.
    pub fn is_line_edited(&self, command: &str, prompt_line: Option<&str>) -> bool {
        let Some(prompt_line) = prompt_line else {
            return false;
        };
        self.line_edited_interpreters
            .iter()
            .any(|interpreter| command.starts_with(interpreter.as_str()))
            && self
                .line_edited_prompts
                .iter()
                .any(|prompt| prompt_line.ends_with(prompt.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Where bookmarks and directory visits are stored. `~` is expanded.
    pub bookmarks_file: Option<String>,
    pub history: HistoryConfig,
    pub display: DisplayConfig,
    pub passthrough: PassthroughConfig,
    pub aliases: BTreeMap<String, String>,
    pub commands: BTreeMap<String, CommandSpec>,
}

impl EditorConfig {
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("termline")
            .join("config.toml")
    }

    pub fn default_bookmarks_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("termline")
            .join("bookmarks.toml")
    }

    /// Load configuration from `path`, or from the default location. A
    /// missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> EditorResult<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            info!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: EditorConfig = toml::from_str(&content)?;
        info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> EditorResult<()> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, toml::to_string_pretty(self)?)?;
        info!("Configuration saved to: {}", config_path.display());
        Ok(())
    }

    pub fn bookmarks_path(&self) -> PathBuf {
        match &self.bookmarks_file {
            Some(file) => PathBuf::from(shellexpand::tilde(file).into_owned()),
            None => Self::default_bookmarks_path(),
        }
    }

    /// Hint colours, falling back to the defaults for unknown names.
    pub fn hint_colors(&self) -> HintColors {
        let defaults = HintColors::default();
        HintColors {
            dark: parse_color(&self.display.dark_hint_color).unwrap_or(defaults.dark),
            light: parse_color(&self.display.light_hint_color).unwrap_or(defaults.light),
        }
    }

    pub fn resolver(&self) -> StaticResolver {
        StaticResolver::from_tables(&self.aliases, &self.commands)
    }
}

fn parse_color(name: &str) -> Option<Color> {
    match Color::try_from(name) {
        Ok(color) => Some(color),
        Err(()) => {
            warn!("Unknown hint colour '{}', using the default", name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use crate::resolver::{CommandResolver, OperandKind};
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = EditorConfig::load(Some(&temp_dir.path().join("config.toml")))
            .expect("load config");
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.history.command_input_limit, 100);
        assert_eq!(config.history.line_limit, None);
        assert_eq!(config.display.width_model, WidthModelKind::FontMetric);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[history]
line_limit = 500

[display]
width_model = "unicode-table"

[aliases]
ll = "ls -l"

[commands.rg]
operands = "file"
options = "iwe:"
"#,
        )
        .expect("write config");

        let config = EditorConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.history.line_limit, Some(500));
        assert_eq!(config.history.command_input_limit, 100);
        assert_eq!(config.display.width_model, WidthModelKind::UnicodeTable);
        assert_eq!(config.display.dark_hint_color, "dark_yellow");

        let resolver = config.resolver();
        assert_eq!(resolver.resolve_alias("ll"), "ls");
        assert_eq!(resolver.operand_kind("rg"), OperandKind::File);
        assert_eq!(resolver.option_spec("rg").as_deref(), Some("iwe:"));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[history\nline_limit = 3").expect("write config");
        assert!(matches!(
            EditorConfig::load(Some(&path)),
            Err(EditorError::ConfigParse(_))
        ));
    }

    #[test]
    fn save_and_reload() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = EditorConfig::default();
        config.aliases.insert("la".to_string(), "ls -a".to_string());
        config.bookmarks_file = Some("/tmp/marks.toml".to_string());

        config.save(Some(&path)).expect("save config");
        let loaded = EditorConfig::load(Some(&path)).expect("load config");

        assert_eq!(loaded, config);
        assert_eq!(loaded.bookmarks_path(), PathBuf::from("/tmp/marks.toml"));
    }

    #[test]
    fn hint_colors_fall_back_on_unknown_names() {
        let mut config = EditorConfig::default();
        config.display.dark_hint_color = "cyan".to_string();
        config.display.light_hint_color = "not-a-colour".to_string();
        let colors = config.hint_colors();
        assert_eq!(colors.dark, Color::Cyan);
        assert_eq!(colors.light, HintColors::default().light);
    }

    #[test]
    fn line_edited_prompts() {
        let passthrough = PassthroughConfig::default();
        assert!(passthrough.is_line_edited("ipython", Some("help> ")));
        assert!(passthrough.is_line_edited(
            "isympy -q",
            Some("Do you really want to exit ([y]/n)? ")
        ));
        assert!(!passthrough.is_line_edited("ipython", Some("In [3]: ")));
        assert!(!passthrough.is_line_edited("python3", Some("help> ")));
        assert!(!passthrough.is_line_edited("ipython", None));
    }
}
