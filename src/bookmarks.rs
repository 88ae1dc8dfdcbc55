use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EditorError, EditorResult};

/// Named directories completed through the `~name` syntax, plus the usage
/// counts used to rank directory candidates.
pub trait BookmarkStore {
    /// All bookmarks in alphabetical order of name.
    fn bookmarks(&self) -> Vec<(String, PathBuf)>;
    fn path_of(&self, name: &str) -> Option<PathBuf>;
    /// Preference for `path` (relative to `base` unless absolute or a
    /// `~bookmark`); higher is more preferred.
    fn rank(&self, path: &str, base: Option<&Path>) -> i64;
}

#[derive(Debug, Serialize)]
struct BookmarkFile<'a> {
    bookmarks: BTreeMap<&'a str, String>,
    visits: BTreeMap<String, u64>,
}

/// Bookmarks persisted in a TOML file:
///
/// ```toml
/// [bookmarks]
/// docs = "~/Documents"
///
/// [visits]
/// "/home/me/Documents" = 12
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileBookmarks {
    file: Option<PathBuf>,
    bookmarks: BTreeMap<String, PathBuf>,
    visits: BTreeMap<PathBuf, u64>,
}

impl FileBookmarks {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store at `file`. A missing file yields an empty store;
    /// malformed entries are skipped.
    pub fn load(file: &Path) -> EditorResult<Self> {
        let mut store = Self {
            file: Some(file.to_path_buf()),
            ..Self::default()
        };
        if !file.exists() {
            info!("No bookmark file at {}, starting empty", file.display());
            return Ok(store);
        }

        let content = fs::read_to_string(file)?;
        let table: toml::Table = toml::from_str(&content)?;

        if let Some(toml::Value::Table(bookmarks)) = table.get("bookmarks") {
            for (name, value) in bookmarks {
                match parse_bookmark(name, value) {
                    Ok(path) => {
                        store.bookmarks.insert(name.clone(), path);
                    }
                    Err(e) => warn!("{}", e),
                }
            }
        }
        if let Some(toml::Value::Table(visits)) = table.get("visits") {
            for (path, value) in visits {
                match value.as_integer().and_then(|n| u64::try_from(n).ok()) {
                    Some(count) => {
                        store.visits.insert(PathBuf::from(path), count);
                    }
                    None => warn!("Ignoring visit count for {}: {}", path, value),
                }
            }
        }
        info!(
            "Loaded {} bookmarks from {}",
            store.bookmarks.len(),
            file.display()
        );
        Ok(store)
    }

    pub fn save(&self) -> EditorResult<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = BookmarkFile {
            bookmarks: self
                .bookmarks
                .iter()
                .map(|(name, path)| (name.as_str(), path.to_string_lossy().into_owned()))
                .collect(),
            visits: self
                .visits
                .iter()
                .map(|(path, count)| (path.to_string_lossy().into_owned(), *count))
                .collect(),
        };
        fs::write(file, toml::to_string_pretty(&contents)?)?;
        Ok(())
    }

    pub fn add(&mut self, name: &str, path: impl Into<PathBuf>) {
        self.bookmarks.insert(name.to_string(), path.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<PathBuf> {
        self.bookmarks.remove(name)
    }

    /// Count one more use of the directory at `path`.
    pub fn record_visit(&mut self, path: &Path) {
        *self.visits.entry(normalize(path)).or_insert(0) += 1;
    }

    fn resolve(&self, path: &str, base: Option<&Path>) -> Option<PathBuf> {
        let trimmed = path.trim_end_matches('/');
        if let Some(name) = trimmed.strip_prefix('~') {
            return self.path_of(name);
        }
        let candidate = Path::new(trimmed);
        if candidate.is_absolute() {
            return Some(candidate.to_path_buf());
        }
        Some(base.map_or_else(|| candidate.to_path_buf(), |base| base.join(candidate)))
    }
}

impl BookmarkStore for FileBookmarks {
    fn bookmarks(&self) -> Vec<(String, PathBuf)> {
        self.bookmarks
            .iter()
            .map(|(name, path)| (name.clone(), path.clone()))
            .collect()
    }

    fn path_of(&self, name: &str) -> Option<PathBuf> {
        self.bookmarks.get(name).cloned()
    }

    fn rank(&self, path: &str, base: Option<&Path>) -> i64 {
        self.resolve(path, base)
            .and_then(|resolved| self.visits.get(&normalize(&resolved)))
            .map_or(0, |count| i64::try_from(*count).unwrap_or(i64::MAX))
    }
}

fn parse_bookmark(name: &str, value: &toml::Value) -> EditorResult<PathBuf> {
    match value.as_str() {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(shellexpand::tilde(path).into_owned())),
        _ => Err(EditorError::MalformedBookmark(format!("{} = {}", name, value))),
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = FileBookmarks::load(&temp_dir.path().join("bookmarks.toml")).unwrap();
        assert!(store.bookmarks().is_empty());
    }

    #[test]
    fn test_load_skips_malformed_entries() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let file = temp_dir.path().join("bookmarks.toml");
        fs::write(
            &file,
            r#"
[bookmarks]
docs = "/srv/docs"
broken = 3
empty = ""

[visits]
"/srv/docs" = 4
"/srv/bad" = -1
"#,
        )
        .unwrap();

        let store = FileBookmarks::load(&file).unwrap();
        assert_eq!(
            store.bookmarks(),
            vec![("docs".to_string(), PathBuf::from("/srv/docs"))]
        );
        assert_eq!(store.rank("/srv/docs", None), 4);
        assert_eq!(store.rank("/srv/bad", None), 0);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let file = temp_dir.path().join("bookmarks.toml");
        fs::write(&file, "[bookmarks\n").unwrap();
        assert!(matches!(
            FileBookmarks::load(&file),
            Err(EditorError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let file = temp_dir.path().join("nested").join("bookmarks.toml");
        let mut store = FileBookmarks::load(&file).unwrap();
        store.add("my docs", "/srv/docs");
        store.record_visit(Path::new("/srv/docs"));
        store.record_visit(Path::new("/srv/docs/"));
        store.save().unwrap();

        let reloaded = FileBookmarks::load(&file).unwrap();
        assert_eq!(reloaded.path_of("my docs"), Some(PathBuf::from("/srv/docs")));
        assert_eq!(reloaded.rank("~my docs", None), 2);
    }

    #[test]
    fn test_rank_resolves_relative_paths_against_base() {
        let mut store = FileBookmarks::in_memory();
        store.record_visit(Path::new("/work/src"));
        store.record_visit(Path::new("/work/src"));
        store.record_visit(Path::new("/work/target"));
        assert_eq!(store.rank("src", Some(Path::new("/work"))), 2);
        assert_eq!(store.rank("src/", Some(Path::new("/work"))), 2);
        assert_eq!(store.rank("target", Some(Path::new("/work"))), 1);
        assert_eq!(store.rank("docs", Some(Path::new("/work"))), 0);
    }
}
