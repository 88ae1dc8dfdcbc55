//! Suggestion generation for the text before the cursor.
//!
//! Every suggestion is the *suffix* that would complete the current word, so
//! accepting one is a plain append to the line.

use log::{debug, warn};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bookmarks::BookmarkStore;
use crate::environment::EnvironmentSource;
use crate::error::EditorError;
use crate::history::History;
use crate::resolver::{CommandResolver, OperandKind};

/// Everything a completion pass may read.
pub struct CompletionContext<'a> {
    /// A foreground program is reading a line: only its own input history is
    /// offered.
    pub foreground_active: bool,
    pub command_input_history: &'a History,
    pub line_history: &'a History,
    pub resolver: &'a dyn CommandResolver,
    pub bookmarks: &'a dyn BookmarkStore,
    pub environment: &'a dyn EnvironmentSource,
}

/// Ordered, duplicate-free suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completions {
    pub suggestions: Vec<String>,
    /// The suggestions are option letters of the command being typed.
    pub option_menu: bool,
}

impl Completions {
    fn push(&mut self, suggestion: String) {
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }

    fn push_suffixes<'s>(&mut self, prefix: &str, candidates: impl IntoIterator<Item = &'s str>) {
        for candidate in candidates {
            if let Some(rest) = candidate.strip_prefix(prefix) {
                self.push(rest.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }
}

pub fn generate(before: &str, ctx: &CompletionContext<'_>) -> Completions {
    let mut out = Completions::default();

    if ctx.foreground_active {
        out.push_suffixes(before, ctx.command_input_history.newest_first());
        debug!("foreground suggestions for {:?}: {:?}", before, out.suggestions);
        return out;
    }

    out.push_suffixes(before, ctx.line_history.newest_first());

    let parts: Vec<&str> = before.split(' ').collect();
    let [first, .., tail] = parts.as_slice() else {
        let names: Vec<String> = ctx
            .resolver
            .aliases()
            .into_iter()
            .chain(ctx.resolver.commands())
            .collect();
        out.push_suffixes(before, names.iter().map(String::as_str));
        debug!("command suggestions for {:?}: {:?}", before, out.suggestions);
        return out;
    };

    let command = ctx.resolver.resolve_alias(first);
    let operands = ctx.resolver.operand_kind(&command);
    let earlier = &before[..before.len() - tail.len()];

    let listing = if tail.starts_with('-') {
        if let Some(spec) = ctx.resolver.option_spec(&command) {
            option_candidates(&spec, tail, earlier, &mut out);
        }
        Some(tail.to_string())
    } else if tail.starts_with('$') {
        match tail.split_once('/') {
            Some((variable, rest)) => variable_directory(&variable[1..], rest, ctx),
            None => {
                variable_candidates(tail, operands, ctx, &mut out);
                None
            }
        }
    } else if tail.starts_with('~') {
        match tail.split_once('/') {
            Some((name, rest)) => bookmark_directory(&name[1..], rest, ctx),
            None => {
                bookmark_candidates(tail, operands, ctx, &mut out);
                None
            }
        }
    } else {
        Some(tail.to_string())
    };

    if !out.option_menu {
        if let Some(listing) = listing {
            path_candidates(&listing, operands, ctx, &mut out);
        }
    }
    debug!("suggestions for {:?}: {:?}", before, out.suggestions);
    out
}

/// Option letters from a getopt spec that have not been typed yet. Letters
/// taking an argument carry a trailing space.
fn option_candidates(spec: &str, tail: &str, earlier: &str, out: &mut Completions) {
    let letters: Vec<char> = spec.chars().collect();
    for (i, &letter) in letters.iter().enumerate() {
        if letter == ':' {
            continue;
        }
        if tail.contains(letter) || earlier.contains(&format!("-{}", letter)) {
            continue;
        }
        out.option_menu = true;
        if letters.get(i + 1) == Some(&':') {
            out.push(format!("{} ", letter));
        } else {
            out.push(letter.to_string());
        }
    }
}

fn variable_candidates(
    tail: &str,
    operands: OperandKind,
    ctx: &CompletionContext<'_>,
    out: &mut Completions,
) {
    let cwd = ctx.environment.current_dir();
    for (name, value) in ctx.environment.vars() {
        if name.is_empty() || name.contains('=') || has_line_break(&name) {
            warn!("Skipping malformed environment entry {:?}={:?}", name, value);
            continue;
        }
        let mut candidate = format!("${}", name);
        if !candidate.starts_with(tail) {
            continue;
        }
        let points_to_directory = !value.is_empty() && resolve(&cwd, &value).is_dir();
        if operands == OperandKind::Directory && !points_to_directory {
            continue;
        }
        if operands != OperandKind::None && points_to_directory {
            candidate.push('/');
        }
        out.push(candidate[tail.len()..].to_string());
    }
}

fn variable_directory(variable: &str, rest: &str, ctx: &CompletionContext<'_>) -> Option<String> {
    match ctx.environment.var(variable) {
        Some(value) => Some(format!("{}/{}", value, rest)),
        None => {
            warn!("{}", EditorError::UnknownVariable(variable.to_string()));
            None
        }
    }
}

fn bookmark_candidates(
    tail: &str,
    operands: OperandKind,
    ctx: &CompletionContext<'_>,
    out: &mut Completions,
) {
    let mut bookmarks = ctx.bookmarks.bookmarks();
    if operands == OperandKind::Directory {
        bookmarks.sort_by_key(|(name, _)| Reverse(ctx.bookmarks.rank(&format!("~{}", name), None)));
    }
    for (name, path) in bookmarks {
        if has_line_break(&name) {
            warn!("Skipping bookmark with a line break in its name: {:?}", name);
            continue;
        }
        let points_to_directory = path.is_dir();
        if operands == OperandKind::Directory && !points_to_directory {
            continue;
        }
        let mut candidate = format!("~{}", name);
        if !candidate.starts_with(tail) {
            continue;
        }
        if operands != OperandKind::None && points_to_directory {
            candidate.push('/');
        }
        out.push(escape_spaces(&candidate[tail.len()..]));
    }
}

fn bookmark_directory(name: &str, rest: &str, ctx: &CompletionContext<'_>) -> Option<String> {
    match ctx.bookmarks.path_of(name) {
        Some(path) => Some(format!("{}/{}", path.display(), rest)),
        None => {
            warn!("Unable to extract path for bookmark {}", name);
            None
        }
    }
}

/// Where to list and what to match, for a path typed as `listing`.
#[derive(Debug, PartialEq, Eq)]
struct PathQuery<'a> {
    directory: &'a str,
    matching: &'a str,
    /// Prepended to every entry when `listing` names a directory without its
    /// trailing slash.
    prefix: &'static str,
}

fn split_listing<'a>(listing: &'a str, cwd: &Path) -> PathQuery<'a> {
    if listing.is_empty() {
        return PathQuery {
            directory: ".",
            matching: "",
            prefix: "",
        };
    }
    if listing.ends_with('/') {
        return PathQuery {
            directory: listing,
            matching: "",
            prefix: "",
        };
    }
    if resolve(cwd, listing).is_dir() {
        return PathQuery {
            directory: listing,
            matching: "",
            prefix: "/",
        };
    }
    match listing.rfind('/') {
        Some(slash) => PathQuery {
            directory: &listing[..=slash],
            matching: &listing[slash + 1..],
            prefix: "",
        },
        None => PathQuery {
            directory: ".",
            matching: listing,
            prefix: "",
        },
    }
}

fn path_candidates(
    listing: &str,
    operands: OperandKind,
    ctx: &CompletionContext<'_>,
    out: &mut Completions,
) {
    let cwd = ctx.environment.current_dir();
    let query = split_listing(listing, &cwd);
    let directory = resolve(&cwd, query.directory);

    let entries = match fs::read_dir(&directory) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Unable to list files in {}: {}", directory.display(), e);
            return;
        }
    };

    let mut names: Vec<(String, bool)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if has_line_break(&name) {
                warn!("Skipping {:?} in {}: names with line breaks cannot be edited", name, directory.display());
                return None;
            }
            let is_dir = entry.path().is_dir();
            Some((name, is_dir))
        })
        .collect();
    names.sort();
    if operands == OperandKind::Directory {
        names.sort_by_key(|(name, _)| Reverse(ctx.bookmarks.rank(name, Some(&directory))));
    }

    // Visible entries first, then dotfiles.
    for dotfiles in [false, true] {
        for (name, is_dir) in &names {
            if operands == OperandKind::Directory && !is_dir {
                continue;
            }
            if name.starts_with('.') != dotfiles {
                continue;
            }
            let entry = if *is_dir {
                format!("{}/", name)
            } else {
                name.clone()
            };
            let suggestion = if query.matching.is_empty() {
                format!("{}{}", query.prefix, entry)
            } else if let Some(rest) = entry.strip_prefix(query.matching) {
                rest.to_string()
            } else {
                continue;
            };
            out.push(escape_spaces(&suggestion));
        }
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// The line never holds a line break, so neither may a suggestion.
fn has_line_break(text: &str) -> bool {
    text.contains(|c| c == '\n' || c == '\r')
}

fn escape_spaces(text: &str) -> String {
    text.replace(' ', "\\ ")
}
