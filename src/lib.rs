// Library exports for testing and for hosts embedding the editor

pub mod output;
pub mod autocomplete;
pub mod bookmarks;
pub mod cli;
pub mod completion;
pub mod config;
pub mod environment;
pub mod error;
pub mod escape;
pub mod foreground;
pub mod history;
pub mod host;
pub mod input;
pub mod line_buffer;
pub mod resolver;
pub mod terminal;
pub mod width;

#[cfg(test)]
mod test_support;
