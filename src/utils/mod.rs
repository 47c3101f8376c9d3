//! Utility functions

mod format;
mod sanitize;

pub use format::{format_duration, format_file_size};
pub use sanitize::{sanitize_filename, MAX_FILENAME_CHARS};
