use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Name of the project file searched for above the inputs.
pub const PROJECT_FILE: &str = "glint.toml";

/// Finds the nearest directory at or above `start_path` containing `glint.toml`.
pub fn find_project_root(start_path: &Path) -> Option<PathBuf> {
    let mut current = if start_path.is_dir() {
        start_path.to_path_buf()
    } else {
        start_path
            .parent()
            .map_or_else(|| start_path.to_path_buf(), |p| p.to_path_buf())
    };

    // A bare file name has an empty parent; start from the working directory.
    if current.as_os_str().is_empty() {
        current = PathBuf::from(".");
    }
    if let Ok(canonical) = current.canonicalize() {
        current = canonical;
    }

    loop {
        if current.join(PROJECT_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Parses a `-D` argument: `NAME` or `NAME=VALUE`. A bare name is defined as `1`.
pub fn parse_define(text: &str) -> Result<(String, String), CliError> {
    let (name, value) = match text.split_once('=') {
        Some((name, value)) => (name, value),
        None => (text, "1"),
    };

    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(CliError::InvalidDefine(text.to_string()));
    }

    Ok((name.to_string(), value.to_string()))
}
