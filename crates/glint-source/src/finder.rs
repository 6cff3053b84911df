//! Ordered search-path lookup of readable files.
//!
//! A [`FileFinder`] owns a list of path prefixes. Looking up a filename tries
//! each prefix in order and returns the first candidate that can actually be
//! opened for reading. The finder never interprets the filename: absolute and
//! relative names go through the same concatenation rule, so a `"."` prefix
//! turns `/a/b/c` into the relative candidate `.//a/b/c`.
//!
//! When resolving `#include` files the first element of the search path
//! should almost always be `""`, so both relative and absolute names resolve
//! the way the user wrote them before any directory prefix is tried.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Finds files within an ordered search path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileFinder {
    search_path: Vec<String>,
}

impl FileFinder {
    /// Creates a finder with an empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a finder from an ordered list of prefixes.
    pub fn with_search_path<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_path: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// The prefixes tried by [`find_readable_filepath`](Self::find_readable_filepath), in order.
    pub fn search_path(&self) -> &[String] {
        &self.search_path
    }

    /// Mutable access to the search path. Callers may add or remove prefixes
    /// between searches.
    pub fn search_path_mut(&mut self) -> &mut Vec<String> {
        &mut self.search_path
    }

    /// Searches for a read-openable file named `filename`.
    ///
    /// Each search path element is combined with `filename` by
    /// [`candidate_path`] and probed in order; the first candidate that opens
    /// for reading is returned and no further prefixes are tried. Returns
    /// `None` when nothing matches or when `filename` is empty.
    pub fn find_readable_filepath(&self, filename: &str) -> Option<String> {
        if filename.is_empty() {
            log::debug!("refusing to search for an empty filename");
            return None;
        }

        for prefix in &self.search_path {
            let candidate = candidate_path(prefix, filename);
            if is_readable_file(&candidate) {
                log::trace!("found '{}' as '{}'", filename, candidate);
                return Some(candidate);
            }
            log::trace!("'{}' is not readable", candidate);
        }

        log::debug!(
            "'{}' not found in {} search path entries",
            filename,
            self.search_path.len()
        );
        None
    }

    /// Lists the candidates a search for `filename` would probe, in order.
    pub fn candidates<'a>(&'a self, filename: &'a str) -> impl Iterator<Item = String> + 'a {
        self.search_path
            .iter()
            .map(move |prefix| candidate_path(prefix, filename))
    }
}

/// Joins a search path prefix and a filename.
///
/// An empty prefix yields `filename` unchanged. Otherwise exactly one `/` is
/// inserted unless the prefix already ends with a path separator.
pub fn candidate_path(prefix: &str, filename: &str) -> String {
    if prefix.is_empty() {
        return filename.to_string();
    }

    let mut candidate = String::with_capacity(prefix.len() + 1 + filename.len());
    candidate.push_str(prefix);
    if !prefix.ends_with(std::path::is_separator) {
        candidate.push('/');
    }
    candidate.push_str(filename);
    candidate
}

/// Returns true if `path` names a regular file that can be opened for reading.
///
/// This is an actual open, not an existence check, so files without read
/// permission are reported as unreadable.
pub fn is_readable_file(path: impl AsRef<Path>) -> bool {
    match File::open(path.as_ref()) {
        Ok(file) => file.metadata().map(|meta| !meta.is_dir()).unwrap_or(false),
        Err(_) => false,
    }
}
