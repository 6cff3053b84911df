//! The include-resolution service consumed by the preprocessor.
//!
//! The compiler only knows how to splice text; finding that text is the job
//! of an [`IncludeResolver`]. Two implementations live here:
//!
//! - [`FileIncluder`] resolves names on disk through a [`FileFinder`]
//! - [`VirtualIncluder`] serves sources registered in memory
//!
//! Resolvers are shared between concurrent compilations, so they must be
//! `Send + Sync` and must not change while a compilation is running. Both
//! implementations here are immutable once built; to change the search path,
//! build a new resolver.

use crate::error::{IncludeError, IncludeResult};
use crate::finder::{candidate_path, is_readable_file, FileFinder};
use fxhash::FxHashMap;
use std::fmt;
use std::path::Path;

/// How the included name was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
    /// `#include "name"`: looked up next to the including source first
    Relative,
    /// `#include <name>`: looked up on the search path only
    Standard,
}

impl fmt::Display for IncludeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncludeKind::Relative => write!(f, "relative"),
            IncludeKind::Standard => write!(f, "standard"),
        }
    }
}

/// A single `#include` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeRequest<'a> {
    /// The name between the quotes or angle brackets
    pub target: &'a str,
    pub kind: IncludeKind,
    /// Name of the source containing the directive
    pub requesting_source: &'a str,
    /// Nesting depth of the included file (1 for includes in the root source)
    pub depth: usize,
}

/// The text an include directive is replaced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInclude {
    /// Name used for diagnostics and for resolving nested relative includes
    pub name: String,
    pub content: String,
}

/// Resolves `#include` requests to source text.
pub trait IncludeResolver: Send + Sync {
    fn resolve(&self, request: &IncludeRequest<'_>) -> IncludeResult<ResolvedInclude>;
}

/// Resolves includes from the filesystem.
///
/// Relative includes are tried next to the requesting source before the
/// search path is consulted; standard includes only use the search path.
#[derive(Debug, Clone, Default)]
pub struct FileIncluder {
    finder: FileFinder,
}

impl FileIncluder {
    pub fn new(finder: FileFinder) -> Self {
        Self { finder }
    }

    pub fn finder(&self) -> &FileFinder {
        &self.finder
    }

    fn locate(&self, request: &IncludeRequest<'_>) -> Result<String, Vec<String>> {
        let mut searched = Vec::new();

        if request.kind == IncludeKind::Relative && !Path::new(request.target).is_absolute() {
            let dir = Path::new(request.requesting_source)
                .parent()
                .map(|parent| parent.to_string_lossy().into_owned())
                .unwrap_or_default();
            let candidate = candidate_path(&dir, request.target);
            if is_readable_file(&candidate) {
                return Ok(candidate);
            }
            searched.push(candidate);
        }

        match self.finder.find_readable_filepath(request.target) {
            Some(path) => Ok(path),
            None => {
                searched.extend(self.finder.candidates(request.target));
                Err(searched)
            }
        }
    }
}

impl IncludeResolver for FileIncluder {
    fn resolve(&self, request: &IncludeRequest<'_>) -> IncludeResult<ResolvedInclude> {
        let path = self.locate(request).map_err(|searched| IncludeError::NotFound {
            target: request.target.to_string(),
            searched,
        })?;

        log::debug!(
            "{} include '{}' from '{}' resolved to '{}'",
            request.kind,
            request.target,
            request.requesting_source,
            path
        );

        let content = std::fs::read_to_string(&path).map_err(|err| IncludeError::ReadError {
            path: path.clone(),
            reason: err.to_string(),
        })?;

        Ok(ResolvedInclude { name: path, content })
    }
}

/// Serves includes from sources registered in memory.
///
/// Names are matched exactly, regardless of the include kind.
#[derive(Debug, Clone, Default)]
pub struct VirtualIncluder {
    sources: FxHashMap<String, String>,
}

impl VirtualIncluder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `content` under `name`, replacing any previous entry.
    pub fn with_source(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.sources.insert(name.into(), content.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.sources.insert(name.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl IncludeResolver for VirtualIncluder {
    fn resolve(&self, request: &IncludeRequest<'_>) -> IncludeResult<ResolvedInclude> {
        match self.sources.get(request.target) {
            Some(content) => Ok(ResolvedInclude {
                name: request.target.to_string(),
                content: content.clone(),
            }),
            None => Err(IncludeError::NotFound {
                target: request.target.to_string(),
                searched: Vec::new(),
            }),
        }
    }
}
