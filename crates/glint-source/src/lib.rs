//! Source lookup for the glint shader compiler.
//!
//! This crate is responsible for:
//! - Finding readable files along an ordered search path ([`FileFinder`])
//! - Resolving `#include` directives to source text ([`IncludeResolver`])
//!
//! It performs filesystem probes and reads but never interprets shader
//! text; splicing included text into a translation unit is done by the
//! compiler's preprocessor.

mod error;
mod finder;
mod include;

pub use error::{IncludeError, IncludeResult};
pub use finder::{candidate_path, is_readable_file, FileFinder};
pub use include::{
    FileIncluder, IncludeKind, IncludeRequest, IncludeResolver, ResolvedInclude, VirtualIncluder,
};
