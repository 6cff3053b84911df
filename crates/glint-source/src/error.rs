use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur when resolving an `#include` directive
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum IncludeError {
    /// No search path entry produced a readable file
    #[error("cannot find or open include file '{target}'")]
    #[diagnostic(
        code("INCLUDE-001"),
        help("Add the directory containing the file to the include search path")
    )]
    NotFound {
        target: String,
        /// Every candidate path that was probed, in search order
        searched: Vec<String>,
    },

    /// The file was found but reading its contents failed
    #[error("error reading include file '{path}': {reason}")]
    #[diagnostic(
        code("INCLUDE-002"),
        help("Check file permissions and ensure the file is valid UTF-8 text")
    )]
    ReadError {
        path: String,
        reason: String,
    },

    /// The include directive itself could not be understood
    #[error("malformed #include directive: {0}")]
    #[diagnostic(
        code("INCLUDE-003"),
        help("Write the directive as #include \"file\" or #include <file>")
    )]
    Malformed(String),

    /// An include was requested but the compilation has no resolver
    #[error("#include '{0}' requires an include resolver")]
    #[diagnostic(
        code("INCLUDE-004"),
        help("Configure include search directories for this compilation")
    )]
    NoResolver(String),

    /// Nested includes went deeper than the configured limit
    #[error("include depth limit of {limit} exceeded while including '{target}'")]
    #[diagnostic(
        code("INCLUDE-005"),
        help("Check for files that include each other")
    )]
    DepthExceeded {
        target: String,
        limit: usize,
    },
}

/// Result type for include resolution.
pub type IncludeResult<T> = Result<T, IncludeError>;
