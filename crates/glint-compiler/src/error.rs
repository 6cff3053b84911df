use crate::config::SpirvVersion;
use miette::Diagnostic;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A wrapper around std::io::Error that is RefUnwindSafe
#[derive(Debug, Error)]
#[error("{0}")]
pub struct IoError(#[from] pub std::io::Error);

/// Errors that prevent a [`Compiler`](crate::Compiler) from being created.
///
/// Compilation itself never fails with an error; bad shader source produces a
/// failed [`Module`](crate::Module) instead.
#[derive(Debug, Error, Diagnostic)]
pub enum CompilerError {
    #[error("unsupported SPIR-V target version {0}")]
    #[diagnostic(
        code("GLINT-INIT-001"),
        help("Target a SPIR-V version between 1.0 and 1.6")
    )]
    UnsupportedTarget(SpirvVersion),

    #[error("include depth limit must be at least 1")]
    #[diagnostic(code("GLINT-INIT-002"))]
    InvalidIncludeDepth,

    #[error("failed to read compiler configuration {path}")]
    #[diagnostic(
        code("GLINT-INIT-003"),
        help("Check that the configuration file exists and is readable")
    )]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("invalid compiler configuration: {0}")]
    #[diagnostic(
        code("GLINT-INIT-004"),
        help("Check the configuration syntax and value types")
    )]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for compiler construction.
pub type CompilerResult<T> = Result<T, CompilerError>;

/// One problem found while compiling a shader.
///
/// Rendered as `source:line: error: message`, or `source: error: message`
/// when the engine did not point at a location.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[diagnostic(code("GLINT-COMPILE-001"))]
pub struct ShaderDiagnostic {
    /// Name of the source the problem was found in (the root source or an included file)
    pub source_name: String,

    /// 1-based line within that source
    pub line: Option<u32>,

    pub message: String,
}

impl ShaderDiagnostic {
    pub fn new(source_name: impl Into<String>, line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ShaderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: error: {}", self.source_name, line, self.message),
            None => write!(f, "{}: error: {}", self.source_name, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_located_diagnostic_rendering() {
        let diagnostic = ShaderDiagnostic::new("main.vert", Some(3), "Unknown variable: x");
        assert_eq!(diagnostic.to_string(), "main.vert:3: error: Unknown variable: x");
    }

    #[test]
    fn test_unlocated_diagnostic_rendering() {
        let diagnostic = ShaderDiagnostic::new("shader", None, "Missing entry point");
        assert_eq!(diagnostic.to_string(), "shader: error: Missing entry point");
    }
}
