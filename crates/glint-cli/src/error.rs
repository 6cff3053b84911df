use std::path::PathBuf;

use glint_compiler::{CompilerError, ShaderDiagnostic};
use miette::Diagnostic;
use thiserror::Error;

/// CLI-specific error type that provides rich diagnostics
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("I/O error while {operation}: {path}")]
    #[diagnostic(code(glint::cli::io_error))]
    IoError {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project configuration {path}")]
    #[diagnostic(
        code(glint::cli::config_error),
        help("See the [compiler], [include] and [defines] tables of glint.toml")
    )]
    ConfigError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compiler(#[from] CompilerError),

    #[error("cannot tell the shader stage of {path}")]
    #[diagnostic(
        code(glint::cli::unknown_stage),
        help("Pass --stage vertex|fragment or use a .vert or .frag extension")
    )]
    UnknownStage { path: PathBuf },

    #[error("--output can only be used with a single input file")]
    #[diagnostic(code(glint::cli::output_with_many_inputs))]
    OutputWithManyInputs,

    #[error("invalid macro definition '{0}'")]
    #[diagnostic(code(glint::cli::invalid_define), help("Use NAME or NAME=VALUE"))]
    InvalidDefine(String),

    #[error("failed to compile {path}")]
    #[diagnostic(code(glint::cli::compile_failed))]
    CompileFailed {
        path: PathBuf,
        #[related]
        diagnostics: Vec<ShaderDiagnostic>,
    },

    #[error("{failed} of {total} shaders failed to compile")]
    #[diagnostic(code(glint::cli::build_failed))]
    BuildFailed { failed: usize, total: usize },

    #[error("no readable file named '{name}' on the search path")]
    #[diagnostic(code(glint::cli::not_found))]
    NotFound {
        name: String,
        #[help]
        searched: Option<String>,
    },
}

/// Convert IO errors with context
pub fn convert_io_error(error: std::io::Error, path: PathBuf, operation: &str) -> CliError {
    CliError::IoError {
        path,
        operation: operation.to_string(),
        source: error,
    }
}
