//! GLSL to SPIR-V compilation for the glint shader compiler.
//!
//! The crate is built around three pieces:
//!
//! - [`Compiler`]: reusable, immutable compiler state. Create it once and
//!   share it; compilation takes `&self` and is safe to run from many
//!   threads at once.
//! - [`Compiler::compile`] and friends: turn GLSL text into a [`Module`].
//!   Bad shader source never returns an error or panics; it produces a failed
//!   module carrying diagnostics.
//! - [`Module`]: the immutable result of one compilation, owning either the
//!   SPIR-V words or the diagnostic text. Modules outlive the compiler that
//!   made them.
//!
//! ```rust,ignore
//! let compiler = Compiler::new()?;
//! let module = compiler.compile("void main(){}", ShaderKind::Fragment, "main");
//! assert!(module.success());
//! assert_eq!(module.words()[0], SPIRV_MAGIC);
//! ```
//!
//! `#include` directives are expanded before the engine runs, using the
//! [`IncludeResolver`](glint_source::IncludeResolver) set in
//! [`CompileOptions`].

mod compiler;
mod conditional;
mod config;
mod engine;
mod error;
mod kind;
mod module;
mod preprocess;

// Re-export the central compiler types
pub use compiler::{CompileOptions, Compiler, DEFAULT_ENTRY_POINT, DEFAULT_SOURCE_NAME};
pub use config::{CompilerConfig, SpirvVersion, DEFAULT_MAX_INCLUDE_DEPTH, MAX_SPIRV_MINOR};
pub use engine::{CompileJob, Engine, EngineDiagnostic, NagaEngine};
pub use kind::ShaderKind;
pub use module::{Module, SPIRV_HEADER_WORDS, SPIRV_MAGIC};
pub use preprocess::{TranslationUnit, DEFAULT_VERSION_DIRECTIVE};

// Re-export error types
pub use error::{CompilerError, CompilerResult, IoError, ShaderDiagnostic};
