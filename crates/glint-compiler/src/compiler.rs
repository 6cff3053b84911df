use crate::config::CompilerConfig;
use crate::engine::{CompileJob, Engine, NagaEngine};
use crate::error::CompilerResult;
use crate::kind::ShaderKind;
use crate::module::Module;
use crate::preprocess::TranslationUnit;
use glint_source::IncludeResolver;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Entry point name used when none is given.
pub const DEFAULT_ENTRY_POINT: &str = "main";

/// Source name used in diagnostics when none is given.
pub const DEFAULT_SOURCE_NAME: &str = "shader";

/// Per-compilation settings that are not part of the compiler itself.
#[derive(Clone, Default)]
pub struct CompileOptions {
    source_name: Option<String>,
    includer: Option<Arc<dyn IncludeResolver>>,
    defines: Vec<(String, String)>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the root source in diagnostics and for relative includes.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Resolves `#include` directives through `includer`.
    pub fn with_includer(self, includer: impl IncludeResolver + 'static) -> Self {
        self.with_shared_includer(Arc::new(includer))
    }

    pub fn with_shared_includer(mut self, includer: Arc<dyn IncludeResolver>) -> Self {
        self.includer = Some(includer);
        self
    }

    /// Defines a preprocessor macro, like `#define name value`.
    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }

    pub fn source_name(&self) -> &str {
        self.source_name.as_deref().unwrap_or(DEFAULT_SOURCE_NAME)
    }

    pub fn defines(&self) -> &[(String, String)] {
        &self.defines
    }

    pub fn has_includer(&self) -> bool {
        self.includer.is_some()
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("source_name", &self.source_name())
            .field("includer", &self.includer.is_some())
            .field("defines", &self.defines)
            .finish()
    }
}

/// Reusable compiler state.
///
/// A compiler holds only what was fixed when it was created: its
/// configuration and its engine. Compiling takes `&self` and keeps all
/// per-compilation state on the calling thread, so one compiler can be
/// shared across threads (for example behind an `Arc`, or borrowed into
/// scoped threads) and used concurrently without locking.
///
/// Modules produced by a compiler own their results; dropping the compiler
/// does not affect them.
pub struct Compiler {
    config: CompilerConfig,
    engine: Arc<dyn Engine>,
}

impl Compiler {
    /// Creates a compiler with the default configuration and engine.
    pub fn new() -> CompilerResult<Self> {
        Self::with_config(CompilerConfig::default())
    }

    pub fn with_config(config: CompilerConfig) -> CompilerResult<Self> {
        Self::with_engine(config, Arc::new(NagaEngine::new()))
    }

    /// Creates a compiler that drives `engine`.
    ///
    /// Fails if the configuration cannot be honored; never returns a
    /// partially usable compiler.
    pub fn with_engine(config: CompilerConfig, engine: Arc<dyn Engine>) -> CompilerResult<Self> {
        config.validate()?;
        log::debug!(
            "created compiler (engine {}, SPIR-V {})",
            engine.name(),
            config.spirv_version
        );
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Compiles GLSL `source` for `kind`, naming the entry point `entry_point`.
    ///
    /// Always returns a module; check [`Module::success`].
    pub fn compile(&self, source: &str, kind: ShaderKind, entry_point: &str) -> Module {
        self.compile_with_options(source, kind, entry_point, &CompileOptions::default())
    }

    /// Like [`compile`](Self::compile), for source given as raw bytes.
    ///
    /// The slice length is authoritative; bytes that are not UTF-8 produce a
    /// failed module.
    pub fn compile_bytes(&self, source: &[u8], kind: ShaderKind, entry_point: &str) -> Module {
        self.compile_bytes_with_options(source, kind, entry_point, &CompileOptions::default())
    }

    pub fn compile_bytes_with_options(
        &self,
        source: &[u8],
        kind: ShaderKind,
        entry_point: &str,
        options: &CompileOptions,
    ) -> Module {
        match std::str::from_utf8(source) {
            Ok(text) => self.compile_with_options(text, kind, entry_point, options),
            Err(err) => Module::failure(
                options.source_name(),
                format!("source text is not valid UTF-8: {err}"),
            ),
        }
    }

    pub fn compile_with_options(
        &self,
        source: &str,
        kind: ShaderKind,
        entry_point: &str,
        options: &CompileOptions,
    ) -> Module {
        let source_name = options.source_name();
        let entry_point = if entry_point.is_empty() {
            DEFAULT_ENTRY_POINT
        } else {
            entry_point
        };
        log::debug!(
            "compiling '{}' as {} shader ({} bytes, entry point '{}')",
            source_name,
            kind,
            source.len(),
            entry_point
        );

        let unit = match TranslationUnit::expand(
            source_name,
            source,
            options.includer.as_deref(),
            &options.defines,
            self.config.max_include_depth,
        ) {
            Ok(unit) => unit,
            Err(diagnostic) => return Module::from_diagnostics(source_name, vec![diagnostic]),
        };

        let job = CompileJob {
            unit: &unit,
            kind,
            entry_point,
            defines: &options.defines,
            target: self.config.spirv_version,
            debug_names: self.config.debug_names,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.engine.compile(&job))) {
            Ok(Ok(words)) => {
                log::debug!("compiled '{}' into {} words", source_name, words.len());
                Module::from_words(words)
            }
            Ok(Err(diagnostics)) => {
                let diagnostics = diagnostics
                    .into_iter()
                    .map(|diagnostic| unit.diagnostic_at(diagnostic.offset, diagnostic.message))
                    .collect();
                Module::from_diagnostics(source_name, diagnostics)
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log::error!(
                    "engine {} panicked while compiling '{}': {}",
                    self.engine.name(),
                    source_name,
                    reason
                );
                Module::failure(source_name, format!("internal compiler error: {reason}"))
            }
        }
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("engine", &self.engine.name())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
