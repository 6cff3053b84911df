//! The boundary between the compiler handle and the code that actually
//! understands GLSL and SPIR-V.
//!
//! [`Engine`] takes an expanded [`TranslationUnit`] and returns SPIR-V words
//! or diagnostics pointing into the expanded text. [`NagaEngine`] is the
//! implementation used by default, built on naga's GLSL front-end, validator
//! and SPIR-V back-end.

use crate::config::SpirvVersion;
use crate::kind::ShaderKind;
use crate::preprocess::TranslationUnit;
use naga::back::spv;
use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{
    Binding, Block, BuiltIn, Expression, FunctionResult, Handle, Scalar, ShaderStage, Span, Statement,
    Type, TypeInner, VectorSize,
};
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::error::Error;

/// Everything an engine needs for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompileJob<'a> {
    pub unit: &'a TranslationUnit,
    pub kind: ShaderKind,
    /// Name given to the module's entry point
    pub entry_point: &'a str,
    /// Macro definitions for the engine's preprocessor
    pub defines: &'a [(String, String)],
    pub target: SpirvVersion,
    pub debug_names: bool,
}

/// A problem reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDiagnostic {
    /// Byte offset into the unit's expanded text, if the engine knows one
    pub offset: Option<usize>,
    pub message: String,
}

impl EngineDiagnostic {
    pub fn new(offset: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A GLSL to SPIR-V compilation engine.
///
/// One engine instance serves every compilation of a compiler, possibly
/// from many threads at once, so implementations must keep all
/// per-compilation state local to [`compile`](Engine::compile).
pub trait Engine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn compile(&self, job: &CompileJob<'_>) -> Result<Vec<u32>, Vec<EngineDiagnostic>>;
}

/// Process-wide state shared by every [`NagaEngine`].
#[derive(Debug)]
struct EngineSetup {
    validation: ValidationFlags,
    capabilities: Capabilities,
}

static ENGINE_SETUP: OnceCell<EngineSetup> = OnceCell::new();

fn engine_setup() -> &'static EngineSetup {
    ENGINE_SETUP.get_or_init(|| {
        let setup = EngineSetup {
            validation: ValidationFlags::all(),
            capabilities: Capabilities::all(),
        };
        log::info!(
            "naga engine initialized (validation {:?})",
            setup.validation
        );
        setup
    })
}

/// The default engine: naga's GLSL front-end and SPIR-V back-end.
#[derive(Debug, Clone, Copy)]
pub struct NagaEngine {
    setup: &'static EngineSetup,
}

impl NagaEngine {
    /// Creates an engine, running the process-wide setup on first use.
    ///
    /// Safe to call from several threads at once; the setup runs exactly once.
    pub fn new() -> Self {
        Self {
            setup: engine_setup(),
        }
    }

    fn parse(&self, job: &CompileJob<'_>) -> Result<naga::Module, Vec<EngineDiagnostic>> {
        let mut options = glsl::Options::from(ShaderStage::from(job.kind));
        for (name, value) in job.defines {
            options.defines.insert(name.clone(), value.clone());
        }

        // A blank unit declares no entry point, but its directives still go
        // through the front-end's preprocessor. A stand-in `main` is appended
        // after the user's text and the parsed module is discarded.
        let blank = job.unit.is_blank();
        let text = if blank {
            Cow::Owned(format!("{}void main() {{}}\n", job.unit.text()))
        } else {
            Cow::Borrowed(job.unit.text())
        };
        let user_text_len = job.unit.text().len();

        let module = glsl::Frontend::default()
            .parse(&options, &text)
            .map_err(|failure| {
                failure
                    .errors
                    .into_iter()
                    .map(|err| {
                        let offset = err
                            .meta
                            .to_range()
                            .map(|range| range.start)
                            .filter(|&start| start < user_text_len);
                        EngineDiagnostic::new(offset, err.kind.to_string())
                    })
                    .collect::<Vec<_>>()
            })?;

        if blank {
            return Ok(naga::Module::default());
        }
        Ok(module)
    }
}

/// Gives vertex entry points that write no outputs a `Position` result.
///
/// The GLSL front-end only declares `gl_Position` when the shader uses it,
/// but a vertex entry point must produce a position. The synthesized result
/// is a zero vector.
fn ensure_vertex_position(module: &mut naga::Module) {
    let needs_position = |entry_point: &naga::EntryPoint| {
        entry_point.stage == ShaderStage::Vertex && entry_point.function.result.is_none()
    };
    if !module.entry_points.iter().any(needs_position) {
        return;
    }

    let vec4 = module.types.insert(
        Type {
            name: None,
            inner: TypeInner::Vector {
                size: VectorSize::Quad,
                scalar: Scalar::F32,
            },
        },
        Span::UNDEFINED,
    );

    for entry_point in module.entry_points.iter_mut().filter(|entry_point| needs_position(entry_point)) {
        log::debug!("synthesizing a position output for vertex entry point '{}'", entry_point.name);
        let function = &mut entry_point.function;
        let position = function
            .expressions
            .append(Expression::ZeroValue(vec4), Span::UNDEFINED);
        function.result = Some(FunctionResult {
            ty: vec4,
            binding: Some(Binding::BuiltIn(BuiltIn::Position { invariant: false })),
        });

        return_position(&mut function.body, position);
        if !matches!(function.body.last(), Some(Statement::Return { .. })) {
            function.body.push(
                Statement::Return {
                    value: Some(position),
                },
                Span::UNDEFINED,
            );
        }
    }
}

/// Makes every valueless `return` in `block` return `position`.
fn return_position(block: &mut Block, position: Handle<Expression>) {
    for statement in block.iter_mut() {
        match statement {
            Statement::Return { value } if value.is_none() => *value = Some(position),
            Statement::Block(inner) => return_position(inner, position),
            Statement::If { accept, reject, .. } => {
                return_position(accept, position);
                return_position(reject, position);
            }
            Statement::Switch { cases, .. } => {
                for case in cases.iter_mut() {
                    return_position(&mut case.body, position);
                }
            }
            Statement::Loop {
                body, continuing, ..
            } => {
                return_position(body, position);
                return_position(continuing, position);
            }
            _ => {}
        }
    }
}

impl Default for NagaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for NagaEngine {
    fn name(&self) -> &str {
        "naga"
    }

    fn compile(&self, job: &CompileJob<'_>) -> Result<Vec<u32>, Vec<EngineDiagnostic>> {
        let mut module = self.parse(job)?;
        ensure_vertex_position(&mut module);
        for entry_point in module.entry_points.iter_mut() {
            entry_point.name = job.entry_point.to_string();
        }

        let info = Validator::new(self.setup.validation, self.setup.capabilities)
            .validate(&module)
            .map_err(|err| {
                vec![EngineDiagnostic::new(
                    None,
                    format!("validation failed: {}", error_chain(&err.into_inner())),
                )]
            })?;

        let mut flags = spv::WriterFlags::empty();
        if job.debug_names {
            flags |= spv::WriterFlags::DEBUG;
        }
        let options = spv::Options {
            lang_version: (job.target.major, job.target.minor),
            flags,
            ..spv::Options::default()
        };

        spv::write_vec(&module, &info, &options, None).map_err(|err| {
            vec![EngineDiagnostic::new(
                None,
                format!("SPIR-V generation failed: {}", error_chain(&err)),
            )]
        })
    }
}

/// Joins an error and its sources into one line.
fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
