pub mod check;
pub mod compile;
pub mod find;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use glint_compiler::{CompileOptions, Compiler, CompilerConfig, Module, ShaderKind};
use glint_source::{FileFinder, FileIncluder, IncludeResolver};

use crate::config::ProjectConfig;
use crate::error::CliError;
use crate::io::read_source;
use crate::utils::parse_define;

/// Options shared by every command that compiles shaders.
#[derive(Args, Debug, Clone)]
pub struct ShaderArgs {
    /// Shader source files
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Shader stage; inferred from .vert/.frag when omitted
    #[arg(short, long, value_name = "STAGE")]
    pub stage: Option<ShaderKind>,

    /// Entry point name
    #[arg(short, long, value_name = "NAME", default_value = "main")]
    pub entry: String,

    /// Add a directory to the include search path
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include_dirs: Vec<String>,

    /// Define a preprocessor macro
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Project file to use instead of searching for glint.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// A compiler plus the per-file options derived from the command line and project file.
pub struct Session {
    compiler: Compiler,
    includer: Arc<dyn IncludeResolver>,
    defines: Vec<(String, String)>,
    stage: Option<ShaderKind>,
    entry: String,
}

impl Session {
    pub fn prepare(args: &ShaderArgs) -> Result<Self, CliError> {
        let project = match (&args.config, args.files.first()) {
            (Some(path), _) => ProjectConfig::load(path)?,
            (None, Some(first)) => ProjectConfig::discover(first)?,
            (None, None) => ProjectConfig::default(),
        };

        // Command line values come after, and override, project values.
        let mut defines = project.sorted_defines();
        for define in &args.defines {
            let (name, value) = parse_define(define)?;
            defines.retain(|(existing, _)| *existing != name);
            defines.push((name, value));
        }

        let search_path = args
            .include_dirs
            .iter()
            .chain(project.include.paths.iter())
            .cloned();
        Self::with_parts(
            project.compiler,
            FileFinder::with_search_path(search_path),
            defines,
            args.stage,
            args.entry.clone(),
        )
    }

    pub fn with_parts(
        config: CompilerConfig,
        finder: FileFinder,
        defines: Vec<(String, String)>,
        stage: Option<ShaderKind>,
        entry: String,
    ) -> Result<Self, CliError> {
        log::debug!("include search path: {:?}", finder.search_path());
        Ok(Self {
            compiler: Compiler::with_config(config)?,
            includer: Arc::new(FileIncluder::new(finder)),
            defines,
            stage,
            entry,
        })
    }

    pub fn stage_of(&self, path: &Path) -> Result<ShaderKind, CliError> {
        self.stage
            .or_else(|| ShaderKind::from_path(path))
            .ok_or_else(|| CliError::UnknownStage {
                path: path.to_path_buf(),
            })
    }

    /// Compiles one file. Shader errors come back as a failed module.
    pub fn compile_file(&self, path: &Path) -> Result<Module, CliError> {
        let kind = self.stage_of(path)?;
        let source = read_source(path)?;

        let mut options = CompileOptions::new()
            .with_source_name(path.to_string_lossy())
            .with_shared_includer(Arc::clone(&self.includer));
        for (name, value) in &self.defines {
            options = options.define(name.as_str(), value.as_str());
        }

        Ok(self
            .compiler
            .compile_with_options(&source, kind, &self.entry, &options))
    }
}

/// Turns a failed module into an error naming `path`.
pub fn failure(path: &Path, module: &Module) -> CliError {
    CliError::CompileFailed {
        path: path.to_path_buf(),
        diagnostics: module.diagnostics().to_vec(),
    }
}

/// Prints an error with miette's renderer without stopping.
pub fn report(error: CliError) {
    eprintln!("{:?}", miette::Report::new(error));
}
