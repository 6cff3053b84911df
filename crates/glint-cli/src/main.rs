use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};

mod commands;
mod config;
mod error;
mod io;
mod utils;

use commands::ShaderArgs;

#[derive(Parser, Debug)]
#[command(name = "glint")]
#[command(version, about = "Compile GLSL shaders to SPIR-V", long_about = None)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile shaders to SPIR-V binaries
    Compile {
        #[command(flatten)]
        shaders: ShaderArgs,

        /// Output file (defaults to the input path with .spv appended)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Compile shaders and report errors without writing output
    Check {
        #[command(flatten)]
        shaders: ShaderArgs,
    },

    /// Print where a file resolves on the include search path
    Find {
        /// File name to look up
        #[arg(value_name = "NAME")]
        name: String,

        /// Directory to search, in order
        #[arg(short = 'I', long = "include", value_name = "DIR")]
        include_dirs: Vec<String>,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    match cli.command {
        Commands::Compile { shaders, output } => commands::compile::handle_compile(shaders, output)?,
        Commands::Check { shaders } => commands::check::handle_check(shaders)?,
        Commands::Find { name, include_dirs } => commands::find::handle_find(&name, include_dirs)?,
    }

    Ok(())
}
