//! ormweld CLI - compiles generated model classes and mapping XML into a
//! framework-ready persistence tree, and patches it in place.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use ormweld::{EntityPatcher, ModelCompiler, ProjectConfig, ValidationBuilder};

#[derive(Parser)]
#[command(name = "ormweld")]
#[command(version, about = "ORM artifact compiler and patcher", long_about = None)]
struct Cli {
    /// Path to a YAML project configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pre-compile and post-compile over a scratch directory of
    /// freshly generated model classes
    Compile {
        /// Directory containing the generated .php/.bak files
        scratch: PathBuf,

        /// Root the namespace-derived output tree is created under
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Patch an already compiled bundle directory in place
    Patch {
        /// Bundle base directory (contains Entity/ and Resources/)
        base_dir: PathBuf,
    },

    /// Rebuild the validation documents for a mapping directory
    BuildValidations {
        /// Directory of canonical mapping XML files
        mapping_dir: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Compile { scratch, output } => compile(config, scratch, output),
        Commands::Patch { base_dir } => patch(config, base_dir),
        Commands::BuildValidations { mapping_dir } => build_validations(config, mapping_dir),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<ProjectConfig, String> {
    match path {
        Some(path) => ProjectConfig::from_file(path)
            .map_err(|e| format!("Failed to load config: {}", e)),
        None => Ok(ProjectConfig::default()),
    }
}

/// Run both compile phases and the validation builder.
fn compile(config: ProjectConfig, scratch: PathBuf, output: PathBuf) -> Result<(), String> {
    println!("Compiling models from {}...", scratch.display());

    if !scratch.is_dir() {
        return Err(format!("Scratch directory not found: {}", scratch.display()));
    }

    let compiler = ModelCompiler::new(config);

    let report = compiler
        .pre_compile(&scratch, &output)
        .map_err(|e| format!("Pre-compile failed: {}", e))?;
    println!("  ✓ Pre-compile complete ({} model directories)", report.model_dirs.len());

    for model_dir in &report.model_dirs {
        compiler
            .post_compile(model_dir)
            .map_err(|e| format!("Post-compile failed for {}: {}", model_dir.display(), e))?;
        println!("  ✓ Post-compile complete: {}", model_dir.display());
    }

    println!("Compilation complete.");
    Ok(())
}

/// Run the idempotent patch pass over a compiled bundle.
fn patch(config: ProjectConfig, base_dir: PathBuf) -> Result<(), String> {
    println!("Patching {}...", base_dir.display());

    if !base_dir.is_dir() {
        return Err(format!("Base directory not found: {}", base_dir.display()));
    }

    EntityPatcher::new(config).patch(&base_dir);

    println!("Patch pass complete.");
    Ok(())
}

/// Rebuild validation documents without recompiling.
fn build_validations(config: ProjectConfig, mapping_dir: PathBuf) -> Result<(), String> {
    println!("Building validation documents from {}...", mapping_dir.display());

    if !mapping_dir.is_dir() {
        return Err(format!("Mapping directory not found: {}", mapping_dir.display()));
    }

    let written = ValidationBuilder::new(config)
        .build(&mapping_dir)
        .map_err(|e| format!("Validation build failed: {}", e))?;

    println!("  ✓ {} validation documents written", written.len());
    Ok(())
}
