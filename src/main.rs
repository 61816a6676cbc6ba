use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use vcxproj_rs::compdb::{self, DEFAULT_COMPILER, DEFAULT_CONFIGURATION, GeneratorOptions};
use vcxproj_rs::envfile;
use vcxproj_rs::macros::Environment;
use vcxproj_rs::sln::SolutionModel;
use vcxproj_rs::system_includes::{
    FixedSystemIncludes, MsvcSystemIncludes, NoSystemIncludes, SystemIncludeProvider,
};

/// Export a compile_commands.json for a Visual Studio solution or project.
#[derive(Debug, Parser)]
#[command(name = "vs-export", version, about)]
struct Cli {
    /// Path to a .sln or .vcxproj file.
    #[arg(short = 's', long = "solution")]
    solution: PathBuf,

    /// Configuration to export, as `Configuration|Platform`.
    #[arg(short = 'c', long = "configuration", default_value = DEFAULT_CONFIGURATION)]
    configuration: String,

    /// Where to write the compilation database.
    #[arg(short = 'o', long = "output", default_value = "compile_commands.json")]
    output: PathBuf,

    /// Compiler executable written at the start of every command.
    #[arg(long, default_value = DEFAULT_COMPILER)]
    compiler: String,

    /// `set NAME=value` style file (e.g. captured `vcvarsall.bat` output)
    /// layered over the process environment.
    #[arg(long = "env-file")]
    env_file: Option<PathBuf>,

    /// Do not append MSVC / Windows SDK include directories.
    #[arg(long = "no-system-includes", conflicts_with = "system_include")]
    no_system_includes: bool,

    /// Use these system include directories instead of the detected ones.
    #[arg(long = "system-include")]
    system_include: Vec<String>,
}

impl Cli {
    fn system_includes(&self) -> Box<dyn SystemIncludeProvider> {
        if self.no_system_includes {
            Box::new(NoSystemIncludes)
        } else if !self.system_include.is_empty() {
            Box::new(FixedSystemIncludes(self.system_include.clone()))
        } else {
            Box::new(MsvcSystemIncludes)
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    debug!("CLI args parsed: {cli:?}");

    let mut env = Environment::capture();
    if let Some(path) = &cli.env_file {
        let overrides = envfile::parse_env_file_at(path, &env)?;
        info!("{}: {} variables loaded", path.display(), overrides.len());
        env = env.with_overrides(overrides);
    }

    let options = GeneratorOptions {
        compiler: cli.compiler.clone(),
        system_includes: cli.system_includes(),
    };

    let solution = SolutionModel::open(&cli.solution)?;
    let entries = compdb::generate(&solution, &cli.configuration, &env, &options)?;
    let json = compdb::to_json(&entries)?;

    println!("{json}");
    std::fs::write(&cli.output, &json)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!("{} entries written to {}", entries.len(), cli.output.display());

    Ok(())
}
