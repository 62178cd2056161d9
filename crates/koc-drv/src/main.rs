//! The `koc` command-line front-end.
//!
//! Parses arguments, builds the [`Config`], and drives the module
//! manager through the KIR and sema phases. Exit code 0 on success, 1
//! on any error (missing input, invalid flag, compilation error).

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use koc_drv::config::{BuildKind, Command, Config, OptLevel, Target};
use koc_drv::{DriverError, ModuleManager};

#[derive(Parser, Debug)]
#[command(name = "koc")]
#[command(about = "Compiler for the K language", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version information
    #[arg(short = 'v', long = "version", global = true)]
    version: bool,

    /// Print intermediate representations while compiling
    #[arg(short = 'd', long, global = true)]
    debug: bool,

    /// Build in test mode
    #[arg(long, global = true)]
    test: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a project starting from its entry file
    Build {
        /// Kind of artifact to produce
        #[arg(value_enum)]
        kind: BuildKindArg,

        /// Entry source file
        input: PathBuf,

        /// Target architecture
        #[arg(long, value_enum, default_value_t = TargetArg::X86_64)]
        target: TargetArg,

        /// Optimization level
        #[arg(long, value_enum, default_value_t = OptArg::O0)]
        optimize: OptArg,

        /// Output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Additional import search directory (repeatable)
        #[arg(short = 'I', value_name = "DIR")]
        include: Vec<PathBuf>,
    },

    /// Tokenize, parse, and lower a single file, then dump its KIR
    Kir {
        /// Source file
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BuildKindArg {
    Bin,
    Lib,
    Clib,
    Dylib,
    Cdylib,
}

impl From<BuildKindArg> for BuildKind {
    fn from(kind: BuildKindArg) -> Self {
        match kind {
            BuildKindArg::Bin => BuildKind::Bin,
            BuildKindArg::Lib => BuildKind::Lib,
            BuildKindArg::Clib => BuildKind::Clib,
            BuildKindArg::Dylib => BuildKind::Dylib,
            BuildKindArg::Cdylib => BuildKind::Cdylib,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TargetArg {
    X86,
    #[value(name = "x86_64")]
    X86_64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OptArg {
    #[value(name = "0")]
    O0,
    #[value(name = "1")]
    O1,
    #[value(name = "2")]
    O2,
    #[value(name = "s")]
    Os,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Exit code 1 for bad arguments, matching every other error path;
    // help and version requests still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            let informational = matches!(
                err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            );
            err.print()?;
            if informational {
                return Ok(());
            }
            bail!("invalid arguments");
        }
    };

    if cli.version {
        println!("koc version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Kir { input } => run_kir(input),
        Commands::Build {
            kind,
            input,
            target,
            optimize,
            output,
            include,
        } => {
            let mut config = Config::build(kind.into(), input);
            config.target = match target {
                TargetArg::X86 => Target::X86,
                TargetArg::X86_64 => Target::X86_64,
            };
            config.optimize = match optimize {
                OptArg::O0 => OptLevel::O0,
                OptArg::O1 => OptLevel::O1,
                OptArg::O2 => OptLevel::O2,
                OptArg::Os => OptLevel::Os,
            };
            config.output = output;
            config.import_paths = include;
            config.debug = cli.debug;
            config.test = cli.test;

            run_build(config)
        }
    }
}

fn run_kir(input: PathBuf) -> anyhow::Result<()> {
    if !input.is_file() {
        return Err(DriverError::InputNotFound(input).into());
    }

    let mut config = Config::build(BuildKind::Bin, input);
    config.command = Command::ShowKir;

    let manager = ModuleManager::new(config);
    let module_id = manager.kir_single_file();

    manager.print_diagnostics(&mut std::io::stderr())?;

    manager.with_state(|state| {
        print!("{}", koc_kir::print_kir(&state.modules[module_id as usize].kir));
    });

    if manager.has_errors() {
        return Err(DriverError::CompilationFailed.into());
    }
    Ok(())
}

fn run_build(config: Config) -> anyhow::Result<()> {
    if !config.input.is_file() {
        return Err(DriverError::InputNotFound(config.input).into());
    }
    for dir in &config.import_paths {
        if !dir.is_dir() {
            return Err(DriverError::ImportPathNotFound(dir.clone()).into());
        }
    }

    let debug = config.debug;
    let manager = ModuleManager::new(config);

    let entry = manager
        .gen_kir()
        .context("entry module could not be resolved")?;

    let entry_failed = manager.with_state(|state| {
        state.modules[entry as usize].status == koc_air::ModuleStatus::Error
    });
    if entry_failed {
        manager.print_diagnostics(&mut std::io::stderr())?;
        return Err(DriverError::CompilationFailed.into());
    }

    manager.gen_air();
    manager.print_diagnostics(&mut std::io::stderr())?;

    if debug {
        dump_air(&manager)?;
    }

    if manager.has_errors() {
        return Err(DriverError::CompilationFailed.into());
    }
    Ok(())
}

fn dump_air(manager: &ModuleManager) -> anyhow::Result<()> {
    let out = std::io::stdout();
    let mut out = out.lock();

    manager.with_state(|state| -> std::io::Result<()> {
        for module in state.modules.iter().skip(1) {
            for (decl_idx, slot) in module.semas.iter().enumerate() {
                let record = state.map.record(slot.record);
                let dump = koc_air::print_air(&module.airs[decl_idx], &state.pool, record);
                write!(out, "{}", dump)?;
            }
        }
        Ok(())
    })?;

    Ok(())
}
