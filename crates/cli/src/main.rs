//! `unmdx` -- MDX to DAX transcompiler command line.
//!
//! Thin driver over unmdx-core: owns file and stdin/stdout handling,
//! configuration discovery (file + `UNMDX_*` environment variables +
//! flags) and exit codes. Exit 0 on success, 1 when the pipeline raised
//! any error diagnostic, 2 on usage errors (clap's default).

mod commands;
mod settings;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use unmdx_core::{ExplanationDetail, ExplanationFormat, OptimizationLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LevelArg {
    None,
    Conservative,
    Moderate,
    Aggressive,
}

impl From<LevelArg> for OptimizationLevel {
    fn from(value: LevelArg) -> Self {
        match value {
            LevelArg::None => OptimizationLevel::None,
            LevelArg::Conservative => OptimizationLevel::Conservative,
            LevelArg::Moderate => OptimizationLevel::Moderate,
            LevelArg::Aggressive => OptimizationLevel::Aggressive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatArg {
    Sql,
    Natural,
    Json,
    Markdown,
}

impl From<FormatArg> for ExplanationFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Sql => ExplanationFormat::Sql,
            FormatArg::Natural => ExplanationFormat::Natural,
            FormatArg::Json => ExplanationFormat::Json,
            FormatArg::Markdown => ExplanationFormat::Markdown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DetailArg {
    Minimal,
    Standard,
    Detailed,
}

impl From<DetailArg> for ExplanationDetail {
    fn from(value: DetailArg) -> Self {
        match value {
            DetailArg::Minimal => ExplanationDetail::Minimal,
            DetailArg::Standard => ExplanationDetail::Standard,
            DetailArg::Detailed => ExplanationDetail::Detailed,
        }
    }
}

/// MDX to DAX transcompiler.
#[derive(Parser)]
#[command(name = "unmdx", version, about = "MDX to DAX transcompiler")]
struct Cli {
    /// Path to a JSON or YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an MDX query to DAX
    Convert {
        /// Input file; stdin when omitted or '-'
        input: Option<PathBuf>,
        /// Write the DAX to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Linter optimization level
        #[arg(long, value_enum)]
        optimization_level: Option<LevelArg>,
        /// Skip the linter entirely
        #[arg(long, conflicts_with = "use_linter")]
        no_linter: bool,
        /// Run the linter (the default)
        #[arg(long)]
        use_linter: bool,
    },

    /// Explain an MDX query instead of converting it
    Explain {
        /// Input file; stdin when omitted or '-'
        input: Option<PathBuf>,
        /// Write the explanation to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Explanation format
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
        /// Level of detail
        #[arg(short, long, value_enum)]
        detail: Option<DetailArg>,
        /// Embed the DAX equivalent into the explanation
        #[arg(long)]
        include_dax: bool,
    },

    /// Print version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let config = match settings::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Convert {
            input,
            output,
            optimization_level,
            no_linter,
            use_linter: _,
        } => commands::convert::run(
            input.as_deref(),
            output.as_deref(),
            optimization_level,
            no_linter,
            config,
        ),
        Commands::Explain {
            input,
            output,
            format,
            detail,
            include_dax,
        } => commands::explain::run(
            input.as_deref(),
            output.as_deref(),
            format,
            detail,
            include_dax,
            config,
        ),
        Commands::Version => {
            println!("unmdx {}", env!("CARGO_PKG_VERSION"));
            0
        }
    };
    process::exit(code);
}
