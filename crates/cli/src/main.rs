mod report;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use drools_core::{ParseOptions, ParseResult, DEFAULT_MAX_ERRORS, DEFAULT_MAX_NESTING_DEPTH};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use report::{diagnostic_line, CheckReport, Summary};

/// Exit status when the file parsed but carries error diagnostics.
const EXIT_DIAGNOSTICS: i32 = 1;
/// Exit status for I/O and encoding failures.
const EXIT_FAILURE: i32 = 2;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Fault-tolerant Drools rule file parser.
#[derive(Parser)]
#[command(name = "drools", version, about = "Fault-tolerant Drools rule file parser")]
struct Cli {
    /// Output format for `check` and for errors (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log parser progress to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Stop collecting diagnostics after this many
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ERRORS)]
    max_errors: usize,

    /// Keyword patterns nested deeper than this are kept as flat text
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_NESTING_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a .drl file and print its syntax tree and diagnostics as JSON
    Parse {
        /// Path to the .drl file, or `-` for stdin
        file: PathBuf,
        /// Print the JSON on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Report the diagnostics of a .drl file
    Check {
        /// Path to the .drl file, or `-` for stdin
        file: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error reading '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = ParseOptions {
        max_errors: cli.max_errors,
        max_nesting_depth: cli.max_depth,
    };
    let outcome = match &cli.command {
        Commands::Parse { file, compact } => cmd_parse(file, *compact, &options),
        Commands::Check { file } => cmd_check(file, &options, cli.output, cli.quiet),
    };

    match outcome {
        Ok(result) if result.has_errors() => process::exit(EXIT_DIAGNOSTICS),
        Ok(_) => {}
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(EXIT_FAILURE);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the source named by `path`; `-` reads stdin.
fn read_source(path: &Path) -> Result<(String, String), CliError> {
    let shown = path.display().to_string();
    let read_error = |source| CliError::Read {
        path: shown.clone(),
        source,
    };
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(read_error)?;
        return Ok(("<stdin>".to_owned(), text));
    }
    let text = std::fs::read_to_string(path).map_err(read_error)?;
    debug!(file = %shown, bytes = text.len(), "read source");
    Ok((shown, text))
}

fn cmd_parse(file: &Path, compact: bool, options: &ParseOptions) -> Result<ParseResult, CliError> {
    let (_, text) = read_source(file)?;
    let result = drools_core::parse_with_options(&text, options);
    let json = if compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{}", json);
    Ok(result)
}

fn cmd_check(
    file: &Path,
    options: &ParseOptions,
    output: OutputFormat,
    quiet: bool,
) -> Result<ParseResult, CliError> {
    let (name, text) = read_source(file)?;
    let result = drools_core::parse_with_options(&text, options);
    match output {
        OutputFormat::Json => {
            let report = CheckReport::new(&name, &result);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for error in &result.errors {
                println!("{}", diagnostic_line(&name, error));
            }
            if !quiet {
                println!("{}: {}", name, Summary::of(&result.errors));
            }
        }
    }
    Ok(result)
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
