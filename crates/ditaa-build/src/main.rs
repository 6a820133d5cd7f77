//! Ditaa build CLI.
//!
//! Provides commands for:
//! - `build`: Render every `*.ditaa` document of a source tree
//! - `render`: Render one embedded diagram from a file or stdin

mod commands;
mod error;
mod front_matter;
mod output;
mod scanner;
mod settings;

use clap::{Parser, Subcommand};
use ditaa_diagrams::ECHO_TARGET;
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, RenderArgs};
use output::Output;

/// Ditaa diagram builder.
#[derive(Parser)]
#[command(name = "ditaa-build", version, about)]
struct Cli {
    /// Enable verbose output (show render logs and ditaa output).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render all `*.ditaa` documents under the source directory.
    Build(BuildArgs),
    /// Render a single embedded diagram.
    Render(RenderArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Render(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

/// Build the log filter.
///
/// `--verbose` enables INFO level. Otherwise `RUST_LOG` applies, defaulting to
/// WARN plus ditaa's echoed output, which only appears for diagrams rendered
/// with `debug` or `verbose`.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("info");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives()))
}

fn default_directives() -> String {
    format!("warn,{ECHO_TARGET}=info")
}
