mod commands;
mod exit_code;
mod progress;
mod workspace;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

pub use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "graphql-client")]
#[command(about = "Validate GraphQL client projects and print what they send", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the project config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Service schema SDL file, overriding the config
    #[arg(short, long, value_name = "FILE", global = true)]
    schema: Option<PathBuf>,

    /// Force colored output even when not a TTY
    #[arg(long, global = true, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored output
    #[arg(long, global = true, conflicts_with = "color")]
    no_color: bool,

    /// Suppress all output except results and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output verbosity options
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    /// Whether to show progress indicators (spinners)
    pub show_progress: bool,
    /// Whether to show informational output (success messages, summaries)
    pub show_info: bool,
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate documents against the service schema and client extensions
    Validate {
        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Print each operation as it is sent to the service
    ///
    /// Operations include every fragment they depend on, with client-only
    /// directives and fields removed.
    ServiceDocuments,

    /// Print an explorer link for each operation
    Links,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON output for tooling
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();
    configure_colors(cli.color, cli.no_color);

    let global = GlobalOptions {
        config: cli.config,
        schema: cli.schema,
        output: OutputOptions {
            show_progress: !cli.quiet,
            show_info: !cli.quiet,
        },
    };

    match cli.command {
        Commands::Validate { format } => commands::validate::run(&global, format).await,
        Commands::ServiceDocuments => commands::service_documents::run(&global).await,
        Commands::Links => commands::links::run(&global).await,
    }
}

/// Print `error` and exit with `code`.
pub fn fail(code: ExitCode, error: &anyhow::Error) -> ! {
    eprintln!("{} {error:#}", "✗".red().bold());
    tracing::debug!(%code, "Exiting");
    code.exit()
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Configure colored output based on flags and environment variables.
///
/// Priority order (highest to lowest):
/// 1. `--color` flag (force colors on)
/// 2. `--no-color` flag (force colors off)
/// 3. `NO_COLOR` environment variable (if set to any value, disable colors)
/// 4. `CLICOLOR_FORCE` environment variable (if set to non-zero, force colors)
/// 5. `CLICOLOR` environment variable (if set to "0", disable colors)
/// 6. Default: colors enabled if stdout is a TTY (handled by `colored` crate)
///
/// See: <https://no-color.org/> and <https://bixense.com/clicolors/>
fn configure_colors(force_color: bool, no_color: bool) {
    use colored::control;

    if force_color {
        control::set_override(true);
    } else if no_color || std::env::var_os("NO_COLOR").is_some() {
        control::set_override(false);
    } else if let Ok(val) = std::env::var("CLICOLOR_FORCE") {
        if !val.is_empty() && val != "0" {
            control::set_override(true);
        }
    } else if std::env::var("CLICOLOR").is_ok_and(|val| val == "0") {
        control::set_override(false);
    }
}
