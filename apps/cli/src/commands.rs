//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use dbbuilder_core::{ProgressReporter, RunSummary, Toolkit};
use dbbuilder_shared::{AppConfig, DbBuilderError, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// dbbuilder: generate building-product tables and manufacturer lists.
#[derive(Parser)]
#[command(
    name = "dbbuilder",
    version,
    about = "Generate building-product parameter tables and manufacturer databases.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Pipeline mode. Without one, a numbered menu is shown.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a parameter table for every product in the remaining file.
    Parameters,

    /// Search for the manufacturers of every product in the remaining file.
    Manufacturers,

    /// Find the website of every name in the manufacturer names file.
    Websites,

    /// Find the product page of every manufacturer with a known website.
    ProductPages,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// A runnable pipeline mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Parameters,
    Manufacturers,
    Websites,
    ProductPages,
}

impl Mode {
    const ALL: [Mode; 4] = [
        Mode::Parameters,
        Mode::Manufacturers,
        Mode::Websites,
        Mode::ProductPages,
    ];

    fn describe(self) -> &'static str {
        match self {
            Mode::Parameters => "Generate parameter tables",
            Mode::Manufacturers => "Search for manufacturers",
            Mode::Websites => "Find manufacturer websites",
            Mode::ProductPages => "Find manufacturer product pages",
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dbbuilder=info",
        1 => "dbbuilder=debug",
        _ => "dbbuilder=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    let mode = match cli.command {
        Some(Command::Parameters) => Mode::Parameters,
        Some(Command::Manufacturers) => Mode::Manufacturers,
        Some(Command::Websites) => Mode::Websites,
        Some(Command::ProductPages) => Mode::ProductPages,
        Some(Command::Config { action }) => {
            match action {
                ConfigAction::Init => cmd_config_init()?,
                ConfigAction::Show => cmd_config_show()?,
            }
            return Ok(ExitCode::SUCCESS);
        }
        None => {
            let stdin = std::io::stdin();
            match select_mode(stdin.lock(), std::io::stdout())? {
                Some(mode) => mode,
                None => return Ok(ExitCode::SUCCESS),
            }
        }
    };

    cmd_run(mode).await
}

/// Show the numbered menu until a valid choice is read. `None` on `q` or EOF.
pub(crate) fn select_mode(
    mut input: impl BufRead,
    mut output: impl Write,
) -> Result<Option<Mode>> {
    loop {
        writeln!(output)?;
        for (i, mode) in Mode::ALL.iter().enumerate() {
            writeln!(output, "  {}. {}", i + 1, mode.describe())?;
        }
        write!(output, "Select a mode (q to quit): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let choice = line.trim();
        if choice.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match choice.parse::<usize>() {
            Ok(n) if (1..=Mode::ALL.len()).contains(&n) => return Ok(Some(Mode::ALL[n - 1])),
            _ => writeln!(output, "Invalid choice: {choice:?}")?,
        }
    }
}

async fn cmd_run(mode: Mode) -> Result<ExitCode> {
    let config = load_config()?;
    let toolkit = Toolkit::from_config(&config)?;

    info!(?mode, "starting run");
    let reporter = CliProgress::new();

    let result = match mode {
        Mode::Parameters => {
            dbbuilder_core::run_parameter_tables(&toolkit, &config, &reporter).await
        }
        Mode::Manufacturers => {
            dbbuilder_core::run_manufacturer_search(&toolkit, &config, &reporter).await
        }
        Mode::Websites => dbbuilder_core::run_website_finder(&toolkit, &config, &reporter).await,
        Mode::ProductPages => {
            dbbuilder_core::run_product_page_finder(&toolkit, &config, &reporter).await
        }
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(DbBuilderError::MissingInput { path }) => {
            reporter.abandon();
            eprintln!("Could not find file: {}", path.display());
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            reporter.abandon();
            return Err(e.into());
        }
    };

    print_summary(mode, &summary);
    Ok(ExitCode::SUCCESS)
}

fn print_summary(mode: Mode, summary: &RunSummary) {
    println!();
    println!("  {} finished.", mode.describe());
    println!("  Processed: {}/{}", summary.completed, summary.total);
    println!("  Chunks:    {}", summary.chunks);
    if !summary.failures.is_empty() {
        println!("  Failed:    {}", summary.failures.len());
        for failure in &summary.failures {
            println!("    - {}: {}", failure.input, failure.error);
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.abandon();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn chunk_started(&self, first: usize, last: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing items {first}..{last} of {total}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choose(input: &str) -> (Option<Mode>, String) {
        let mut out = Vec::new();
        let mode = select_mode(input.as_bytes(), &mut out).unwrap();
        (mode, String::from_utf8(out).unwrap())
    }

    #[test]
    fn menu_selects_by_number() {
        let (mode, out) = choose("3\n");
        assert_eq!(mode, Some(Mode::Websites));
        assert!(out.contains("1. Generate parameter tables"));
        assert!(out.contains("4. Find manufacturer product pages"));
    }

    #[test]
    fn menu_reprompts_on_bad_input() {
        let (mode, out) = choose("9\nabc\n1\n");
        assert_eq!(mode, Some(Mode::Parameters));
        assert_eq!(out.matches("Invalid choice").count(), 2);
    }

    #[test]
    fn menu_quits() {
        assert_eq!(choose("q\n").0, None);
        assert_eq!(choose("").0, None);
    }

    #[test]
    fn cli_parses_without_subcommand() {
        let cli = Cli::try_parse_from(["dbbuilder", "-vv", "--log-format", "json"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));

        let cli = Cli::try_parse_from(["dbbuilder", "product-pages"]).unwrap();
        assert!(matches!(cli.command, Some(Command::ProductPages)));
    }
}
