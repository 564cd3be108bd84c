//! Spanscope CLI
//!
//! Command-line interface for querying span telemetry.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use spanscope::backend::LogfireClient;
use spanscope::config::{Config, LoggingConfig};
use spanscope::credentials::require_credential;
use spanscope::models::{LookbackUnit, QueryIntent, SearchField, TimeWindow};
use spanscope::pipeline::Pipeline;
use spanscope::present::{OutputMode, Presenter};
use spanscope::Error;

/// Spanscope - analytical queries over span telemetry
#[derive(Parser)]
#[command(name = "spanscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SPANSCOPE_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Shorthand for `--format json`
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => OutputMode::Text,
            OutputFormat::Json => OutputMode::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Query(QueryCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Show the most recent records
    Recent {
        /// Minutes to look back
        #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
        minutes: i64,

        /// Maximum number of results (default: 30)
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Search messages or span names for a term
    Search {
        /// Search term (case-insensitive substring)
        query: String,

        /// Hours to look back
        #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
        hours: i64,

        /// Maximum number of results (default: 20)
        #[arg(long)]
        limit: Option<u32>,

        /// Search span_name instead of message
        #[arg(long)]
        span: bool,

        /// Show full messages and trace ids
        #[arg(short, long)]
        verbose: bool,
    },

    /// Find requests slower than a threshold
    Slow {
        /// Hours to look back
        #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
        hours: i64,

        /// Minimum duration in milliseconds
        #[arg(long, default_value_t = 1000)]
        min_ms: u64,

        /// Maximum number of results (default: 20)
        #[arg(long)]
        limit: Option<u32>,

        /// Filter by endpoint name
        #[arg(long)]
        endpoint: Option<String>,

        /// Show full trace ids
        #[arg(short, long)]
        verbose: bool,
    },

    /// Find recent exceptions
    Errors {
        /// Hours to look back
        #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
        hours: i64,

        /// Maximum number of results (default: 20)
        #[arg(long)]
        limit: Option<u32>,

        /// Filter by file path in the stacktrace
        #[arg(long)]
        file: Option<String>,

        /// Show full exception messages and trace ids
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show request counts, errors and latency per endpoint
    Endpoints {
        /// Hours to look back
        #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
        hours: i64,

        /// Maximum number of endpoints (default: 20)
        #[arg(long)]
        limit: Option<u32>,

        /// Only show endpoints with errors
        #[arg(long)]
        errors: bool,
    },

    /// Show every record of a trace
    Trace {
        /// Trace ID
        trace_id: String,

        /// Narrow to one span of the trace
        #[arg(long)]
        span_id: Option<String>,

        /// Minutes to look back
        #[arg(long, default_value_t = 1440, allow_negative_numbers = true)]
        age: i64,
    },

    /// Run a SQL query against the records table
    Query {
        /// SQL text, sent as written
        sql: String,

        /// Minutes to look back
        #[arg(long, default_value_t = 1440, allow_negative_numbers = true)]
        age: i64,
    },

    /// Print the UI link for a trace
    Link {
        /// Trace ID
        trace_id: String,
    },

    /// Endpoint stats, exceptions and slow requests in one pass
    Report {
        /// Hours to look back
        #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
        hours: i64,

        /// Maximum number of results per section
        #[arg(long, default_value_t = 10)]
        limit: u32,

        /// Slow request threshold in milliseconds
        #[arg(long, default_value_t = 1000)]
        min_ms: u64,

        /// Show full text and trace ids
        #[arg(short, long)]
        verbose: bool,
    },
}

impl QueryCommands {
    fn name(&self) -> &'static str {
        match self {
            Self::Recent { .. } => "recent",
            Self::Search { .. } => "search",
            Self::Slow { .. } => "slow",
            Self::Errors { .. } => "errors",
            Self::Endpoints { .. } => "endpoints",
            Self::Trace { .. } => "trace",
            Self::Query { .. } => "query",
            Self::Link { .. } => "link",
            Self::Report { .. } => "report",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    init_logging(&config.logging, cli.debug);

    let mode = if cli.json {
        OutputMode::Json
    } else {
        cli.format.into()
    };

    let result = match cli.command {
        Commands::Query(command) => run_query(config, command, mode).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(e.downcast_ref::<Error>().map_or(1, Error::exit_code))
        }
    }
}

/// Logs go to stderr so stdout carries only results
fn init_logging(config: &LoggingConfig, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_query(config: Config, command: QueryCommands, mode: OutputMode) -> anyhow::Result<()> {
    let token = require_credential(&config.credentials)?;
    let client = LogfireClient::new(
        &token,
        config.backend.base_url.as_deref(),
        config.backend.timeout,
    )?;
    let pipeline = Pipeline::new(&config, client);

    info!(command = command.name(), "Running command");

    let spinner = (mode == OutputMode::Text).then(|| spinner(command.name()));
    let output = tokio::select! {
        output = execute(&pipeline, command, mode) => output,
        _ = tokio::signal::ctrl_c() => {
            debug!("Interrupted, dropping in-flight request");
            Err(Error::Cancelled.into())
        }
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    println!("{}", output?);
    Ok(())
}

async fn execute(
    pipeline: &Pipeline<LogfireClient>,
    command: QueryCommands,
    mode: OutputMode,
) -> anyhow::Result<String> {
    let (intent, window, full) = match command {
        QueryCommands::Recent { minutes, limit } => (
            QueryIntent::RecentActivity { limit },
            TimeWindow::resolve(minutes, LookbackUnit::Minutes)?,
            false,
        ),

        QueryCommands::Search {
            query,
            hours,
            limit,
            span,
            verbose,
        } => (
            QueryIntent::TextSearch {
                term: query,
                field: if span {
                    SearchField::SpanName
                } else {
                    SearchField::Message
                },
                limit,
            },
            TimeWindow::resolve(hours, LookbackUnit::Hours)?,
            verbose,
        ),

        QueryCommands::Slow {
            hours,
            min_ms,
            limit,
            endpoint,
            verbose,
        } => (
            QueryIntent::SlowRequests {
                min_duration_ms: min_ms,
                endpoint,
                limit,
            },
            TimeWindow::resolve(hours, LookbackUnit::Hours)?,
            verbose,
        ),

        QueryCommands::Errors {
            hours,
            limit,
            file,
            verbose,
        } => (
            QueryIntent::Exceptions { file, limit },
            TimeWindow::resolve(hours, LookbackUnit::Hours)?,
            verbose,
        ),

        QueryCommands::Endpoints {
            hours,
            limit,
            errors,
        } => (
            QueryIntent::EndpointStats {
                limit,
                errors_only: errors,
            },
            TimeWindow::resolve(hours, LookbackUnit::Hours)?,
            false,
        ),

        QueryCommands::Trace {
            trace_id,
            span_id,
            age,
        } => (
            QueryIntent::TraceLookup { trace_id, span_id },
            TimeWindow::resolve(age, LookbackUnit::Minutes)?,
            true,
        ),

        QueryCommands::Query { sql, age } => (
            QueryIntent::RawSql { sql },
            TimeWindow::resolve(age, LookbackUnit::Minutes)?,
            true,
        ),

        QueryCommands::Link { trace_id } => {
            let link = pipeline.trace_link(&trace_id).await?;
            return Ok(match mode {
                OutputMode::Text => format!("Logfire UI link:\n{link}"),
                OutputMode::Json => {
                    serde_json::to_string_pretty(&json!({ "trace_id": trace_id, "link": link }))?
                }
            });
        }

        QueryCommands::Report {
            hours,
            limit,
            min_ms,
            verbose,
        } => {
            let window = TimeWindow::resolve(hours, LookbackUnit::Hours)?;
            let intents = vec![
                QueryIntent::EndpointStats {
                    limit: Some(limit),
                    errors_only: false,
                },
                QueryIntent::Exceptions {
                    file: None,
                    limit: Some(limit),
                },
                QueryIntent::SlowRequests {
                    min_duration_ms: min_ms,
                    endpoint: None,
                    limit: Some(limit),
                },
            ];
            let results = pipeline.run_all(intents, &window).await?;
            return Ok(Presenter::new()
                .full(verbose)
                .window(&window)
                .render_report(&results, mode)?);
        }
    };

    let result = pipeline.run(intent, &window).await?;
    Ok(Presenter::new()
        .full(full)
        .window(&window)
        .render(&result, mode)?)
}

fn spinner(command: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Running {command}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "spanscope", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_lookback_parses() {
        let cli = Cli::try_parse_from(["spanscope", "search", "upload", "--hours", "-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Query(QueryCommands::Search { hours: -1, .. })
        ));
    }

    #[test]
    fn test_json_flag() {
        let cli = Cli::try_parse_from(["spanscope", "--json", "recent"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Query(QueryCommands::Recent { minutes: 5, limit: None })
        ));
    }

    #[test]
    fn test_report_defaults() {
        let cli = Cli::try_parse_from(["spanscope", "report", "--format", "json"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Query(QueryCommands::Report {
                hours: 24,
                limit: 10,
                min_ms: 1000,
                verbose: false
            })
        ));
    }
}
