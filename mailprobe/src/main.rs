//! Mailprobe CLI Application
//!
//! A command-line interface for validating email addresses and probing the
//! MX, NS, SPF and DMARC records of their domains.
//! This CLI application provides a user-friendly interface to the mailprobe-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::style;
use mailprobe_lib::{
    collect_addresses, drain, load_env_config, parse_timeout_string, ConfigManager, EnvConfig,
    FileConfig, MailProber, OutputFormat, ProbeConfig, ProbeMode,
};
use std::path::Path;
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for mailprobe
#[derive(Parser, Debug)]
#[command(name = "mailprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate email addresses and inspect their mail DNS records")]
#[command(
    long_about = "Validate email addresses and inspect the MX, NS, SPF and DMARC records of their domains.\n\nAddresses are processed concurrently and reports are printed as they complete, so output order may differ from input order."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Email addresses to check
    #[arg(value_name = "ADDRESSES", help_heading = "Input")]
    pub addresses: Vec<String>,

    /// Input file with addresses (one per line, '#' starts a comment)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Input"
    )]
    pub file: Option<String>,

    /// Only check address syntax, skip all DNS lookups
    #[arg(short = 'p', long = "parse-only", help_heading = "Mode")]
    pub parse_only: bool,

    /// Run DNS lookups even if config or MP_PARSE_ONLY enables parse-only
    #[arg(long = "full", conflicts_with = "parse_only", help_heading = "Mode")]
    pub full: bool,

    /// Output one JSON object per address
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Text blocks even if config or MP_JSON enables JSON
    #[arg(long = "text", conflicts_with = "json", help_heading = "Output Format")]
    pub text: bool,

    /// Max addresses processed concurrently (default: 5, max: 100)
    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub concurrency: Option<usize>,

    /// Deadline for each DNS lookup, e.g. 5s, 30s, 2m (default: 5s)
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "DURATION",
        help_heading = "Performance"
    )]
    pub timeout: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging and a run summary on stderr
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }

    tracing::info!("mailprobe v{} starting", env!("CARGO_PKG_VERSION"));

    // Per-address failures are part of the output; only setup errors exit non-zero
    if let Err(e) = run_probe(args).await {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}

/// Install the stderr tracing subscriber. `RUST_LOG` overrides the flags.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 100 {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    Ok(())
}

/// Main probing logic: resolve config, gather addresses, stream reports.
async fn run_probe(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;

    let addresses = collect_addresses(&args.addresses, args.file.as_deref().map(Path::new))?;
    let total = addresses.len();

    if args.verbose {
        ui::print_header(total, &config);
    }

    let prober = MailProber::with_config(config);
    let start_time = Instant::now();

    let results = prober.dispatch(addresses);
    let mut stdout = tokio::io::stdout();
    let printed = drain(results, &mut stdout).await?;

    if args.verbose {
        ui::print_summary(printed, total, start_time.elapsed());
    }

    Ok(())
}

/// Build ProbeConfig from CLI arguments with config file integration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Environment variables (MP_*)
/// 3. Config file given with --config or MP_CONFIG, otherwise discovered
///    files (./mailprobe.toml > ~/.mailprobe.toml > XDG config)
/// 4. Built-in defaults
fn build_config(args: &Args) -> Result<ProbeConfig, Box<dyn std::error::Error>> {
    let env_config = load_env_config(args.verbose);
    let manager = ConfigManager::new(args.verbose);

    let file_config = match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };

    let config = merge_file_config_into_probe_config(ProbeConfig::default(), &file_config);
    let config = apply_environment_config(config, &env_config);
    Ok(apply_cli_args_to_config(config, args))
}

fn merge_file_config_into_probe_config(
    mut config: ProbeConfig,
    file_config: &FileConfig,
) -> ProbeConfig {
    if let Some(defaults) = &file_config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(secs) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
            config = config.with_lookup_timeout(Duration::from_secs(secs));
        }
        if defaults.parse_only == Some(true) {
            config = config.with_mode(ProbeMode::SyntaxOnly);
        }
        if defaults.json == Some(true) {
            config = config.with_output(OutputFormat::Json);
        }
    }
    config
}

fn apply_environment_config(mut config: ProbeConfig, env_config: &EnvConfig) -> ProbeConfig {
    if let Some(concurrency) = env_config.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(secs) = env_config.timeout.as_deref().and_then(parse_timeout_string) {
        config = config.with_lookup_timeout(Duration::from_secs(secs));
    }
    if let Some(parse_only) = env_config.parse_only {
        config = config.with_mode(if parse_only {
            ProbeMode::SyntaxOnly
        } else {
            ProbeMode::Full
        });
    }
    if let Some(json) = env_config.json {
        config = config.with_output(if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        });
    }
    config
}

/// Absent flags keep the lower layers; `--full` and `--text` undo a
/// parse-only or JSON setting inherited from them.
fn apply_cli_args_to_config(mut config: ProbeConfig, args: &Args) -> ProbeConfig {
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(secs) = args.timeout.as_deref().and_then(parse_timeout_string) {
        config = config.with_lookup_timeout(Duration::from_secs(secs));
    }
    if args.parse_only {
        config = config.with_mode(ProbeMode::SyntaxOnly);
    } else if args.full {
        config = config.with_mode(ProbeMode::Full);
    }
    if args.json {
        config = config.with_output(OutputFormat::Json);
    } else if args.text {
        config = config.with_output(OutputFormat::Text);
    }
    config
}
