//! Verbose-mode display logic for the mailprobe CLI.
//!
//! Reports themselves go to stdout untouched; the header and summary here
//! are written to stderr so piped output stays clean.

use console::style;
use mailprobe_lib::ProbeConfig;
use std::time::Duration;

/// Print a styled header at the start of a verbose run.
pub fn print_header(address_count: usize, config: &ProbeConfig) {
    eprintln!(
        "{} {} {}",
        style("mailprobe").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "· checking {} address{}",
            address_count,
            if address_count == 1 { "" } else { "es" }
        ))
        .dim(),
    );

    let meta_parts = [
        format!("Mode: {}", config.mode),
        format!("Concurrency: {}", config.concurrency),
        format!("Lookup timeout: {}s", config.lookup_timeout.as_secs()),
    ];
    eprintln!("{}", style(meta_parts.join(" | ")).dim());
    eprintln!();
}

/// Print the end-of-run summary.
pub fn print_summary(printed: usize, expected: usize, duration: Duration) {
    let count = format!("{}/{} reports", printed, expected);
    let count = if printed == expected {
        style(count).green().bold()
    } else {
        style(count).yellow().bold()
    };

    eprintln!();
    eprintln!(
        "{} {} in {:.2}s",
        style("Done:").bold(),
        count,
        duration.as_secs_f64()
    );
}
