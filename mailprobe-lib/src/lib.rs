//! # Mailprobe Library
//!
//! Validates email addresses and probes their domains for MX, NS, SPF and
//! DMARC records, fanning the work out across tasks behind a fixed-size
//! admission gate and streaming results back in completion order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mailprobe_lib::{MailProber, ProbeConfig, ProbeMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProbeConfig::default().with_mode(ProbeMode::SyntaxOnly);
//!     let prober = MailProber::with_config(config);
//!
//!     let results = prober.dispatch(vec!["jane@example.com".to_string()]);
//!     let mut stdout = tokio::io::stdout();
//!     let printed = mailprobe_lib::drain(results, &mut stdout).await?;
//!     assert_eq!(printed, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Bounded fan-out**: one task per address, at most `concurrency` running
//! - **One result per address**: syntax errors, lookup failures and even
//!   panics are reported inline
//! - **Independent lookups**: MX, NS, SPF and DMARC fail separately
//! - **Per-lookup deadlines**: a hung resolver cannot hold a slot forever

// Re-export main public API types and functions
// This makes them available as mailprobe_lib::TypeName
pub use checker::MailProber;
pub use concurrent::{
    drain, result_channel, spawn_closer, GatePermit, TaskGate, WorkCoordinator, WorkGuard,
    RESULT_CHANNEL_CAPACITY,
};
pub use config::{
    load_env_config, parse_timeout_string, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
};
pub use error::MailProbeError;
pub use protocols::{DnsProbe, DomainProbe};
pub use report::{AddressReport, DnsReport, RecordSection, ReportStatus};
pub use types::{
    AddressRecord, MxHost, OutputFormat, ProbeConfig, ProbeMode, ResultUnit,
    DEFAULT_CONCURRENCY, DEFAULT_LOOKUP_TIMEOUT,
};
pub use utils::{collect_addresses, parse_address_list, read_address_file};
pub use validator::{parse_address, AddressValidator, SyntaxValidator};

// Public modules
pub mod protocols;

// Internal modules - these are not part of the public API
mod checker;
mod concurrent;
mod config;
mod error;
mod report;
mod types;
mod utils;
mod validator;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MailProbeError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
