//! Core data types for address validation and domain probing.
//!
//! This module defines the records that flow through the pipeline and the
//! configuration threaded into it at startup.

use crate::error::MailProbeError;
use crate::validator::AddressValidator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default gate capacity: at most this many addresses are processed at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default deadline applied to each individual DNS lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// An address as given on the command line plus its parsed parts.
///
/// `local_part` and `domain` are either both populated (`valid == true`) or
/// both empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressRecord {
    /// The raw token exactly as supplied
    pub raw: String,

    /// Part before the `@`
    pub local_part: String,

    /// Part after the `@`
    pub domain: String,

    /// Whether the raw token passed syntax validation
    pub valid: bool,
}

impl AddressRecord {
    /// Create an unparsed record for a raw input token.
    pub fn new<S: Into<String>>(raw: S) -> Self {
        Self {
            raw: raw.into(),
            ..Default::default()
        }
    }

    /// Parse the raw token with the given validator.
    ///
    /// On failure both parts are cleared and the record stays invalid.
    pub fn parse_with(&mut self, validator: &dyn AddressValidator) -> Result<(), MailProbeError> {
        match validator.parse(&self.raw) {
            Ok((local_part, domain)) => {
                self.local_part = local_part;
                self.domain = domain;
                self.valid = true;
                Ok(())
            }
            Err(e) => {
                self.local_part.clear();
                self.domain.clear();
                self.valid = false;
                Err(e)
            }
        }
    }
}

impl fmt::Display for AddressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.local_part.is_empty() || self.domain.is_empty() {
            return Ok(());
        }
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// One mail exchanger from an MX lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxHost {
    pub host: String,
    pub preference: u16,
}

/// One formatted, self-contained report for a single input address.
///
/// Produced exactly once per address and moved through the result channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultUnit(String);

impl ResultUnit {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResultUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What each task does with a syntactically valid address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMode {
    /// Validate syntax, then query MX, NS, SPF and DMARC records
    #[default]
    Full,

    /// Validate syntax only; DNS is never touched
    SyntaxOnly,
}

/// How each report is rendered into a `ResultUnit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Framed human-readable text block
    #[default]
    Text,

    /// One JSON object per line
    Json,
}

/// Configuration for a probing run.
///
/// Built once at startup and handed to the dispatcher; nothing in it changes
/// while tasks are running.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Maximum number of addresses processed concurrently.
    /// Default: 5, Range: 1-100
    pub concurrency: usize,

    /// Syntax-only or full DNS probing
    pub mode: ProbeMode,

    /// Deadline for each individual DNS lookup
    /// Default: 5 seconds
    pub lookup_timeout: Duration,

    /// Rendering of each result unit
    pub output: OutputFormat,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            mode: ProbeMode::Full,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            output: OutputFormat::Text,
        }
    }
}

impl ProbeConfig {
    /// Set the gate capacity, capped to 1..=100.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 100);
        self
    }

    /// Set the probing mode.
    pub fn with_mode(mut self, mode: ProbeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the per-lookup deadline.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Set the output format.
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn is_syntax_only(&self) -> bool {
        self.mode == ProbeMode::SyntaxOnly
    }
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMode::Full => write!(f, "full"),
            ProbeMode::SyntaxOnly => write!(f, "syntax-only"),
        }
    }
}
