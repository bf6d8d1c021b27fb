//! Error handling for address validation and domain probing.
//!
//! This module defines the error type shared by the validator, the DNS probe,
//! configuration loading, and the pipeline. Per-address errors never escape a
//! task: they are rendered into that address's report.

use std::fmt;
use std::time::Duration;

/// Main error type for mailprobe operations.
#[derive(Debug, Clone)]
pub enum MailProbeError {
    /// The address failed syntax validation
    InvalidSyntax {
        address: String,
        reason: String,
    },

    /// A DNS query failed or came back empty
    Lookup {
        record: String,
        domain: String,
        message: String,
    },

    /// Records were retrieved but none qualified (e.g. no `v=spf1` entry)
    NotFound {
        record: String,
        domain: String,
    },

    /// A lookup exceeded its deadline
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Configuration errors (invalid settings, unparseable files, etc.)
    ConfigError {
        message: String,
    },

    /// File I/O errors when reading address lists or config files
    FileError {
        path: String,
        message: String,
    },

    /// Anything else, including panics recovered at a task boundary
    Internal {
        message: String,
    },
}

impl MailProbeError {
    /// Create a new syntax error.
    pub fn invalid_syntax<A: Into<String>, R: Into<String>>(address: A, reason: R) -> Self {
        Self::InvalidSyntax {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a new lookup error for the given record type.
    pub fn lookup<R: Into<String>, D: Into<String>, M: Into<String>>(
        record: R,
        domain: D,
        message: M,
    ) -> Self {
        Self::Lookup {
            record: record.into(),
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new "no qualifying record" error.
    pub fn not_found<R: Into<String>, D: Into<String>>(record: R, domain: D) -> Self {
        Self::NotFound {
            record: record.into(),
            domain: domain.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from the DNS side rather than the address itself.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::Lookup { .. } | Self::NotFound { .. } | Self::Timeout { .. }
        )
    }
}

impl fmt::Display for MailProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSyntax { address: _, reason } => {
                write!(f, "{}", reason)
            }
            Self::Lookup {
                record,
                domain,
                message,
            } => {
                write!(f, "{} lookup for '{}' failed: {}", record, domain, message)
            }
            Self::NotFound { record, domain: _ } => {
                write!(f, "{} record not found", record)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for MailProbeError {}

impl From<serde_json::Error> for MailProbeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}

impl From<std::io::Error> for MailProbeError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
