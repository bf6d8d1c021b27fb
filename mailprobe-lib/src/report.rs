//! Per-address reports and their rendering into result units.
//!
//! A report is assembled inside a worker task and rendered exactly once,
//! either as a framed text block or as a single JSON line.

use crate::error::MailProbeError;
use crate::types::{AddressRecord, MxHost, OutputFormat, ResultUnit};
use serde::Serialize;

/// Outcome of processing one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    ValidSyntax,
    InvalidSyntax,
    /// The task itself failed (recovered panic)
    Failed,
}

/// One record section: the qualifying records, or why there are none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSection<T> {
    pub records: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> From<Result<Vec<T>, MailProbeError>> for RecordSection<T> {
    fn from(result: Result<Vec<T>, MailProbeError>) -> Self {
        match result {
            Ok(records) => Self {
                records,
                error: None,
            },
            Err(e) => Self {
                records: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// DNS findings for a syntactically valid address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsReport {
    pub mx: RecordSection<MxHost>,
    pub ns: RecordSection<String>,
    pub spf: RecordSection<String>,
    pub dmarc: RecordSection<String>,
}

/// Everything known about one input address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressReport {
    pub address: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub local_part: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsReport>,
}

impl AddressReport {
    /// Report for an address that passed syntax validation.
    pub fn valid(record: &AddressRecord) -> Self {
        Self {
            address: record.raw.clone(),
            status: ReportStatus::ValidSyntax,
            local_part: record.local_part.clone(),
            domain: record.domain.clone(),
            error: None,
            dns: None,
        }
    }

    /// Report for an address that failed syntax validation.
    pub fn invalid(raw: &str, error: &MailProbeError) -> Self {
        Self {
            address: raw.to_string(),
            status: ReportStatus::InvalidSyntax,
            local_part: String::new(),
            domain: String::new(),
            error: Some(error.to_string()),
            dns: None,
        }
    }

    /// Report for an address whose task died before producing a result.
    pub fn failed(raw: &str, error: &MailProbeError) -> Self {
        Self {
            status: ReportStatus::Failed,
            ..Self::invalid(raw, error)
        }
    }

    pub fn with_dns(mut self, dns: DnsReport) -> Self {
        self.dns = Some(dns);
        self
    }

    /// Render into the unit handed to the result channel.
    pub fn render(&self, format: OutputFormat) -> Result<ResultUnit, MailProbeError> {
        match format {
            OutputFormat::Text => Ok(ResultUnit::new(self.to_text())),
            OutputFormat::Json => {
                let mut line = serde_json::to_string(self)?;
                line.push('\n');
                Ok(ResultUnit::new(line))
            }
        }
    }

    /// Framed text block: a `=` rule sized to the widest line, then
    /// dash-padded label lines and any record sections.
    pub fn to_text(&self) -> String {
        match self.status {
            ReportStatus::ValidSyntax => self.valid_text(),
            ReportStatus::InvalidSyntax => self.error_text("Invalid Syntax"),
            ReportStatus::Failed => self.error_text("Probe Failed"),
        }
    }

    fn valid_text(&self) -> String {
        let shown = format!("{}@{}", self.local_part, self.domain);
        let width = [
            width_of(&shown) + width_of("Valid Syntax"),
            width_of("Domain") + width_of(&self.domain),
            width_of("LocalPart") + width_of(&self.local_part),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 5;

        let mut out = rule(width);
        out.push_str(&padded(&shown, "Valid Syntax", width));
        out.push_str(&padded("Domain", &self.domain, width));
        out.push_str(&padded("LocalPart", &self.local_part, width));

        if let Some(dns) = &self.dns {
            push_section(&mut out, "MX Records", width, &dns.mx, |mx| {
                format!("Host: {}\t\tPreference: {}", mx.host, mx.preference)
            });
            push_section(&mut out, "NS record", width, &dns.ns, |ns| ns.clone());
            push_section(&mut out, "SPF records", width, &dns.spf, |txt| txt.clone());
            push_section(&mut out, "DMARC record", width, &dns.dmarc, |txt| txt.clone());
        }

        out
    }

    fn error_text(&self, label: &str) -> String {
        let message = self.error.as_deref().unwrap_or_default();
        let width = (width_of(&self.address) + width_of(label)).max(width_of(message)) + 5;

        let mut out = rule(width);
        out.push_str(&padded(&self.address, label, width));
        out.push_str(message);
        out.push('\n');
        out
    }
}

fn width_of(s: &str) -> usize {
    s.chars().count()
}

fn rule(width: usize) -> String {
    format!("{}\n", "=".repeat(width))
}

/// `left`, dashes, `right`, filling exactly `width` columns.
fn padded(left: &str, right: &str, width: usize) -> String {
    let dashes = width.saturating_sub(width_of(left) + width_of(right));
    format!("{}{}{}\n", left, "-".repeat(dashes), right)
}

fn push_section<T>(
    out: &mut String,
    title: &str,
    width: usize,
    section: &RecordSection<T>,
    line: impl Fn(&T) -> String,
) {
    out.push_str(&format!("{:-^1$}\n", title, width));
    match &section.error {
        Some(error) => {
            out.push_str(error);
            out.push('\n');
        }
        None => {
            for record in &section.records {
                out.push_str(&line(record));
                out.push('\n');
            }
        }
    }
}
