//! SPF and DMARC classification of TXT record sets.
//!
//! A TXT set only counts as SPF or DMARC when at least one entry carries the
//! version tag; unrelated TXT content is never reported as policy.

use crate::error::MailProbeError;

/// Version tag every SPF record starts with.
pub const SPF_PREFIX: &str = "v=spf1";

/// Version tag every DMARC record starts with.
pub const DMARC_PREFIX: &str = "v=DMARC1";

/// Name under which a domain publishes its DMARC policy.
pub fn dmarc_domain(domain: &str) -> String {
    format!("_dmarc.{}", domain)
}

/// Keep only the SPF entries of `domain`'s TXT set.
pub fn select_spf(domain: &str, records: Vec<String>) -> Result<Vec<String>, MailProbeError> {
    select_tagged(records, SPF_PREFIX).ok_or_else(|| MailProbeError::not_found("SPF", domain))
}

/// Keep only the DMARC entries of the TXT set found at `_dmarc.<domain>`.
pub fn select_dmarc(domain: &str, records: Vec<String>) -> Result<Vec<String>, MailProbeError> {
    select_tagged(records, DMARC_PREFIX).ok_or_else(|| MailProbeError::not_found("DMARC", domain))
}

fn select_tagged(records: Vec<String>, prefix: &str) -> Option<Vec<String>> {
    let tagged: Vec<String> = records
        .into_iter()
        .filter(|record| record.starts_with(prefix))
        .collect();

    if tagged.is_empty() {
        None
    } else {
        Some(tagged)
    }
}
