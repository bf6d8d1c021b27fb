//! DNS record lookups for mail-related records.
//!
//! This module provides the [`DomainProbe`] seam the pipeline queries through,
//! and [`DnsProbe`], its implementation on top of the Tokio async resolver.

use crate::error::MailProbeError;
use crate::types::MxHost;
use async_trait::async_trait;
use std::time::Duration;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::TokioAsyncResolver;

/// Source of MX, NS and TXT record sets for a domain.
///
/// Implementations report a failed or empty query as an error; classifying
/// TXT content (SPF, DMARC) is left to the caller.
#[async_trait]
pub trait DomainProbe: Send + Sync {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, MailProbeError>;

    async fn lookup_ns(&self, domain: &str) -> Result<Vec<String>, MailProbeError>;

    async fn lookup_txt(&self, domain: &str) -> Result<Vec<String>, MailProbeError>;
}

/// Resolver-backed probe.
#[derive(Clone)]
pub struct DnsProbe {
    resolver: TokioAsyncResolver,
}

impl DnsProbe {
    /// Create a probe using the system resolver configuration.
    ///
    /// Falls back to the resolver's built-in upstreams when the system
    /// configuration can't be read. `timeout` bounds each upstream request.
    pub fn from_system_conf(timeout: Duration) -> Self {
        let (config, mut opts) = match trust_dns_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                tracing::warn!("Could not read system resolver config ({}), using defaults", e);
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = 2;

        Self::with_resolver(TokioAsyncResolver::tokio(config, opts))
    }

    /// Create a probe from an already configured resolver.
    pub fn with_resolver(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl DomainProbe for DnsProbe {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, MailProbeError> {
        let lookup = self
            .resolver
            .mx_lookup(domain)
            .await
            .map_err(|e| resolve_error("MX", domain, e))?;

        let hosts: Vec<MxHost> = lookup
            .iter()
            .map(|mx| MxHost {
                host: mx.exchange().to_utf8(),
                preference: mx.preference(),
            })
            .collect();

        if hosts.is_empty() {
            return Err(MailProbeError::lookup("MX", domain, "no MX records found"));
        }
        Ok(hosts)
    }

    async fn lookup_ns(&self, domain: &str) -> Result<Vec<String>, MailProbeError> {
        let lookup = self
            .resolver
            .ns_lookup(domain)
            .await
            .map_err(|e| resolve_error("NS", domain, e))?;

        let hosts: Vec<String> = lookup.iter().map(|ns| ns.0.to_utf8()).collect();

        if hosts.is_empty() {
            return Err(MailProbeError::lookup("NS", domain, "no NS records found"));
        }
        Ok(hosts)
    }

    async fn lookup_txt(&self, domain: &str) -> Result<Vec<String>, MailProbeError> {
        let lookup = self
            .resolver
            .txt_lookup(domain)
            .await
            .map_err(|e| resolve_error("TXT", domain, e))?;

        // A TXT record may be split into several character-strings.
        Ok(lookup
            .iter()
            .map(|txt| {
                txt.iter()
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .collect())
    }
}

fn resolve_error(record: &str, domain: &str, err: ResolveError) -> MailProbeError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => {
            MailProbeError::lookup(record, domain, "no records found")
        }
        _ => MailProbeError::lookup(record, domain, err.to_string()),
    }
}
