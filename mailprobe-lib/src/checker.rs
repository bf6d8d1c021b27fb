//! Main prober implementation.
//!
//! This module provides the `MailProber` struct that validates addresses,
//! probes their domains, and fans the work out across tasks behind the
//! admission gate.

use crate::concurrent::{result_channel, spawn_closer, TaskGate, WorkCoordinator};
use crate::error::MailProbeError;
use crate::protocols::{dmarc_domain, select_dmarc, select_spf, DnsProbe, DomainProbe};
use crate::report::{AddressReport, DnsReport};
use crate::types::{AddressRecord, ProbeConfig, ProbeMode, ResultUnit};
use crate::validator::{AddressValidator, SyntaxValidator};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Validates addresses and probes their domains.
///
/// Cloning is cheap: the collaborators are shared behind `Arc`s.
///
/// # Example
///
/// ```rust,no_run
/// use mailprobe_lib::{MailProber, ProbeConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let prober = MailProber::with_config(ProbeConfig::default());
///     let results = prober.dispatch(vec!["postmaster@example.com".to_string()]);
///     let mut stdout = tokio::io::stdout();
///     mailprobe_lib::drain(results, &mut stdout).await.unwrap();
/// }
/// ```
#[derive(Clone)]
pub struct MailProber {
    /// Settings fixed for the lifetime of a run
    config: ProbeConfig,
    /// Syntax validation collaborator
    validator: Arc<dyn AddressValidator>,
    /// DNS collaborator
    probe: Arc<dyn DomainProbe>,
}

impl MailProber {
    /// Create a prober with default configuration and the system resolver.
    pub fn new() -> Self {
        Self::with_config(ProbeConfig::default())
    }

    /// Create a prober with custom configuration and the system resolver.
    pub fn with_config(config: ProbeConfig) -> Self {
        let probe = DnsProbe::from_system_conf(config.lookup_timeout);
        Self::with_collaborators(config, Arc::new(SyntaxValidator), Arc::new(probe))
    }

    /// Create a prober with explicit collaborators.
    pub fn with_collaborators(
        config: ProbeConfig,
        validator: Arc<dyn AddressValidator>,
        probe: Arc<dyn DomainProbe>,
    ) -> Self {
        Self {
            config,
            validator,
            probe,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Validate one address and, in full mode, probe its domain.
    ///
    /// Never fails: syntax and lookup errors end up inside the report.
    pub async fn check_address(&self, raw: &str) -> AddressReport {
        let mut record = AddressRecord::new(raw);
        if let Err(e) = record.parse_with(self.validator.as_ref()) {
            tracing::debug!(address = raw, "Invalid syntax: {}", e);
            return AddressReport::invalid(raw, &e);
        }

        let report = AddressReport::valid(&record);
        match self.config.mode {
            ProbeMode::SyntaxOnly => report,
            ProbeMode::Full => {
                let dns = self.probe_domain(&record.domain).await;
                report.with_dns(dns)
            }
        }
    }

    /// Query MX, NS, SPF and DMARC for a domain.
    ///
    /// The four lookups run concurrently; a failure in one only affects its
    /// own section.
    pub async fn probe_domain(&self, domain: &str) -> DnsReport {
        let dmarc_name = dmarc_domain(domain);

        let (mx, ns, txt, dmarc_txt) = tokio::join!(
            self.with_deadline("MX", domain, self.probe.lookup_mx(domain)),
            self.with_deadline("NS", domain, self.probe.lookup_ns(domain)),
            self.with_deadline("TXT", domain, self.probe.lookup_txt(domain)),
            self.with_deadline("TXT", &dmarc_name, self.probe.lookup_txt(&dmarc_name)),
        );

        DnsReport {
            mx: mx.into(),
            ns: ns.into(),
            spf: txt.and_then(|records| select_spf(domain, records)).into(),
            dmarc: dmarc_txt
                .and_then(|records| select_dmarc(domain, records))
                .into(),
        }
    }

    async fn with_deadline<T, F>(
        &self,
        record: &str,
        name: &str,
        lookup: F,
    ) -> Result<T, MailProbeError>
    where
        F: Future<Output = Result<T, MailProbeError>>,
    {
        let deadline = self.config.lookup_timeout;
        match tokio::time::timeout(deadline, lookup).await {
            Ok(result) => {
                if let Err(e) = &result {
                    tracing::debug!(record, name, "Lookup failed: {}", e);
                }
                result
            }
            Err(_) => {
                tracing::warn!(record, name, "Lookup timed out after {:?}", deadline);
                Err(MailProbeError::timeout(
                    format!("{} lookup for {}", record, name),
                    deadline,
                ))
            }
        }
    }

    /// Spawn one task per address and return the channel their results
    /// arrive on, in completion order.
    ///
    /// Every address yields exactly one result, including addresses whose
    /// task panicked. The channel closes after the last task is done.
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, addresses: Vec<String>) -> mpsc::Receiver<ResultUnit> {
        let (sender, receiver) = result_channel();
        let gate = TaskGate::new(self.config.concurrency);
        let coordinator = WorkCoordinator::new();

        tracing::info!(
            "Dispatching {} addresses (concurrency: {}, mode: {})",
            addresses.len(),
            gate.capacity(),
            self.config.mode
        );

        for raw in addresses {
            let done = coordinator.register();
            let prober = self.clone();
            let gate = gate.clone();
            let sender = sender.clone();

            tokio::spawn(async move {
                let _done = done;

                // Held until the unit is in the channel, on every path
                let permit = gate.acquire().await;

                let report = match &permit {
                    Ok(_) => {
                        let work = AssertUnwindSafe(prober.check_address(&raw));
                        match work.catch_unwind().await {
                            Ok(report) => report,
                            Err(panic) => {
                                let message = panic_message(panic.as_ref());
                                tracing::warn!(address = %raw, "Task panicked: {}", message);
                                let e = MailProbeError::internal(format!(
                                    "task panicked: {}",
                                    message
                                ));
                                AddressReport::failed(&raw, &e)
                            }
                        }
                    }
                    Err(e) => AddressReport::failed(&raw, e),
                };

                let unit = prober.render(&report);
                if sender.send(unit).await.is_err() {
                    tracing::debug!(address = %raw, "Result channel closed before send");
                }
                drop(permit);
            });
        }

        spawn_closer(coordinator, sender);
        receiver
    }

    fn render(&self, report: &AddressReport) -> ResultUnit {
        report.render(self.config.output).unwrap_or_else(|e| {
            tracing::warn!(address = %report.address, "Falling back to text output: {}", e);
            ResultUnit::new(report.to_text())
        })
    }
}

impl Default for MailProber {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
