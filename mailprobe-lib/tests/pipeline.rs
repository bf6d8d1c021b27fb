//! End-to-end tests for the dispatch/drain pipeline.
//!
//! DNS is replaced with in-process probes so these run offline.

use async_trait::async_trait;
use mailprobe_lib::{
    drain, DomainProbe, MailProbeError, MailProber, MxHost, OutputFormat, ProbeConfig, ProbeMode,
    SyntaxValidator, DEFAULT_CONCURRENCY, RESULT_CHANNEL_CAPACITY,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Answers every domain with one MX host, a tagged SPF entry and a DMARC policy.
/// Domains under `.invalid` fail their MX lookup.
#[derive(Default)]
struct StaticProbe;

#[async_trait]
impl DomainProbe for StaticProbe {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, MailProbeError> {
        if domain.ends_with(".invalid") {
            return Err(MailProbeError::lookup("MX", domain, "no records found"));
        }
        Ok(vec![MxHost {
            host: format!("mx.{}.", domain),
            preference: 10,
        }])
    }

    async fn lookup_ns(&self, domain: &str) -> Result<Vec<String>, MailProbeError> {
        Ok(vec![format!("ns1.{}.", domain)])
    }

    async fn lookup_txt(&self, domain: &str) -> Result<Vec<String>, MailProbeError> {
        if domain.starts_with("_dmarc.") {
            Ok(vec!["v=DMARC1; p=reject".to_string()])
        } else if domain == "nospf.com" {
            Ok(vec!["some-verification=abc".to_string()])
        } else {
            Ok(vec!["v=spf1 -all".to_string()])
        }
    }
}

/// Tracks how many MX lookups are in flight at once.
#[derive(Default)]
struct GaugeProbe {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl DomainProbe for GaugeProbe {
    async fn lookup_mx(&self, _domain: &str) -> Result<Vec<MxHost>, MailProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn lookup_ns(&self, _domain: &str) -> Result<Vec<String>, MailProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn lookup_txt(&self, _domain: &str) -> Result<Vec<String>, MailProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Panics on MX lookups for one domain.
struct PanickyProbe;

#[async_trait]
impl DomainProbe for PanickyProbe {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, MailProbeError> {
        if domain == "boom.com" {
            panic!("resolver exploded");
        }
        StaticProbe.lookup_mx(domain).await
    }

    async fn lookup_ns(&self, domain: &str) -> Result<Vec<String>, MailProbeError> {
        StaticProbe.lookup_ns(domain).await
    }

    async fn lookup_txt(&self, domain: &str) -> Result<Vec<String>, MailProbeError> {
        StaticProbe.lookup_txt(domain).await
    }
}

/// Counts admitted addresses by their MX lookup; optionally panics there.
struct AdmissionProbe {
    admitted: AtomicUsize,
    panic: bool,
}

impl AdmissionProbe {
    fn new(panic: bool) -> Self {
        Self {
            admitted: AtomicUsize::new(0),
            panic,
        }
    }
}

#[async_trait]
impl DomainProbe for AdmissionProbe {
    async fn lookup_mx(&self, _domain: &str) -> Result<Vec<MxHost>, MailProbeError> {
        self.admitted.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("lookup blew up");
        }
        Ok(Vec::new())
    }

    async fn lookup_ns(&self, _domain: &str) -> Result<Vec<String>, MailProbeError> {
        Ok(Vec::new())
    }

    async fn lookup_txt(&self, _domain: &str) -> Result<Vec<String>, MailProbeError> {
        Ok(Vec::new())
    }
}

/// Never answers.
struct SilentProbe;

#[async_trait]
impl DomainProbe for SilentProbe {
    async fn lookup_mx(&self, _domain: &str) -> Result<Vec<MxHost>, MailProbeError> {
        std::future::pending().await
    }

    async fn lookup_ns(&self, _domain: &str) -> Result<Vec<String>, MailProbeError> {
        std::future::pending().await
    }

    async fn lookup_txt(&self, _domain: &str) -> Result<Vec<String>, MailProbeError> {
        std::future::pending().await
    }
}

fn prober(probe: Arc<dyn DomainProbe>, config: ProbeConfig) -> MailProber {
    MailProber::with_collaborators(config, Arc::new(SyntaxValidator), probe)
}

async fn run(prober: &MailProber, addresses: &[&str]) -> (usize, String) {
    let addresses = addresses.iter().map(|s| s.to_string()).collect();
    let results = prober.dispatch(addresses);
    let mut out = Vec::new();
    let printed = drain(results, &mut out).await.unwrap();
    (printed, String::from_utf8(out).unwrap())
}

fn owned(addresses: &[&str]) -> Vec<String> {
    addresses.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_one_result_per_address() {
    let prober = prober(Arc::new(StaticProbe), ProbeConfig::default());
    let addresses = [
        "alice@example.com",
        "not-an-address",
        "bob@broken.invalid",
        "@missing-local.com",
        "carol@example.org",
        "dave@nospf.com",
    ];

    let (printed, output) = run(&prober, &addresses).await;

    assert_eq!(printed, addresses.len());
    assert_eq!(output.matches("Valid Syntax").count(), 4);
    assert_eq!(output.matches("Invalid Syntax").count(), 2);
    for address in ["alice@example.com", "bob@broken.invalid", "carol@example.org"] {
        assert!(output.contains(address), "missing block for {}", address);
    }
    assert!(output.contains("not-an-address"));
}

#[tokio::test]
async fn test_lookup_failure_stays_in_its_section() {
    let prober = prober(Arc::new(StaticProbe), ProbeConfig::default());
    let (printed, output) = run(&prober, &["bob@broken.invalid"]).await;

    assert_eq!(printed, 1);
    assert!(output.contains("no records found"));
    assert!(output.contains("ns1.broken.invalid."));
    assert!(output.contains("v=spf1 -all"));
    assert!(output.contains("v=DMARC1; p=reject"));
}

#[tokio::test]
async fn test_missing_spf_is_reported() {
    let prober = prober(Arc::new(StaticProbe), ProbeConfig::default());
    let (_, output) = run(&prober, &["dave@nospf.com"]).await;

    assert!(output.contains("SPF records"));
    assert!(output.contains("SPF record not found"));
    assert!(!output.contains("some-verification=abc"));
}

#[tokio::test]
async fn test_mx_hosts_rendered() {
    let prober = prober(Arc::new(StaticProbe), ProbeConfig::default());
    let (_, output) = run(&prober, &["alice@example.com"]).await;

    assert!(output.contains("MX Records"));
    assert!(output.contains("Host: mx.example.com.\t\tPreference: 10"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_limit() {
    let probe = Arc::new(GaugeProbe::default());
    let prober = prober(probe.clone(), ProbeConfig::default());
    let addresses: Vec<String> = (0..20).map(|i| format!("user{}@example.com", i)).collect();

    let results = prober.dispatch(addresses);
    let mut out = Vec::new();
    let printed = drain(results, &mut out).await.unwrap();

    assert_eq!(printed, 20);
    let peak = probe.peak.load(Ordering::SeqCst);
    assert_eq!(peak, 5, "gate should admit exactly 5 addresses under load");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_custom_concurrency_limit() {
    let probe = Arc::new(GaugeProbe::default());
    let config = ProbeConfig::default().with_concurrency(2);
    let prober = prober(probe.clone(), config);

    let (printed, _) = run(
        &prober,
        &["a@x.com", "b@x.com", "c@x.com", "d@x.com", "e@x.com", "f@x.com"],
    )
    .await;

    assert_eq!(printed, 6);
    assert!(probe.peak.load(Ordering::SeqCst) <= 2);
}

/// With nobody reading, a task keeps its slot while blocked on the full
/// channel, so only the gate capacity plus one buffered result get admitted.
async fn assert_slots_held_until_sent(panic: bool) {
    let probe = Arc::new(AdmissionProbe::new(panic));
    let prober = prober(probe.clone(), ProbeConfig::default());
    let addresses: Vec<String> = (0..20).map(|i| format!("user{}@example.com", i)).collect();

    let results = prober.dispatch(addresses);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        probe.admitted.load(Ordering::SeqCst),
        DEFAULT_CONCURRENCY + RESULT_CHANNEL_CAPACITY
    );

    let mut out = Vec::new();
    let printed = drain(results, &mut out).await.unwrap();
    assert_eq!(printed, 20);
    assert_eq!(probe.admitted.load(Ordering::SeqCst), 20);
}

#[tokio::test]
async fn test_slot_released_only_after_send() {
    assert_slots_held_until_sent(false).await;
}

#[tokio::test]
async fn test_slot_released_only_after_send_when_task_panics() {
    assert_slots_held_until_sent(true).await;
}

#[tokio::test]
async fn test_syntax_only_mode_skips_dns() {
    let probe = Arc::new(GaugeProbe::default());
    let config = ProbeConfig::default().with_mode(ProbeMode::SyntaxOnly);
    let prober = prober(probe.clone(), config);

    let (printed, output) = run(&prober, &["a@example.com", "b@example.com", "nope"]).await;

    assert_eq!(printed, 3);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    assert!(!output.contains("MX Records"));
    assert!(!output.contains("DMARC record"));
}

#[tokio::test]
async fn test_panicking_task_still_reports() {
    let prober = prober(Arc::new(PanickyProbe), ProbeConfig::default());
    let addresses = ["ok@example.com", "bad@boom.com", "fine@example.org"];

    let (printed, output) = run(&prober, &addresses).await;

    assert_eq!(printed, 3);
    assert!(output.contains("Probe Failed"));
    assert!(output.contains("task panicked: resolver exploded"));
    assert_eq!(output.matches("Valid Syntax").count(), 2);
}

#[tokio::test]
async fn test_no_addresses_closes_immediately() {
    let prober = prober(Arc::new(StaticProbe), ProbeConfig::default());
    let results = prober.dispatch(Vec::new());
    let mut out = Vec::new();

    let printed = tokio::time::timeout(Duration::from_secs(1), drain(results, &mut out))
        .await
        .expect("drain should finish without any work")
        .unwrap();

    assert_eq!(printed, 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_hung_lookups_time_out() {
    let config = ProbeConfig::default().with_lookup_timeout(Duration::from_millis(50));
    let prober = prober(Arc::new(SilentProbe), config);

    let (printed, output) = run(&prober, &["slow@example.com"]).await;

    assert_eq!(printed, 1);
    assert_eq!(output.matches("Timeout after").count(), 4);
}

#[tokio::test]
async fn test_json_output_has_one_line_per_address() {
    let config = ProbeConfig::default().with_output(OutputFormat::Json);
    let prober = prober(Arc::new(StaticProbe), config);

    let results = prober.dispatch(owned(&["alice@example.com", "broken"]));
    let mut out = Vec::new();
    let printed = drain(results, &mut out).await.unwrap();
    let output = String::from_utf8(out).unwrap();

    assert_eq!(printed, 2);
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);

    let valid = lines
        .iter()
        .find(|v| v["status"] == "valid_syntax")
        .unwrap();
    assert_eq!(valid["domain"], "example.com");
    assert_eq!(valid["dns"]["mx"]["records"][0]["preference"], 10);

    let invalid = lines
        .iter()
        .find(|v| v["status"] == "invalid_syntax")
        .unwrap();
    assert!(invalid.get("dns").is_none());
}
