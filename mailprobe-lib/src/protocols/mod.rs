//! Protocol implementations for domain probing.
//!
//! This module contains the DNS side of the probe: the collaborator trait the
//! pipeline depends on and the record classification applied to TXT sets.

/// Resolver-backed MX/NS/TXT lookups
pub mod dns;

/// SPF and DMARC classification of TXT record sets
pub mod policy;

// Re-export commonly used functions and types
pub use dns::{DnsProbe, DomainProbe};
pub use policy::{dmarc_domain, select_dmarc, select_spf, DMARC_PREFIX, SPF_PREFIX};
