//! Email address syntax validation.
//!
//! The pipeline only depends on the [`AddressValidator`] trait. The bundled
//! [`SyntaxValidator`] accepts dot-atom and quoted-string local parts and
//! hostname or bracketed IP-literal domains, within the RFC 5321 length limits.

use crate::error::MailProbeError;
use std::net::{IpAddr, Ipv6Addr};

/// Maximum length of a complete address in octets.
const MAX_ADDRESS_LEN: usize = 254;

/// Maximum length of the local part in octets.
const MAX_LOCAL_LEN: usize = 64;

/// Maximum length of a single domain label.
const MAX_LABEL_LEN: usize = 63;

/// Characters allowed in an unquoted local part besides alphanumerics.
const ATEXT_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~";

/// Splits a raw address into `(local_part, domain)` or explains why it can't.
pub trait AddressValidator: Send + Sync {
    fn parse(&self, raw: &str) -> Result<(String, String), MailProbeError>;
}

/// Default grammar-based validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxValidator;

impl AddressValidator for SyntaxValidator {
    fn parse(&self, raw: &str) -> Result<(String, String), MailProbeError> {
        parse_address(raw)
    }
}

/// Validate an address and return its local part and domain.
///
/// # Example
///
/// ```rust
/// use mailprobe_lib::parse_address;
///
/// let (local, domain) = parse_address("jane.doe@example.com").unwrap();
/// assert_eq!(local, "jane.doe");
/// assert_eq!(domain, "example.com");
///
/// assert!(parse_address("not-an-email").is_err());
/// ```
pub fn parse_address(raw: &str) -> Result<(String, String), MailProbeError> {
    let fail = |reason: String| MailProbeError::invalid_syntax(raw, reason);

    if raw.is_empty() {
        return Err(fail("address is empty".to_string()));
    }
    if raw.len() > MAX_ADDRESS_LEN {
        return Err(fail(format!(
            "address exceeds {} characters",
            MAX_ADDRESS_LEN
        )));
    }

    let (local, domain) =
        split_address(raw).ok_or_else(|| fail("missing '@' separator".to_string()))?;

    if local.is_empty() {
        return Err(fail("local part is empty".to_string()));
    }
    if domain.is_empty() {
        return Err(fail("domain is empty".to_string()));
    }
    if local.len() > MAX_LOCAL_LEN {
        return Err(fail(format!(
            "local part exceeds {} characters",
            MAX_LOCAL_LEN
        )));
    }
    if !is_valid_local_part(local) {
        return Err(fail(format!("invalid local part '{}'", local)));
    }
    if !is_valid_domain_part(domain) {
        return Err(fail(format!("invalid domain '{}'", domain)));
    }

    Ok((local.to_string(), domain.to_string()))
}

/// Find the first `@` that is not inside a quoted local part.
fn split_address(raw: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '@' if !in_quotes => return Some((&raw[..i], &raw[i + 1..])),
            _ => {}
        }
    }

    None
}

fn is_valid_local_part(local: &str) -> bool {
    if local.len() >= 2 && local.starts_with('"') && local.ends_with('"') {
        is_valid_quoted_string(&local[1..local.len() - 1])
    } else {
        local.split('.').all(|atom| {
            !atom.is_empty()
                && atom
                    .chars()
                    .all(|c| c.is_alphanumeric() || ATEXT_SPECIALS.contains(c))
        })
    }
}

/// Only `\\` and `\"` are accepted as escapes inside quotes.
fn is_valid_quoted_string(content: &str) -> bool {
    let mut escaped = false;

    for c in content.chars() {
        if escaped {
            if !matches!(c, '\\' | '"') {
                return false;
            }
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' || c.is_control() {
            return false;
        }
    }

    !escaped
}

fn is_valid_domain_part(domain: &str) -> bool {
    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        return literal.parse::<IpAddr>().is_ok()
            || literal
                .strip_prefix("IPv6:")
                .and_then(|ip| ip.parse::<Ipv6Addr>().ok())
                .is_some();
    }

    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = domain.split('.').collect();

    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= MAX_LABEL_LEN
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(raw: &str) -> String {
        parse_address(raw).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_addresses() {
        assert!(parse_address("simple@example.com").is_ok());
        assert!(parse_address("very.common+tag@mail.example.co.uk").is_ok());
        assert!(parse_address("!#$%&'*+-/=?^_`{}|~@example.com").is_ok());
        assert!(parse_address("user@[192.168.0.1]").is_ok());
        assert!(parse_address("user@[IPv6:2001:db8::1]").is_ok());
        assert!(parse_address("Pelé@exämple.中国").is_ok());
    }

    #[test]
    fn test_quoted_local_part_may_contain_at() {
        let (local, domain) = parse_address("\"quoted@local\"@example.com").unwrap();
        assert_eq!(local, "\"quoted@local\"");
        assert_eq!(domain, "example.com");

        assert!(parse_address("\"escaped\\\"quote\"@example.com").is_ok());
        assert!(parse_address("\"bad\\escape\"@example.com").is_err());
    }

    #[test]
    fn test_missing_separator() {
        assert_eq!(reason("not-an-email"), "missing '@' separator");
        assert_eq!(reason("@example.com"), "local part is empty");
        assert_eq!(reason("user@"), "domain is empty");
        assert_eq!(reason(""), "address is empty");
    }

    #[test]
    fn test_length_limits() {
        let long_local = "a".repeat(65);
        assert_eq!(
            reason(&format!("{}@example.com", long_local)),
            "local part exceeds 64 characters"
        );

        let max_local = "a".repeat(64);
        assert!(parse_address(&format!("{}@example.com", max_local)).is_ok());

        let long_domain = format!("{}.com", "b".repeat(250));
        assert_eq!(
            reason(&format!("a@{}", long_domain)),
            "address exceeds 254 characters"
        );
    }

    #[test]
    fn test_invalid_local_parts() {
        assert!(parse_address("no..dots@example.com").is_err());
        assert!(parse_address(".leading@example.com").is_err());
        assert!(parse_address("trailing.@example.com").is_err());
        assert!(parse_address("spaces unquoted@example.com").is_err());
    }

    #[test]
    fn test_invalid_domains() {
        assert_eq!(reason("user@localhost"), "invalid domain 'localhost'");
        assert!(parse_address("user@-hyphenstart.com").is_err());
        assert!(parse_address("user@hyphenend-.com").is_err());
        assert!(parse_address("user@double..dot.com").is_err());
        assert!(parse_address("user@_invalid.com").is_err());
        assert!(parse_address("a@b@example.com").is_err());
        assert!(parse_address("user@[192.168.0.256]").is_err());
    }

    #[test]
    fn test_trait_object_delegates() {
        let validator: &dyn AddressValidator = &SyntaxValidator;
        assert_eq!(
            validator.parse("x@example.org").unwrap(),
            ("x".to_string(), "example.org".to_string())
        );
    }
}
