//! HMAC-SHA256 signing for document service webhooks.
//!
//! The service signs every callback with a single header:
//!
//! ```text
//! t=<unix-seconds>,v1=<lowercase-hex-hmac-sha256>
//! ```
//!
//! The signed content is `{timestamp}.{payload}`, keyed with the webhook secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::{SignatureVerificationError, VerificationFailure};

type HmacSha256 = Hmac<Sha256>;

/// Header key carrying the unix timestamp
pub const TIMESTAMP_KEY: &str = "t";
/// Header key carrying the hex signature
pub const SIGNATURE_KEY: &str = "v1";

/// Parsed `t=...,v1=...` signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix seconds at which the service signed the payload
    pub timestamp: u64,
    /// Hex-encoded digest as sent by the service
    pub signature: String,
}

impl std::fmt::Display for SignatureHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{TIMESTAMP_KEY}={},{SIGNATURE_KEY}={}", self.timestamp, self.signature)
    }
}

impl std::str::FromStr for SignatureHeader {
    type Err = SignatureVerificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_signature_header(s)
    }
}

/// Parse a raw signature header value.
///
/// Exactly two comma-separated `key=value` segments are accepted, `t` and `v1`, in either
/// order. Whitespace around segments is ignored.
pub fn parse_signature_header(header: &str) -> Result<SignatureHeader, SignatureVerificationError> {
    let malformed = |detail: String| SignatureVerificationError::new(VerificationFailure::MalformedHeader(detail));

    let segments: Vec<&str> = header.split(',').map(str::trim).collect();
    if segments.len() != 2 {
        return Err(malformed(format!("expected 2 segments, found {}", segments.len())));
    }

    let mut timestamp = None;
    let mut signature = None;

    for segment in segments {
        let Some((key, value)) = segment.split_once('=') else {
            return Err(malformed(format!("segment '{segment}' is not key=value")));
        };

        match key {
            TIMESTAMP_KEY if timestamp.is_none() => {
                let parsed = parse_timestamp(value)
                    .ok_or_else(|| malformed(format!("timestamp '{value}' is not a non-negative integer")))?;
                timestamp = Some(parsed);
            }
            SIGNATURE_KEY if signature.is_none() => {
                if value.is_empty() {
                    return Err(malformed("empty signature".to_string()));
                }
                signature = Some(value.to_string());
            }
            TIMESTAMP_KEY | SIGNATURE_KEY => return Err(malformed(format!("duplicate key '{key}'"))),
            other => return Err(malformed(format!("unrecognized key '{other}'"))),
        }
    }

    match (timestamp, signature) {
        (Some(timestamp), Some(signature)) => Ok(SignatureHeader { timestamp, signature }),
        _ => Err(malformed("missing t or v1".to_string())),
    }
}

/// Only plain ASCII digits; `u64::from_str` alone would also accept a leading `+`.
fn parse_timestamp(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Compute the lowercase hex HMAC-SHA256 of `{timestamp}.{payload}` keyed with `secret`.
pub fn compute_signature(timestamp: u64, payload: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Build the full signature header the service would send for `payload` at `timestamp`.
pub fn sign_payload(timestamp: u64, payload: &str, secret: &str) -> String {
    SignatureHeader {
        timestamp,
        signature: compute_signature(timestamp, payload, secret),
    }
    .to_string()
}

/// Constant-time byte comparison to prevent timing attacks.
///
/// Length is not secret (hex SHA-256 is always 64 bytes), so a length mismatch returns early.
/// Equal-length inputs are compared in full.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_header() {
        let header = parse_signature_header("t=1700000000,v1=abcd").unwrap();
        assert_eq!(
            header,
            SignatureHeader {
                timestamp: 1_700_000_000,
                signature: "abcd".to_string()
            }
        );
    }

    #[test]
    fn test_parse_header_either_order() {
        let header = parse_signature_header("v1=abcd,t=42").unwrap();
        assert_eq!(header.timestamp, 42);
        assert_eq!(header.signature, "abcd");
    }

    #[test]
    fn test_parse_header_tolerates_spaces() {
        let header = parse_signature_header("t=42, v1=abcd").unwrap();
        assert_eq!(header.timestamp, 42);
    }

    #[rstest]
    #[case::only_signature("v1=abcd")]
    #[case::only_timestamp("t=1700000000")]
    #[case::empty("")]
    #[case::three_segments("t=1,v1=ab,v0=cd")]
    #[case::unknown_key("t=1,v2=abcd")]
    #[case::duplicate_timestamp("t=1,t=2")]
    #[case::negative_timestamp("t=-1,v1=abcd")]
    #[case::plus_timestamp("t=+1,v1=abcd")]
    #[case::fractional_timestamp("t=1.5,v1=abcd")]
    #[case::overflowing_timestamp("t=99999999999999999999999,v1=abcd")]
    #[case::empty_signature("t=1,v1=")]
    #[case::no_equals("t1,v1=abcd")]
    fn test_parse_header_malformed(#[case] header: &str) {
        let err = parse_signature_header(header).unwrap_err();
        assert!(matches!(err.reason, VerificationFailure::MalformedHeader(_)), "{header}: {err}");
    }

    #[test]
    fn test_compute_signature_deterministic() {
        let payload = r#"{"id":"evt_1","type":"document.completed"}"#;
        let a = compute_signature(1_700_000_000, payload, "whsec_test");
        let b = compute_signature(1_700_000_000, payload, "whsec_test");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_compute_signature_known_vector() {
        // HMAC-SHA256(key = "secret", message = "1700000000.hello")
        assert_eq!(
            compute_signature(1_700_000_000, "hello", "secret"),
            "47b1df0ab12338b2685470b0d2b37033add7c3b2bc8172f313e77413f1bb78c8"
        );
    }

    #[test]
    fn test_compute_signature_sensitive_to_every_input() {
        let base = compute_signature(100, "payload", "secret");
        assert_ne!(base, compute_signature(101, "payload", "secret"));
        assert_ne!(base, compute_signature(100, "payload!", "secret"));
        assert_ne!(base, compute_signature(100, "payload", "secret2"));
    }

    #[test]
    fn test_sign_payload_round_trips_through_parser() {
        let header = sign_payload(1_700_000_000, "{}", "secret");
        let parsed = parse_signature_header(&header).unwrap();

        assert!(header.starts_with("t=1700000000,v1="));
        assert_eq!(parsed.signature, compute_signature(1_700_000_000, "{}", "secret"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"hellp"));
        assert!(!constant_time_eq(b"hello", b"hello_world"));
        assert!(constant_time_eq(b"", b""));
    }
}
