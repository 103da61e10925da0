//! Webhook authentication: signature check plus replay window.
//!
//! ```text
//! verify(payload, header)
//!   ├─ parse_signature_header(header)           // t=..,v1=..
//!   ├─ compute_signature(t, payload, secret)    // HMAC-SHA256, hex
//!   ├─ constant_time_eq(expected, provided)
//!   ├─ |now - t| <= tolerance
//!   └─ WebhookEvent::from_verified_payload(payload)
//! ```
//!
//! Every failure comes back as the same [`SignatureVerificationError`]; only its message says
//! which step rejected the payload.

use std::time::Duration;

use metrics::counter;

use crate::errors::{SignatureVerificationError, VerificationFailure};
use crate::time::{Clock, SystemClock};
use crate::webhooks::events::WebhookEvent;
use crate::webhooks::signing::{compute_signature, constant_time_eq, parse_signature_header};

/// Default replay window
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Verifies webhooks against a single shared secret.
///
/// Holds no mutable state and performs no I/O, so one instance can be shared across request
/// handlers.
#[derive(Clone)]
pub struct WebhookVerifier<C = SystemClock> {
    secret: String,
    tolerance: Duration,
    clock: C,
}

impl<C: std::fmt::Debug> std::fmt::Debug for WebhookVerifier<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"<redacted>")
            .field("tolerance", &self.tolerance)
            .field("clock", &self.clock)
            .finish()
    }
}

impl WebhookVerifier<SystemClock> {
    /// Create a verifier with the default 300s tolerance and the system clock.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> WebhookVerifier<C> {
    /// Replace the clock used for the replay-window check.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> WebhookVerifier<C2> {
        WebhookVerifier {
            secret: self.secret,
            tolerance: self.tolerance,
            clock,
        }
    }

    /// Set the maximum accepted distance between the signed timestamp and now.
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Authenticate `payload` against `signature_header` and decode it.
    pub fn verify(&self, payload: &str, signature_header: &str) -> Result<WebhookEvent, SignatureVerificationError> {
        match self.check(payload, signature_header) {
            Ok(event) => {
                counter!("docgen_webhook_verifications_total", "outcome" => "verified").increment(1);
                tracing::debug!(event_id = %event.id(), event_type = %event.event_type(), "Webhook verified");
                Ok(event)
            }
            Err(reason) => {
                counter!("docgen_webhook_verifications_total", "outcome" => reason.label()).increment(1);
                tracing::debug!(reason = %reason, "Webhook rejected");
                Err(SignatureVerificationError::new(reason))
            }
        }
    }

    fn check(&self, payload: &str, signature_header: &str) -> Result<WebhookEvent, VerificationFailure> {
        let header = parse_signature_header(signature_header).map_err(|e| e.reason)?;

        let expected = compute_signature(header.timestamp, payload, &self.secret);
        if !constant_time_eq(expected.as_bytes(), header.signature.as_bytes()) {
            return Err(VerificationFailure::SignatureMismatch);
        }

        let now = self.clock.unix_timestamp();
        if Duration::from_secs(now.abs_diff(header.timestamp)) > self.tolerance {
            return Err(VerificationFailure::TimestampOutOfTolerance {
                timestamp: header.timestamp,
                now,
                tolerance: self.tolerance,
            });
        }

        WebhookEvent::from_verified_payload(payload).map_err(|e| VerificationFailure::UnparsablePayload(e.to_string()))
    }
}

/// Verify a webhook with the system clock.
///
/// Convenience over [`WebhookVerifier`] for one-off checks. `tolerance` defaults to
/// [`DEFAULT_TOLERANCE`] when `None`.
pub fn verify_webhook_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
    tolerance: Option<Duration>,
) -> Result<WebhookEvent, SignatureVerificationError> {
    WebhookVerifier::new(secret)
        .with_tolerance(tolerance.unwrap_or(DEFAULT_TOLERANCE))
        .verify(payload, signature_header)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::time::MockClock;
    use crate::webhooks::signing::sign_payload;
    use proptest::prelude::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: u64 = 1_700_000_000;

    fn verifier() -> WebhookVerifier<MockClock> {
        WebhookVerifier::new(SECRET).with_clock(MockClock::at_unix(NOW))
    }

    fn event_body(id: &str) -> String {
        serde_json::json!({
            "id": id,
            "type": "document.completed",
            "timestamp": "2023-11-14T22:13:20Z",
            "data": {"documentId": id}
        })
        .to_string()
    }

    proptest! {
        /// Verification succeeds exactly when the secret matches and the skew is within tolerance
        #[test]
        fn verify_succeeds_iff_signed_and_fresh(
            id in "[a-zA-Z0-9_]{1,32}",
            skew in -600i64..=600,
            wrong_secret in any::<bool>(),
        ) {
            let body = event_body(&id);
            let signed_at = NOW.saturating_add_signed(skew);
            let secret = if wrong_secret { "whsec_other" } else { SECRET };
            let header = sign_payload(signed_at, &body, secret);

            let result = verifier().verify(&body, &header);

            prop_assert_eq!(result.is_ok(), !wrong_secret && skew.unsigned_abs() <= 300);
            if let Ok(event) = result {
                prop_assert_eq!(event.id(), id.as_str());
            }
        }

        /// Changing any single byte of a signed payload is reported as a signature mismatch
        #[test]
        fn single_byte_tamper_always_mismatches(
            body in "[ -~]{1,256}",
            position in any::<prop::sample::Index>(),
        ) {
            let header = sign_payload(NOW, &body, SECRET);

            let mut bytes = body.into_bytes();
            let i = position.index(bytes.len());
            bytes[i] ^= 0x01;
            let tampered = String::from_utf8(bytes).unwrap();

            let err = verifier().verify(&tampered, &header).unwrap_err();
            prop_assert_eq!(err.reason, VerificationFailure::SignatureMismatch);
        }
    }
}
