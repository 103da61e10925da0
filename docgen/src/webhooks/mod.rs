//! Inbound webhook authentication.
//!
//! - [`signing`]: `t=..,v1=..` header parsing and HMAC-SHA256 signature computation
//! - [`events`]: Event types delivered by the service
//! - [`verifier`]: Signature check, replay window and payload decoding

pub mod events;
pub mod signing;
pub mod verifier;

pub use events::{WebhookEvent, WebhookEventType};
pub use signing::{SignatureHeader, compute_signature, parse_signature_header, sign_payload};
pub use verifier::{DEFAULT_TOLERANCE, WebhookVerifier, verify_webhook_signature};
