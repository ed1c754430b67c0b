//! Redaction helpers for logs and diagnostics.
//!
//! Provider adapters pass request/response bodies through these helpers
//! before they reach `tracing` output or a `StageReport`, so a leaked API
//! key never ends up in a log line or an on-disk batch report.

pub mod redact;

pub use redact::{mask_optional_secret, mask_secret, redact_secrets, Redacted};
