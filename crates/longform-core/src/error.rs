//! Error types for the pipeline core.
//!
//! `CoreError` is the shared §7 taxonomy every component ultimately
//! surfaces. Provider adapters raise their own narrow `ProviderError`
//! first and the fallback router (C2) converts it at the boundary, the
//! same "narrow error at the edge, shared vocabulary going inward"
//! pattern used elsewhere in this crate's provider layer.

use thiserror::Error;

/// The batch-input validation error kind, accumulated by
/// `BatchInput::validate`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A required field is absent.
    #[error("missing required field: {field}")]
    MissingField {
        /// The field name.
        field: String,
    },
    /// A field has an unacceptable value.
    #[error("invalid value for field '{field}': {message}")]
    InvalidValue {
        /// The field name.
        field: String,
        /// Why the value is invalid.
        message: String,
    },
}

/// The shared error taxonomy (§7). Every cross-component failure is one
/// of these eight kinds.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed batch input; fatal before any work starts.
    #[error("invalid batch input: {0:?}")]
    InputInvalid(Vec<InputError>),

    /// Transport/5xx failure after retries were exhausted.
    #[error("provider unavailable: {provider}: {message}")]
    ProviderUnavailable {
        /// The provider that failed.
        provider: String,
        /// Details of the failure.
        message: String,
    },

    /// Provider signalled a rate/quota limit.
    #[error("quota exhausted on provider {provider}{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    QuotaExhausted {
        /// The provider that reported the quota error.
        provider: String,
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Provider output could not be coerced into the requested shape
    /// after one repair attempt.
    #[error("invalid output from {provider}: {message}")]
    InvalidOutput {
        /// The provider that produced the output.
        provider: String,
        /// Why it couldn't be used.
        message: String,
    },

    /// A call or phase exceeded its time budget.
    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long it ran before being abandoned.
        elapsed_ms: u64,
    },

    /// Orchestrator cancellation observed.
    #[error("operation cancelled: {context}")]
    Cancelled {
        /// Where cancellation was observed.
        context: String,
    },

    /// The post-processor could not satisfy an output invariant.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// Local filesystem error writing batch/article artifacts.
    #[error("I/O error writing {path}: {source}")]
    Io {
        /// The path being written.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Whether this error, raised by a provider call, should trigger C2's
    /// fail-over-to-next-provider policy. Only `QuotaExhausted` and
    /// `ProviderUnavailable` qualify; everything else propagates.
    pub fn triggers_failover(&self) -> bool {
        matches!(
            self,
            CoreError::QuotaExhausted { .. } | CoreError::ProviderUnavailable { .. }
        )
    }

    /// The error-taxonomy tag, used in `StageReport` details and
    /// `batch.json` so callers can match on a stable string.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            CoreError::InputInvalid(_) => "InputInvalid",
            CoreError::ProviderUnavailable { .. } => "ProviderUnavailable",
            CoreError::QuotaExhausted { .. } => "QuotaExhausted",
            CoreError::InvalidOutput { .. } => "InvalidOutput",
            CoreError::Timeout { .. } => "Timeout",
            CoreError::Cancelled { .. } => "Cancelled",
            CoreError::IntegrityViolation(_) => "IntegrityViolation",
            CoreError::Io { .. } => "IO",
        }
    }
}

/// Errors raised inside a single provider adapter, before C2 sees them.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider returned a non-success status the adapter doesn't treat
    /// as rate-limiting.
    #[error("provider API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or parsed error message.
        message: String,
    },

    /// Provider signalled rate/quota limiting.
    #[error("provider rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Response body could not be parsed into the expected shape.
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// Provider returned a malformed PNG (image adapters only).
    #[error("provider returned invalid image data: {0}")]
    InvalidImage(String),

    /// Credentials for this provider are not configured.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Task-poll protocol gave up after exhausting its attempt budget.
    #[error("task poll exhausted after {attempts} attempts (task {task_id})")]
    PollExhausted {
        /// The task identifier being polled.
        task_id: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Task-poll protocol received a terminal "failed" status.
    #[error("task {task_id} failed: {message}")]
    TaskFailed {
        /// The task identifier.
        task_id: String,
        /// The failure message reported by the provider.
        message: String,
    },
}

impl ProviderError {
    /// Map into the shared taxonomy for a named provider, ready for C2.
    pub fn into_core(self, provider: &str) -> CoreError {
        match self {
            ProviderError::RateLimited { retry_after_secs } => CoreError::QuotaExhausted {
                provider: provider.to_string(),
                retry_after_secs: Some(retry_after_secs),
            },
            ProviderError::Transport(e) => CoreError::ProviderUnavailable {
                provider: provider.to_string(),
                message: e.to_string(),
            },
            ProviderError::Api { status, message } if status == 429 || status >= 500 => {
                CoreError::ProviderUnavailable {
                    provider: provider.to_string(),
                    message: format!("status {status}: {message}"),
                }
            }
            ProviderError::Api { status, message } => CoreError::InvalidOutput {
                provider: provider.to_string(),
                message: format!("status {status}: {message}"),
            },
            ProviderError::Parse(message) => CoreError::InvalidOutput {
                provider: provider.to_string(),
                message,
            },
            ProviderError::InvalidImage(message) => CoreError::InvalidOutput {
                provider: provider.to_string(),
                message,
            },
            ProviderError::NotConfigured(message) => CoreError::ProviderUnavailable {
                provider: provider.to_string(),
                message,
            },
            ProviderError::PollExhausted { task_id, attempts } => CoreError::ProviderUnavailable {
                provider: provider.to_string(),
                message: format!("task {task_id} exhausted after {attempts} polls"),
            },
            ProviderError::TaskFailed { task_id, message } => CoreError::InvalidOutput {
                provider: provider.to_string(),
                message: format!("task {task_id}: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exhausted_message_with_retry() {
        let err = CoreError::QuotaExhausted {
            provider: "anthropic".into(),
            retry_after_secs: Some(30),
        };
        assert_eq!(
            err.to_string(),
            "quota exhausted on provider anthropic, retry after 30s"
        );
    }

    #[test]
    fn quota_exhausted_message_without_retry() {
        let err = CoreError::QuotaExhausted {
            provider: "anthropic".into(),
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "quota exhausted on provider anthropic");
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(
            CoreError::IntegrityViolation("x".into()).kind_tag(),
            "IntegrityViolation"
        );
        assert_eq!(
            CoreError::Cancelled {
                context: "x".into()
            }
            .kind_tag(),
            "Cancelled"
        );
    }

    #[test]
    fn failover_triggers_only_on_quota_and_unavailable() {
        assert!(CoreError::QuotaExhausted {
            provider: "a".into(),
            retry_after_secs: None
        }
        .triggers_failover());
        assert!(CoreError::ProviderUnavailable {
            provider: "a".into(),
            message: "x".into()
        }
        .triggers_failover());
        assert!(!CoreError::InvalidOutput {
            provider: "a".into(),
            message: "x".into()
        }
        .triggers_failover());
    }

    #[test]
    fn provider_error_rate_limited_maps_to_quota_exhausted() {
        let err = ProviderError::RateLimited {
            retry_after_secs: 10,
        }
        .into_core("serp-primary");
        assert!(matches!(err, CoreError::QuotaExhausted { .. }));
    }

    #[test]
    fn provider_error_5xx_maps_to_unavailable() {
        let err = ProviderError::Api {
            status: 503,
            message: "down".into(),
        }
        .into_core("serp-primary");
        assert!(matches!(err, CoreError::ProviderUnavailable { .. }));
    }

    #[test]
    fn provider_error_4xx_maps_to_invalid_output() {
        let err = ProviderError::Api {
            status: 400,
            message: "bad request".into(),
        }
        .into_core("serp-primary");
        assert!(matches!(err, CoreError::InvalidOutput { .. }));
    }
}
