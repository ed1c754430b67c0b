//! Reusable task-submit/task-poll abstraction (§4.1, §9 design notes).
//!
//! A single implementation serves both the SERP-images-secondary and the
//! paid-SERP provider: submit returns a token, then poll with the backoff
//! schedule fixed by §4.1 until a terminal status is reached.

use std::time::Duration;

use crate::error::ProviderError;

/// Backoff schedule shared by every task-poll provider.
pub const INITIAL_POLL_DELAY: Duration = Duration::from_millis(500);
/// Multiplicative backoff factor applied after each poll attempt.
pub const BACKOFF_MULTIPLIER: f64 = 1.5;
/// Upper bound on the delay between poll attempts.
pub const MAX_POLL_DELAY: Duration = Duration::from_secs(5);
/// Maximum number of poll attempts before giving up.
pub const MAX_POLL_ATTEMPTS: u32 = 10;

/// The three-way classification of a task-poll status code (§4.1 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// Still processing; keep polling.
    Pending,
    /// Terminal success, parsed result attached.
    Done(T),
}

/// Drive a task-submit/task-poll cycle to completion.
///
/// `submit` returns an opaque task id. `poll` is invoked repeatedly with
/// that id until it returns `Done`, a `TaskFailed`/other terminal error, or
/// the attempt budget is exhausted (`PollExhausted`).
pub async fn run_task_future<T, S, SFut, P, PFut>(
    submit: S,
    poll: P,
) -> Result<T, ProviderError>
where
    S: FnOnce() -> SFut,
    SFut: std::future::Future<Output = Result<String, ProviderError>>,
    P: Fn(String) -> PFut,
    PFut: std::future::Future<Output = Result<PollOutcome<T>, ProviderError>>,
{
    let task_id = submit().await?;

    let mut delay = INITIAL_POLL_DELAY;
    for attempt in 1..=MAX_POLL_ATTEMPTS {
        match poll(task_id.clone()).await? {
            PollOutcome::Done(value) => return Ok(value),
            PollOutcome::Pending => {
                if attempt == MAX_POLL_ATTEMPTS {
                    break;
                }
                tokio::time::sleep(delay).await;
                delay = scale_delay(delay);
            }
        }
    }

    Err(ProviderError::PollExhausted {
        task_id,
        attempts: MAX_POLL_ATTEMPTS,
    })
}

fn scale_delay(delay: Duration) -> Duration {
    let scaled = delay.mul_f64(BACKOFF_MULTIPLIER);
    scaled.min(MAX_POLL_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_once_done_returned() {
        let polls = AtomicU32::new(0);
        let result: Result<&'static str, ProviderError> = run_task_future(
            || async { Ok("task-1".to_string()) },
            |_id| {
                let n = polls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Ok(PollOutcome::Pending)
                    } else {
                        Ok(PollOutcome::Done("result"))
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), "result");
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let result: Result<(), ProviderError> = run_task_future(
            || async { Ok("task-2".to_string()) },
            |_id| async { Ok(PollOutcome::Pending) },
        )
        .await;
        match result {
            Err(ProviderError::PollExhausted { task_id, attempts }) => {
                assert_eq!(task_id, "task-2");
                assert_eq!(attempts, MAX_POLL_ATTEMPTS);
            }
            other => panic!("expected PollExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_error_propagates_without_polling() {
        let result: Result<(), ProviderError> = run_task_future(
            || async { Err(ProviderError::NotConfigured("x".into())) },
            |_id| async { Ok(PollOutcome::Done(())) },
        )
        .await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn backoff_schedule_matches_spec() {
        let mut delay = INITIAL_POLL_DELAY;
        assert_eq!(delay, Duration::from_millis(500));
        delay = scale_delay(delay);
        assert_eq!(delay, Duration::from_millis(750));
        for _ in 0..10 {
            delay = scale_delay(delay);
        }
        assert_eq!(delay, MAX_POLL_DELAY);
    }
}
