//! Stage and batch reports (observability records, never rewritten).

use serde::{Deserialize, Serialize};

/// Outcome of a single pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage completed as expected.
    Ok,
    /// The stage completed but degraded or flagged something.
    Warn,
    /// The stage failed outright.
    Fail,
    /// The stage never ran (e.g. batch cancelled before it was scheduled).
    Skipped,
}

/// A single stage's structured result, appended to an article's report
/// list as stages run. Reports are append-only and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// Identifies the stage (e.g. `"C7.article_generator"`).
    pub stage_id: String,
    /// Outcome category.
    pub status: StageStatus,
    /// Free-form, bounded detail string (diagnostics, not user content).
    pub details: String,
}

const MAX_DETAILS_LEN: usize = 2000;

impl StageReport {
    /// Build a report, truncating `details` to a bounded length.
    pub fn new(stage_id: impl Into<String>, status: StageStatus, details: impl Into<String>) -> Self {
        let mut details = details.into();
        if details.len() > MAX_DETAILS_LEN {
            details.truncate(MAX_DETAILS_LEN);
        }
        Self {
            stage_id: stage_id.into(),
            status,
            details,
        }
    }

    /// Shorthand for an `ok` report with no details.
    pub fn ok(stage_id: impl Into<String>) -> Self {
        Self::new(stage_id, StageStatus::Ok, "")
    }
}

/// Final per-article status, used in the batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    /// All stages reached `ok` (warnings permitted).
    Success,
    /// A stage failed.
    Fail,
    /// The article worker observed cancellation before completing.
    Cancelled,
    /// The article was never scheduled (cancellation before start).
    Skipped,
}

/// The per-article result recorded in the batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleResult {
    /// The job this result belongs to.
    pub job_id: String,
    /// The input keyword (for readability in `batch.json`).
    pub keyword: String,
    /// Resolved slug / output subdirectory name.
    pub slug: String,
    /// Overall status.
    pub status: ArticleStatus,
    /// Every stage report recorded for this article, in run order.
    pub stages: Vec<StageReport>,
}

impl ArticleResult {
    /// Whether any stage reported `fail`.
    pub fn has_failure(&self) -> bool {
        self.stages.iter().any(|s| s.status == StageStatus::Fail)
    }
}

/// The aggregate batch report (written as `batch.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Total number of articles attempted.
    pub articles_total: usize,
    /// Number that completed successfully.
    pub articles_successful: usize,
    /// Number that failed.
    pub articles_failed: usize,
    /// Per-article results, preserving input order regardless of
    /// completion order (spec invariant #6).
    pub results: Vec<ArticleResult>,
    /// Total batch wall-clock time, in milliseconds.
    pub wall_time_ms: u64,
    /// One-line human summary, also mirrored into `summary.md`.
    pub summary: String,
}

impl BatchReport {
    /// Whether every article was `Skipped` with no stage ever having run —
    /// the shape the orchestrator produces only when the batch's
    /// cancellation token was already cancelled before the first worker
    /// acquired its semaphore permit (spec invariant #8: zero article
    /// attempts).
    fn cancelled_before_any_attempt(&self) -> bool {
        !self.results.is_empty()
            && self
                .results
                .iter()
                .all(|r| r.status == ArticleStatus::Skipped && r.stages.is_empty())
    }

    /// The process exit code implied by this report (§6): `2` if
    /// cancellation was observed before any article worker made an
    /// attempt (spec invariant #8), `0` if every article succeeded, `1` if
    /// any failed/cancelled/skipped but the batch itself completed. `2` is
    /// also used for fatal pre-article failures, but those are never
    /// produced here — the orchestrator returns an error instead.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled_before_any_attempt() {
            2
        } else if self.articles_successful == self.articles_total {
            0
        } else {
            1
        }
    }
}
