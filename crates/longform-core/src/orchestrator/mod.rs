//! Batch orchestrator (C11, §5) — the two-phase scheduler that ties every
//! other component into one run: Phase A resolves shared batch context
//! (sitemap crawl + company resolution, concurrently), Phase B fans out one
//! bounded worker per keyword and fans the results back in, preserving
//! input order regardless of completion order (spec invariant #6).
//!
//! Cancellation follows the teacher's posting-queue shape: a shared
//! `CancellationToken`, checked at stage boundaries rather than mid-call,
//! with a hard grace period before the orchestrator stops waiting on
//! stragglers. Bounded per-article concurrency uses a `Semaphore`, a
//! pattern this crate's own corpus never needed before — borrowed from an
//! unrelated agent-orchestration example rather than invented from scratch.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::article::{self, DefaultArticlePromptBuilder};
use crate::assets;
use crate::company;
use crate::config::PipelineSettings;
use crate::domain::{
    slug, ArticleImage, ArticleJob, ArticleOutput, ArticleResult, ArticleStatus, BatchContext,
    BatchInput, BatchReport, CompanyContext, ImageSlot, StageReport, StageStatus,
};
use crate::error::CoreError;
use crate::images;
use crate::output::{self, ArticleArtifacts};
use crate::postprocess;
use crate::providers::{FailoverAttempt, ProviderSet};
use crate::quality;
use crate::render;
use crate::sitemap::{self, CrawlLimits};

const ORCHESTRATOR_STAGE: &str = "C11.orchestrator";

/// Run one batch end to end, writing every article and the batch report
/// under `output_dir`. Returns `Err` only for a fatal pre-article failure
/// (bad input, unrecoverable company resolution) — per-article failures are
/// captured in the returned `BatchReport` instead (§6 exit code 2 vs 1).
pub async fn run_batch(
    input: BatchInput,
    output_dir: PathBuf,
    settings: PipelineSettings,
    providers: Arc<ProviderSet>,
    cancel: CancellationToken,
) -> Result<BatchReport, CoreError> {
    let violations = input.validate();
    if !violations.is_empty() {
        return Err(CoreError::InputInvalid(violations));
    }

    let started = Instant::now();
    let client = reqwest::Client::new();
    let crawl_limits = CrawlLimits::from(&settings);

    let (sitemap_data, company_result) = tokio::join!(
        sitemap::crawl(&client, &input.company_url, &crawl_limits),
        company::resolve_company_context(&input.company_url, &providers),
    );
    let (sitemap_data, crawl_report) = sitemap_data;
    if crawl_report.degraded() {
        tracing::warn!(warnings = ?crawl_report.warnings, "sitemap crawl degraded to empty result");
    }
    let (company_ctx, _company_attempts) = company_result?;

    let batch = Arc::new(BatchContext {
        input,
        company: company_ctx,
        sitemap: sitemap_data,
    });

    let jobs = build_jobs(&batch.input);
    let per_batch_timeout = settings.per_batch_timeout;
    let settings = Arc::new(settings);
    let semaphore = Arc::new(Semaphore::new(batch.input.max_parallel.max(1) as usize));

    let mut set: JoinSet<ArticleResult> = JoinSet::new();
    for job in jobs.clone() {
        let semaphore = Arc::clone(&semaphore);
        let batch = Arc::clone(&batch);
        let settings = Arc::clone(&settings);
        let providers = Arc::clone(&providers);
        let output_dir = output_dir.clone();
        let cancel = cancel.clone();
        set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return skipped_result(&job);
            };
            if cancel.is_cancelled() {
                return skipped_result(&job);
            }
            run_article_job(job, batch, settings, providers, output_dir, cancel).await
        });
    }

    let mut results_by_job: std::collections::HashMap<String, ArticleResult> = std::collections::HashMap::new();
    let deadline = tokio::time::sleep(per_batch_timeout);
    tokio::pin!(deadline);
    let mut cancelled_at: Option<Instant> = None;

    while !set.is_empty() {
        tokio::select! {
            biased;
            joined = set.join_next() => {
                if let Some(Ok(result)) = joined {
                    results_by_job.insert(result.job_id.clone(), result);
                }
            }
            _ = &mut deadline, if cancelled_at.is_none() => {
                tracing::warn!("per_batch_timeout elapsed; cancelling remaining article workers");
                cancel.cancel();
                cancelled_at = Some(Instant::now());
            }
        }
        if let Some(t) = cancelled_at {
            if t.elapsed() >= settings.cancellation_grace_period && !set.is_empty() {
                tracing::warn!("cancellation grace period elapsed; aborting remaining workers");
                set.abort_all();
            }
        }
    }

    for job in &jobs {
        results_by_job.entry(job.job_id.clone()).or_insert_with(|| ArticleResult {
            job_id: job.job_id.clone(),
            keyword: job.keyword_spec.keyword.clone(),
            slug: job.slug.clone(),
            status: ArticleStatus::Cancelled,
            stages: vec![StageReport::new(
                ORCHESTRATOR_STAGE,
                StageStatus::Fail,
                "article worker aborted without reporting a result",
            )],
        });
    }

    let results: Vec<ArticleResult> = jobs
        .iter()
        .map(|job| results_by_job.remove(&job.job_id).expect("every job produces exactly one result"))
        .collect();

    let articles_total = results.len();
    let articles_successful = results.iter().filter(|r| r.status == ArticleStatus::Success).count();
    let articles_failed = articles_total - articles_successful;
    let summary = format!("{articles_successful}/{articles_total} articles succeeded");

    let report = BatchReport {
        articles_total,
        articles_successful,
        articles_failed,
        results,
        wall_time_ms: started.elapsed().as_millis() as u64,
        summary,
    };

    output::write_batch_report(&output_dir, &report).await?;
    Ok(report)
}

fn skipped_result(job: &ArticleJob) -> ArticleResult {
    ArticleResult {
        job_id: job.job_id.clone(),
        keyword: job.keyword_spec.keyword.clone(),
        slug: job.slug.clone(),
        status: ArticleStatus::Skipped,
        stages: Vec::new(),
    }
}

/// Build every `ArticleJob` up front, strictly sequentially, so each job's
/// slug is deduped only against jobs built earlier in input order.
fn build_jobs(input: &BatchInput) -> Vec<ArticleJob> {
    let mut taken = HashSet::new();
    input
        .keywords
        .iter()
        .cloned()
        .map(|entry| {
            let spec = entry.into_spec();
            let word_count_target = input.word_count_for(&spec);
            let base = slug::generate_slug(&spec.keyword);
            let job_slug = slug::dedupe_slug(&base, &taken);
            taken.insert(job_slug.clone());
            ArticleJob {
                job_id: uuid::Uuid::new_v4().to_string(),
                href: format!("/{job_slug}/"),
                slug: job_slug,
                keyword_spec: spec,
                word_count_target,
            }
        })
        .collect()
}

async fn run_article_job(
    job: ArticleJob,
    batch: Arc<BatchContext>,
    settings: Arc<PipelineSettings>,
    providers: Arc<ProviderSet>,
    output_dir: PathBuf,
    cancel: CancellationToken,
) -> ArticleResult {
    let job_id = job.job_id.clone();
    let keyword = job.keyword_spec.keyword.clone();
    let slug = job.slug.clone();
    let per_article_timeout = settings.per_article_timeout;

    match tokio::time::timeout(
        per_article_timeout,
        run_article_job_inner(job, batch, settings, providers, output_dir, cancel),
    )
    .await
    {
        Ok((status, stages)) => ArticleResult { job_id, keyword, slug, status, stages },
        Err(_) => ArticleResult {
            job_id,
            keyword,
            slug,
            status: ArticleStatus::Fail,
            stages: vec![StageReport::new(
                ORCHESTRATOR_STAGE,
                StageStatus::Fail,
                format!("article exceeded per_article_timeout of {per_article_timeout:?}"),
            )],
        },
    }
}

async fn run_article_job_inner(
    job: ArticleJob,
    batch: Arc<BatchContext>,
    settings: Arc<PipelineSettings>,
    providers: Arc<ProviderSet>,
    output_dir: PathBuf,
    cancel: CancellationToken,
) -> (ArticleStatus, Vec<StageReport>) {
    let mut stages = Vec::new();
    let builder = DefaultArticlePromptBuilder;

    let (mut rendered_article, attempts) = match article::generate_article(&batch, &job, &builder, &providers).await {
        Ok(v) => v,
        Err(e) => {
            stages.push(StageReport::new("C7.article_generator", StageStatus::Fail, format!("{}: {e}", e.kind_tag())));
            return (ArticleStatus::Fail, stages);
        }
    };
    stages.push(stage_report_from_attempts("C7.article_generator", &attempts));

    if cancel.is_cancelled() {
        stages.push(cancelled_stage_report("after C7"));
        return (ArticleStatus::Cancelled, stages);
    }

    let mut image_bytes: Vec<(ImageSlot, Vec<u8>)> = Vec::new();
    if !batch.input.skip_images {
        let (images, bytes) = source_slot_images(&job, &batch, &settings, &providers, &mut stages).await;
        rendered_article.images = images;
        image_bytes = bytes;
    }

    if cancel.is_cancelled() {
        stages.push(cancelled_stage_report("after image sourcing"));
        return (ArticleStatus::Cancelled, stages);
    }

    let (cleaned, c8_report) = postprocess::process_article(rendered_article, &[]);
    stages.push(c8_report);

    let html = render::render_html(&cleaned, &job, &batch.company, &batch.input.language);
    let markdown = render::render_markdown(&cleaned);
    stages.push(StageReport::ok("C9.renderer"));

    let quality_report = quality::check_article(&cleaned, &html, true);
    stages.push(quality_report.to_stage_report());

    if cancel.is_cancelled() {
        stages.push(cancelled_stage_report("after rendering"));
        return (ArticleStatus::Cancelled, stages);
    }

    let export_formats = &batch.input.export_formats;
    let artifacts = ArticleArtifacts {
        job: &job,
        article: &cleaned,
        html: export_formats.iter().any(|f| f == "html").then_some(html.as_str()),
        markdown: export_formats.iter().any(|f| f == "markdown").then_some(markdown.as_str()),
        images: &image_bytes,
    };

    if let Err(e) = output::write_article(&output_dir, &artifacts).await {
        stages.push(StageReport::new("output_writer", StageStatus::Fail, format!("{e}")));
        return (ArticleStatus::Fail, stages);
    }
    stages.push(StageReport::ok("output_writer"));

    let status = if quality_report.critical_count() > 0 { ArticleStatus::Fail } else { ArticleStatus::Success };
    (status, stages)
}

fn cancelled_stage_report(context: &str) -> StageReport {
    StageReport::new(ORCHESTRATOR_STAGE, StageStatus::Fail, format!("cancelled {context}"))
}

/// Fold a failover attempt trail into a stage report: clean if the first
/// attempt succeeded, `warn` (naming every failed provider) if the router
/// had to fail over at least once.
fn stage_report_from_attempts(stage_id: &str, attempts: &[FailoverAttempt]) -> StageReport {
    let failed = attempts.iter().filter(|a| a.error.is_some()).count();
    if failed == 0 {
        return StageReport::ok(stage_id);
    }
    let details = attempts
        .iter()
        .map(|a| format!("{}: {}", a.provider, a.error.as_deref().unwrap_or("ok")))
        .collect::<Vec<_>>()
        .join("; ");
    StageReport::new(stage_id, StageStatus::Warn, details)
}

/// Source the three article-slot images (§4.5/§4.6): prefer assets C5 found
/// (recreated on-brand ones carry local bytes, plain hits hotlink the
/// external URL directly), then fill any slots C5 couldn't cover with a
/// direct C6 image-generation call, run three-way concurrently.
async fn source_slot_images(
    job: &ArticleJob,
    batch: &BatchContext,
    settings: &PipelineSettings,
    providers: &ProviderSet,
    stages: &mut Vec<StageReport>,
) -> (Vec<ArticleImage>, Vec<(ImageSlot, Vec<u8>)>) {
    const SLOTS: [ImageSlot; 3] = [ImageSlot::Hero, ImageSlot::Mid, ImageSlot::Bottom];

    let recreate = batch.company.visual_identity.is_some();
    let found = assets::find_assets(&job.keyword_spec.keyword, None, &batch.company, recreate, settings, providers).await;

    let (candidates, attempts, recreated) = match found {
        Ok(v) => v,
        Err(e) => {
            stages.push(StageReport::new("C5.asset_finder", StageStatus::Warn, format!("asset finder unavailable: {e}")));
            (Vec::new(), Vec::new(), Vec::new())
        }
    };
    if !attempts.is_empty() || !candidates.is_empty() {
        stages.push(stage_report_from_attempts("C5.asset_finder", &attempts));
    }

    let recreated_bytes: std::collections::HashMap<usize, Vec<u8>> =
        recreated.into_iter().map(|r| (r.index, r.bytes)).collect();

    let mut images = Vec::new();
    let mut bytes_by_slot = Vec::new();
    let mut filled = 0usize;
    for (idx, asset) in candidates.iter().enumerate() {
        if filled >= SLOTS.len() {
            break;
        }
        let slot = SLOTS[filled];
        if let Some(bytes) = recreated_bytes.get(&idx) {
            images.push(ArticleImage { slot, url: format!("images/{}.png", slot.file_stem()), alt: asset.title.clone() });
            bytes_by_slot.push((slot, bytes.clone()));
        } else {
            images.push(ArticleImage { slot, url: asset.url.clone(), alt: asset.title.clone() });
        }
        filled += 1;
    }

    if filled < SLOTS.len() {
        let remaining = &SLOTS[filled..];
        let generated = generate_remaining_slots(&job.keyword_spec.keyword, &batch.company, remaining, providers).await;
        let mut any_ok = false;
        for (slot, result) in generated {
            match result {
                Ok(bytes) => {
                    any_ok = true;
                    images.push(ArticleImage { slot, url: format!("images/{}.png", slot.file_stem()), alt: job.keyword_spec.keyword.clone() });
                    bytes_by_slot.push((slot, bytes));
                }
                Err(e) => {
                    stages.push(StageReport::new("C6.image_generator", StageStatus::Warn, format!("slot {slot:?} generation failed: {e}")));
                }
            }
        }
        if any_ok {
            stages.push(StageReport::ok("C6.image_generator"));
        }
    }

    (images, bytes_by_slot)
}

/// Generate whichever slots weren't filled from found assets, concurrently.
async fn generate_remaining_slots(
    keyword: &str,
    company: &CompanyContext,
    slots: &[ImageSlot],
    providers: &ProviderSet,
) -> Vec<(ImageSlot, Result<Vec<u8>, CoreError>)> {
    match slots {
        [] => Vec::new(),
        [a] => {
            let ra = images::generate_slot_image(keyword, company, *a, providers).await;
            vec![(*a, ra.map(|(_, bytes)| bytes))]
        }
        [a, b] => {
            let (ra, rb) = tokio::join!(
                images::generate_slot_image(keyword, company, *a, providers),
                images::generate_slot_image(keyword, company, *b, providers),
            );
            vec![(*a, ra.map(|(_, bytes)| bytes)), (*b, rb.map(|(_, bytes)| bytes))]
        }
        [a, b, c] => {
            let (ra, rb, rc) = tokio::join!(
                images::generate_slot_image(keyword, company, *a, providers),
                images::generate_slot_image(keyword, company, *b, providers),
                images::generate_slot_image(keyword, company, *c, providers),
            );
            vec![
                (*a, ra.map(|(_, bytes)| bytes)),
                (*b, rb.map(|(_, bytes)| bytes)),
                (*c, rc.map(|(_, bytes)| bytes)),
            ]
        }
        _ => unreachable!("only three image slots exist"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KeywordEntry, KeywordSpec};

    fn sample_input(keywords: Vec<&str>) -> BatchInput {
        BatchInput {
            keywords: keywords.into_iter().map(|k| KeywordEntry::Bare(k.to_string())).collect(),
            company_url: "https://example.com".to_string(),
            language: "en".to_string(),
            market: "US".to_string(),
            default_word_count: 1200,
            batch_instructions: None,
            max_parallel: 2,
            skip_images: true,
            export_formats: vec!["html".to_string(), "markdown".to_string(), "json".to_string()],
        }
    }

    #[test]
    fn build_jobs_preserves_input_order() {
        let input = sample_input(vec!["coffee makers", "tea kettles", "espresso machines"]);
        let jobs = build_jobs(&input);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].keyword_spec.keyword, "coffee makers");
        assert_eq!(jobs[1].keyword_spec.keyword, "tea kettles");
        assert_eq!(jobs[2].keyword_spec.keyword, "espresso machines");
    }

    #[test]
    fn build_jobs_dedupes_slugs_in_order() {
        let input = sample_input(vec!["Best Coffee!", "best coffee", "Best Coffee"]);
        let jobs = build_jobs(&input);
        let slugs: Vec<&str> = jobs.iter().map(|j| j.slug.as_str()).collect();
        assert_eq!(slugs[0], "best-coffee");
        assert_eq!(slugs[1], "best-coffee-2");
        assert_eq!(slugs[2], "best-coffee-3");
    }

    #[test]
    fn build_jobs_assigns_distinct_job_ids_and_hrefs() {
        let input = sample_input(vec!["a", "b"]);
        let jobs = build_jobs(&input);
        assert_ne!(jobs[0].job_id, jobs[1].job_id);
        assert_eq!(jobs[0].href, "/a/");
        assert_eq!(jobs[1].href, "/b/");
    }

    #[test]
    fn build_jobs_resolves_per_keyword_word_count_override() {
        let mut input = sample_input(vec!["a"]);
        input.keywords = vec![KeywordEntry::Detailed(KeywordSpec {
            keyword: "a".to_string(),
            word_count: Some(500),
            instructions: None,
        })];
        let jobs = build_jobs(&input);
        assert_eq!(jobs[0].word_count_target, 500);
    }
}
