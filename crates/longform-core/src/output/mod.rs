//! Output-directory writer (§6).
//!
//! Each article gets its own subdirectory named by slug, so concurrent
//! Phase B workers never touch the same path (§5): `write_article` only
//! ever creates/writes under `output_dir/{slug}/`. The batch root gets
//! `batch.json` (the serialized `BatchReport`) and `summary.md`, written
//! once after every worker has finished.

use std::path::{Path, PathBuf};

use crate::domain::{ArticleJob, ArticleOutput, ArticleStatus, BatchReport, ImageSlot};
use crate::error::CoreError;

fn io_err(path: &Path, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

/// The rendered artifacts for one article, ready to be persisted.
pub struct ArticleArtifacts<'a> {
    /// The job this article was produced for.
    pub job: &'a ArticleJob,
    /// The cleaned, rendered article (written as `article.json`).
    pub article: &'a ArticleOutput,
    /// Rendered HTML document, if `html` is in `export_formats`.
    pub html: Option<&'a str>,
    /// Rendered Markdown document, if `markdown` is in `export_formats`.
    pub markdown: Option<&'a str>,
    /// Raw PNG bytes per image slot actually produced for this article.
    pub images: &'a [(ImageSlot, Vec<u8>)],
}

/// Write one article's subdirectory: `article.json`, `index.html`,
/// `article.md`, and `images/{slot}.png` for every slot present.
///
/// Creates `output_dir/{slug}/` (and `images/` under it) if absent.
pub async fn write_article(output_dir: &Path, artifacts: &ArticleArtifacts<'_>) -> Result<PathBuf, CoreError> {
    let article_dir = output_dir.join(&artifacts.job.slug);
    tokio::fs::create_dir_all(&article_dir)
        .await
        .map_err(|e| io_err(&article_dir, e))?;

    let json_path = article_dir.join("article.json");
    let json = crate::render::render_json(artifacts.article).map_err(|e| CoreError::IntegrityViolation(format!(
        "article {} failed to serialize to JSON: {e}",
        artifacts.job.job_id
    )))?;
    tokio::fs::write(&json_path, json).await.map_err(|e| io_err(&json_path, e))?;

    if let Some(html) = artifacts.html {
        let html_path = article_dir.join("index.html");
        tokio::fs::write(&html_path, html).await.map_err(|e| io_err(&html_path, e))?;
    }

    if let Some(markdown) = artifacts.markdown {
        let md_path = article_dir.join("article.md");
        tokio::fs::write(&md_path, markdown).await.map_err(|e| io_err(&md_path, e))?;
    }

    if !artifacts.images.is_empty() {
        let images_dir = article_dir.join("images");
        tokio::fs::create_dir_all(&images_dir).await.map_err(|e| io_err(&images_dir, e))?;
        for (slot, bytes) in artifacts.images {
            let image_path = images_dir.join(format!("{}.png", slot.file_stem()));
            tokio::fs::write(&image_path, bytes).await.map_err(|e| io_err(&image_path, e))?;
        }
    }

    Ok(article_dir)
}

/// Write the batch-level artifacts: `batch.json` and `summary.md`.
///
/// Run once, after every article worker has returned, never concurrently
/// with `write_article`.
pub async fn write_batch_report(output_dir: &Path, report: &BatchReport) -> Result<(), CoreError> {
    tokio::fs::create_dir_all(output_dir).await.map_err(|e| io_err(output_dir, e))?;

    let batch_json_path = output_dir.join("batch.json");
    let json = serde_json::to_string_pretty(report).map_err(|e| {
        CoreError::IntegrityViolation(format!("batch report failed to serialize: {e}"))
    })?;
    tokio::fs::write(&batch_json_path, json).await.map_err(|e| io_err(&batch_json_path, e))?;

    let summary_path = output_dir.join("summary.md");
    tokio::fs::write(&summary_path, render_summary_markdown(report))
        .await
        .map_err(|e| io_err(&summary_path, e))?;

    Ok(())
}

fn render_summary_markdown(report: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str("# Batch summary\n\n");
    out.push_str(&format!(
        "- Total: {}\n- Succeeded: {}\n- Failed: {}\n- Wall time: {}ms\n\n",
        report.articles_total, report.articles_successful, report.articles_failed, report.wall_time_ms
    ));
    out.push_str(&format!("{}\n\n", report.summary));
    out.push_str("| Keyword | Slug | Status |\n|---|---|---|\n");
    for result in &report.results {
        let status = match result.status {
            ArticleStatus::Success => "success",
            ArticleStatus::Fail => "fail",
            ArticleStatus::Cancelled => "cancelled",
            ArticleStatus::Skipped => "skipped",
        };
        out.push_str(&format!("| {} | {} | {} |\n", result.keyword, result.slug, status));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArticleResult, KeywordSpec, StageReport};

    fn sample_job() -> ArticleJob {
        ArticleJob {
            job_id: "job-1".to_string(),
            keyword_spec: KeywordSpec { keyword: "coffee makers".to_string(), word_count: None, instructions: None },
            slug: "coffee-makers".to_string(),
            href: "/coffee-makers/".to_string(),
            word_count_target: 1000,
        }
    }

    #[tokio::test]
    async fn write_article_creates_expected_files() {
        let dir = tempfile::tempdir().unwrap();
        let job = sample_job();
        let article = ArticleOutput { headline: "Coffee Makers".to_string(), ..Default::default() };
        let html = "<html></html>".to_string();
        let markdown = "# Coffee Makers".to_string();
        let images = vec![(ImageSlot::Hero, vec![0x89, 0x50, 0x4E, 0x47])];
        let artifacts = ArticleArtifacts {
            job: &job,
            article: &article,
            html: Some(&html),
            markdown: Some(&markdown),
            images: &images,
        };

        let article_dir = write_article(dir.path(), &artifacts).await.unwrap();
        assert!(article_dir.join("article.json").exists());
        assert!(article_dir.join("index.html").exists());
        assert!(article_dir.join("article.md").exists());
        assert!(article_dir.join("images/hero.png").exists());
    }

    #[tokio::test]
    async fn write_article_skips_absent_formats_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let job = sample_job();
        let article = ArticleOutput::default();
        let artifacts = ArticleArtifacts { job: &job, article: &article, html: None, markdown: None, images: &[] };

        let article_dir = write_article(dir.path(), &artifacts).await.unwrap();
        assert!(article_dir.join("article.json").exists());
        assert!(!article_dir.join("index.html").exists());
        assert!(!article_dir.join("images").exists());
    }

    #[tokio::test]
    async fn write_batch_report_writes_json_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let report = BatchReport {
            articles_total: 1,
            articles_successful: 1,
            articles_failed: 0,
            results: vec![ArticleResult {
                job_id: "job-1".to_string(),
                keyword: "coffee makers".to_string(),
                slug: "coffee-makers".to_string(),
                status: ArticleStatus::Success,
                stages: vec![StageReport::ok("C7")],
            }],
            wall_time_ms: 42,
            summary: "1/1 articles succeeded".to_string(),
        };

        write_batch_report(dir.path(), &report).await.unwrap();
        assert!(dir.path().join("batch.json").exists());
        let summary = tokio::fs::read_to_string(dir.path().join("summary.md")).await.unwrap();
        assert!(summary.contains("coffee-makers"));
        assert!(summary.contains("success"));
    }
}
