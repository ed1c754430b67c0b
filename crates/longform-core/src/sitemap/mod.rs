//! Sitemap crawler (C3, §4.3).
//!
//! Fetches `robots.txt` and the conventional sitemap locations, flattens
//! any sitemap-index recursion (bounded depth), deduplicates and truncates
//! the URL set, then classifies each URL against the §3 label taxonomy.
//!
//! Failures here are never fatal (§4.3): a fetch error degrades to an
//! empty `SitemapData` plus a `warn` stage report, which the orchestrator
//! (C11) is responsible for recording.

mod classify;
mod parse;

use std::time::{Duration, Instant};

use crate::domain::sitemap::{SitemapData, UrlLabel};

pub use classify::classify_url;

/// Crawl limits (§4.3, §6).
#[derive(Debug, Clone)]
pub struct CrawlLimits {
    /// Maximum URLs retained after deduplication.
    pub max_urls: usize,
    /// Maximum sitemap-index recursion depth.
    pub max_depth: u32,
    /// Total wall-clock budget for the whole crawl.
    pub crawl_budget: Duration,
    /// Whether the optional AI title-sampling classifier pass may run.
    pub ai_classification_enabled: bool,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_urls: 2000,
            max_depth: 3,
            crawl_budget: Duration::from_secs(60),
            ai_classification_enabled: false,
        }
    }
}

impl From<&crate::config::PipelineSettings> for CrawlLimits {
    fn from(settings: &crate::config::PipelineSettings) -> Self {
        Self {
            max_urls: settings.sitemap_max_urls,
            max_depth: settings.sitemap_max_depth,
            crawl_budget: settings.sitemap_crawl_budget,
            ai_classification_enabled: settings.sitemap_ai_classification_enabled,
        }
    }
}

/// Crawl a company's sitemap(s) starting from `base_url`, returning a
/// classified, deduplicated, bounded `SitemapData`.
///
/// Never returns an error: every fetch failure degrades in place, so the
/// worst case is an empty result. The caller (C11 Phase A) is responsible
/// for turning "ended up empty because something failed" into a `warn`
/// stage report using the returned `CrawlReport`.
pub async fn crawl(client: &reqwest::Client, base_url: &str, limits: &CrawlLimits) -> (SitemapData, CrawlReport) {
    let started = Instant::now();
    let mut report = CrawlReport::default();

    let Ok(parsed_base) = url::Url::parse(base_url) else {
        report.warnings.push(format!("invalid base URL: {base_url}"));
        return (SitemapData::empty(), report);
    };

    let mut candidates = discover_sitemap_locations(client, &parsed_base, &mut report).await;
    if candidates.is_empty() {
        candidates = vec![
            default_sitemap_url(&parsed_base, "/sitemap.xml"),
            default_sitemap_url(&parsed_base, "/sitemap_index.xml"),
        ];
    }

    let mut raw_urls = Vec::new();
    let mut visited = std::collections::HashSet::new();
    for candidate in candidates {
        if started.elapsed() >= limits.crawl_budget {
            report.warnings.push("sitemap crawl budget exceeded".to_string());
            break;
        }
        fetch_sitemap_recursive(client, &candidate, 0, limits, started, &mut visited, &mut raw_urls, &mut report)
            .await;
    }

    let deduped = dedupe_urls(raw_urls);
    let truncated: Vec<String> = deduped.into_iter().take(limits.max_urls).collect();
    report.urls_found = truncated.len();

    let mut data = SitemapData::empty();
    for u in truncated {
        let label = classify_url(&u, limits.ai_classification_enabled);
        data.insert(u, label);
    }

    (data, report)
}

/// Non-fatal diagnostics collected during a crawl, folded into the C3
/// stage report by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Human-readable warnings (fetch failures, parse failures, budget
    /// exhaustion). Never includes the URL of a credential-bearing request.
    pub warnings: Vec<String>,
    /// Number of URLs retained after dedup/truncation.
    pub urls_found: usize,
}

impl CrawlReport {
    /// Whether the crawl degraded (any warning recorded).
    pub fn degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

fn default_sitemap_url(base: &url::Url, path: &str) -> String {
    let mut u = base.clone();
    u.set_path(path);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

/// Discover sitemap locations from `robots.txt`'s `Sitemap:` directives
/// (§4.3 step 1).
async fn discover_sitemap_locations(client: &reqwest::Client, base: &url::Url, report: &mut CrawlReport) -> Vec<String> {
    let robots_url = default_sitemap_url(base, "/robots.txt");
    match client.get(&robots_url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.text().await {
            Ok(body) => parse::robots_txt_sitemaps(&body),
            Err(e) => {
                report.warnings.push(format!("failed to read robots.txt body: {e}"));
                Vec::new()
            }
        },
        Ok(resp) => {
            report
                .warnings
                .push(format!("robots.txt fetch returned status {}", resp.status()));
            Vec::new()
        }
        Err(e) => {
            report.warnings.push(format!("failed to fetch robots.txt: {e}"));
            Vec::new()
        }
    }
}

/// Fetch a sitemap URL, recursing into index entries up to `max_depth`
/// (§4.3 step 2). Accumulates leaf URLs into `out`.
fn fetch_sitemap_recursive<'a>(
    client: &'a reqwest::Client,
    sitemap_url: &'a str,
    depth: u32,
    limits: &'a CrawlLimits,
    started: Instant,
    visited: &'a mut std::collections::HashSet<String>,
    out: &'a mut Vec<String>,
    report: &'a mut CrawlReport,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'a>> {
    Box::pin(async move {
        if depth > limits.max_depth {
            report
                .warnings
                .push(format!("sitemap index recursion exceeded depth {}", limits.max_depth));
            return;
        }
        if !visited.insert(sitemap_url.to_string()) {
            return;
        }
        if started.elapsed() >= limits.crawl_budget {
            return;
        }
        if out.len() >= limits.max_urls {
            return;
        }

        let body = match client.get(sitemap_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(b) => b,
                Err(e) => {
                    report.warnings.push(format!("failed to read sitemap body ({sitemap_url}): {e}"));
                    return;
                }
            },
            Ok(resp) => {
                report
                    .warnings
                    .push(format!("sitemap fetch returned status {} ({sitemap_url})", resp.status()));
                return;
            }
            Err(e) => {
                report.warnings.push(format!("failed to fetch sitemap ({sitemap_url}): {e}"));
                return;
            }
        };

        match parse::parse_sitemap(&body) {
            parse::ParsedSitemap::UrlSet(urls) => out.extend(urls),
            parse::ParsedSitemap::Index(children) => {
                for child in children {
                    fetch_sitemap_recursive(client, &child, depth + 1, limits, started, visited, out, report).await;
                }
            }
            parse::ParsedSitemap::Unrecognized => {
                report.warnings.push(format!("could not parse sitemap XML ({sitemap_url})"));
            }
        }
    })
}

/// Deduplicate URLs by canonical form (§4.3 step 3): lowercase
/// scheme+host, strip fragments, strip trailing slash except root.
fn dedupe_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for raw in urls {
        let Ok(mut parsed) = url::Url::parse(&raw) else {
            continue;
        };
        parsed.set_fragment(None);
        let canonical = canonicalize(&parsed);
        if seen.insert(canonical) {
            out.push(raw);
        }
    }
    out
}

fn canonicalize(u: &url::Url) -> String {
    let scheme = u.scheme().to_lowercase();
    let host = u.host_str().unwrap_or("").to_lowercase();
    let mut path = u.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    format!("{scheme}://{host}{path}?{}", u.query().unwrap_or(""))
}
