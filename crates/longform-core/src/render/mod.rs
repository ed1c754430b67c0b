//! HTML/Markdown/JSON renderer (C9, §4.9).
//!
//! Turns a C8-cleaned `ArticleOutput` into the three export formats §6
//! lists. Pure and total: every function here is a plain transform of its
//! input, no provider calls, no I/O (the `output` module owns writing the
//! result to disk). Missing images are omitted entirely rather than
//! rendered as a broken reference; an invalid `video_url` is dropped the
//! same way.

use crate::domain::{
    ArticleImage, ArticleJob, ArticleOutput, CompanyContext, ComparisonTable, QnA, Section, Source, TocEntry,
};

fn youtube_url_re() -> regex::Regex {
    regex::Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)").expect("youtube URL regex must compile")
}

/// Render the full HTML5 document for one article.
pub fn render_html(article: &ArticleOutput, job: &ArticleJob, company: &CompanyContext, language: &str) -> String {
    let published_time = article
        .published_time
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    let mut body = String::new();
    body.push_str("<article>\n");
    body.push_str(&format!("<h1>{}</h1>\n", escape_html(&article.headline)));

    if let Some(hero) = find_image(&article.images, crate::domain::ImageSlot::Hero) {
        body.push_str(&render_figure(hero));
    }

    if !article.toc.is_empty() {
        body.push_str(&render_toc(&article.toc));
    }

    if !article.lead.trim().is_empty() {
        body.push_str(&format!("<p class=\"lead\">{}</p>\n", article.lead));
    }

    if let Some(mid) = find_image(&article.images, crate::domain::ImageSlot::Mid) {
        body.push_str(&render_figure(mid));
    }

    for section in &article.sections {
        render_section(section, 2, &mut body);
    }

    if let Some(table) = &article.comparison_table {
        body.push_str(&render_comparison_table(table));
    }

    if let Some(bottom) = find_image(&article.images, crate::domain::ImageSlot::Bottom) {
        body.push_str(&render_figure(bottom));
    }

    if !article.faq.is_empty() {
        body.push_str(&render_qna_block("faq", "Frequently Asked Questions", &article.faq));
    }
    if !article.paa.is_empty() {
        body.push_str(&render_qna_block("paa", "People Also Ask", &article.paa));
    }

    if !article.citations.is_empty() {
        body.push_str(&render_citations(&article.citations));
    }

    body.push_str("</article>\n");

    let json_ld = render_json_ld(article, job, company, &published_time);

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"{lang}\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <meta name=\"description\" content=\"{desc}\">\n\
         <meta property=\"og:title\" content=\"{title}\">\n\
         <meta property=\"og:description\" content=\"{desc}\">\n\
         <meta property=\"article:published_time\" content=\"{published_time}\">\n\
         <script type=\"application/ld+json\">{json_ld}</script>\n\
         </head>\n\
         <body>\n{body}</body>\n\
         </html>\n",
        lang = escape_attr(language),
        title = escape_attr(&article.headline),
        desc = escape_attr(&article.meta_description),
    )
}

fn render_section(section: &Section, depth: u8, out: &mut String) {
    if section.heading.trim().is_empty() {
        return;
    }
    let tag = heading_tag(depth);
    out.push_str(&format!("<section>\n<{tag}>{}</{tag}>\n", escape_html(&section.heading)));
    if !section.body.trim().is_empty() {
        out.push_str(&section.body);
        out.push('\n');
    }
    if let Some(video) = section.video_url.as_deref() {
        if youtube_url_re().is_match(video) {
            out.push_str(&format!(
                "<p class=\"video-link\"><a href=\"{0}\">{0}</a></p>\n",
                escape_attr(video)
            ));
        }
    }
    for sub in &section.subsections {
        render_section(sub, depth + 1, out);
    }
    out.push_str("</section>\n");
}

fn heading_tag(depth: u8) -> &'static str {
    match depth {
        0 | 1 | 2 => "h2",
        3 => "h3",
        _ => "h4",
    }
}

fn find_image(images: &[ArticleImage], slot: crate::domain::ImageSlot) -> Option<&ArticleImage> {
    images.iter().find(|img| img.slot == slot)
}

fn render_figure(image: &ArticleImage) -> String {
    format!(
        "<figure><img src=\"{}\" alt=\"{}\"></figure>\n",
        escape_attr(&image.url),
        escape_attr(&image.alt)
    )
}

fn render_toc(entries: &[TocEntry]) -> String {
    let items: String = entries
        .iter()
        .map(|e| format!("<li><a href=\"{}\">{}</a></li>", escape_attr(&e.anchor), escape_html(&e.label)))
        .collect();
    format!("<nav class=\"toc\"><ul>{items}</ul></nav>\n")
}

fn render_comparison_table(table: &ComparisonTable) -> String {
    let mut out = String::from("<table class=\"comparison\">\n<thead><tr>");
    for h in &table.headers {
        out.push_str(&format!("<th>{}</th>", escape_html(h)));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

fn render_qna_block(class: &str, heading: &str, entries: &[QnA]) -> String {
    let mut out = format!("<section class=\"{class}\">\n<h2>{}</h2>\n", escape_html(heading));
    for qa in entries {
        out.push_str(&format!(
            "<div class=\"qna\"><p class=\"question\">{}</p><div class=\"answer\">{}</div></div>\n",
            escape_html(&qa.question),
            qa.answer
        ));
    }
    out.push_str("</section>\n");
    out
}

fn render_citations(citations: &[Source]) -> String {
    let mut out = String::from("<section class=\"citations\">\n<h2>Sources</h2>\n<ol>\n");
    for source in citations {
        out.push_str(&format!(
            "<li id=\"source-{n}\"><a href=\"{url}\">{title}</a></li>\n",
            n = source.n,
            url = escape_attr(&source.url),
            title = escape_html(&source.title)
        ));
    }
    out.push_str("</ol>\n</section>\n");
    out
}

fn render_json_ld(article: &ArticleOutput, job: &ArticleJob, company: &CompanyContext, published_time: &str) -> String {
    let authors: Vec<serde_json::Value> = company
        .authors
        .iter()
        .map(|a| serde_json::json!({"@type": "Person", "name": a.name}))
        .collect();
    let value = serde_json::json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": article.headline,
        "author": authors,
        "datePublished": published_time,
        "mainEntityOfPage": job.href,
    });
    serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string())
}

/// Render a Markdown rendition of the article (the §6 `markdown` export
/// format). Body HTML fragments are downgraded to plain text/markdown by
/// a small, deterministic tag-stripping pass — good enough for a readable
/// plain-text export, not a general HTML-to-Markdown converter.
pub fn render_markdown(article: &ArticleOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", article.headline));
    if !article.meta_description.trim().is_empty() {
        out.push_str(&format!("*{}*\n\n", article.meta_description));
    }
    if !article.toc.is_empty() {
        for entry in &article.toc {
            out.push_str(&format!("- [{}]({})\n", entry.label, entry.anchor));
        }
        out.push('\n');
    }
    if !article.lead.trim().is_empty() {
        out.push_str(&html_to_markdown(&article.lead));
        out.push_str("\n\n");
    }
    for section in &article.sections {
        render_section_markdown(section, 2, &mut out);
    }
    if let Some(table) = &article.comparison_table {
        out.push_str(&render_comparison_table_markdown(table));
    }
    if !article.faq.is_empty() {
        out.push_str("## Frequently Asked Questions\n\n");
        for qa in &article.faq {
            out.push_str(&format!("**{}**\n\n{}\n\n", qa.question, html_to_markdown(&qa.answer)));
        }
    }
    if !article.citations.is_empty() {
        out.push_str("## Sources\n\n");
        for source in &article.citations {
            out.push_str(&format!("{}. [{}]({})\n", source.n, source.title, source.url));
        }
        out.push('\n');
    }
    out
}

fn render_section_markdown(section: &Section, depth: u8, out: &mut String) {
    if section.heading.trim().is_empty() {
        return;
    }
    let hashes = "#".repeat(depth.clamp(2, 6) as usize);
    out.push_str(&format!("{hashes} {}\n\n", section.heading));
    if !section.body.trim().is_empty() {
        out.push_str(&html_to_markdown(&section.body));
        out.push_str("\n\n");
    }
    for sub in &section.subsections {
        render_section_markdown(sub, depth + 1, out);
    }
}

fn render_comparison_table_markdown(table: &ComparisonTable) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", table.headers.join(" | ")));
    out.push_str(&format!("|{}|\n", "---|".repeat(table.headers.len())));
    for row in &table.rows {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out.push('\n');
    out
}

fn html_to_markdown(fragment: &str) -> String {
    let li_re = regex::Regex::new(r"(?s)<li>(.*?)</li>").expect("li regex must compile");
    let mut text = fragment.to_string();
    text = li_re.replace_all(&text, "- $1\n").to_string();
    let tag_re = regex::Regex::new(r"<strong>(.*?)</strong>").expect("strong regex must compile");
    text = tag_re.replace_all(&text, "**$1**").to_string();
    let strip_re = regex::Regex::new(r"</?(p|ul|ol|div)[^>]*>").expect("strip regex must compile");
    text = strip_re.replace_all(&text, "").to_string();
    text.trim().to_string()
}

/// Render the article as the §6 `json` export format (the `ArticleOutput`
/// struct, serialized verbatim).
pub fn render_json(article: &ArticleOutput) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(article)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageSlot;

    fn sample_article() -> ArticleOutput {
        ArticleOutput {
            headline: "Best Coffee Makers".to_string(),
            meta_description: "A guide to coffee makers.".to_string(),
            lead: "<p>Intro text.</p>".to_string(),
            sections: vec![Section {
                heading: "Drip Machines".to_string(),
                body: "<p>Body text [1].</p>".to_string(),
                subsections: vec![],
                video_url: Some("https://www.youtube.com/watch?v=abc123".to_string()),
            }],
            faq: vec![QnA { question: "Q?".to_string(), answer: "<p>A.</p>".to_string() }],
            citations: vec![Source { n: 1, title: "Src".to_string(), url: "https://a.test".to_string(), retrieved_at: None }],
            toc: vec![TocEntry { label: "Drip Machines".to_string(), anchor: "#drip-machines".to_string() }],
            images: vec![ArticleImage { slot: ImageSlot::Hero, url: "images/hero.png".to_string(), alt: "hero".to_string() }],
            published_time: Some("2026-01-01T00:00:00+00:00".to_string()),
            ..Default::default()
        }
    }

    fn sample_job() -> ArticleJob {
        ArticleJob {
            job_id: "job-1".to_string(),
            keyword_spec: crate::domain::KeywordSpec { keyword: "coffee makers".to_string(), word_count: None, instructions: None },
            slug: "best-coffee-makers".to_string(),
            href: "/best-coffee-makers/".to_string(),
            word_count_target: 1500,
        }
    }

    #[test]
    fn html_contains_single_h1_and_og_tags() {
        let html = render_html(&sample_article(), &sample_job(), &CompanyContext::default(), "en");
        assert_eq!(html.matches("<h1>").count(), 1);
        assert!(html.contains(r#"property="og:title""#));
        assert!(html.contains(r#"property="og:description""#));
        assert!(html.contains(r#"property="article:published_time" content="2026-01-01T00:00:00+00:00""#));
    }

    #[test]
    fn html_includes_video_link_not_iframe() {
        let html = render_html(&sample_article(), &sample_job(), &CompanyContext::default(), "en");
        assert!(html.contains("video-link"));
        assert!(!html.contains("<iframe"));
    }

    #[test]
    fn html_omits_missing_image_slots() {
        let html = render_html(&sample_article(), &sample_job(), &CompanyContext::default(), "en");
        assert_eq!(html.matches("<figure>").count(), 1);
    }

    #[test]
    fn json_ld_has_required_fields() {
        let html = render_html(&sample_article(), &sample_job(), &CompanyContext::default(), "en");
        assert!(html.contains("\"@type\":\"Article\""));
        assert!(html.contains("\"mainEntityOfPage\":\"/best-coffee-makers/\""));
    }

    #[test]
    fn markdown_includes_headline_and_toc() {
        let md = render_markdown(&sample_article());
        assert!(md.starts_with("# Best Coffee Makers"));
        assert!(md.contains("[Drip Machines](#drip-machines)"));
        assert!(md.contains("## Drip Machines"));
    }

    #[test]
    fn json_round_trips_through_serde() {
        let json = render_json(&sample_article()).unwrap();
        let parsed: ArticleOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.headline, "Best Coffee Makers");
    }

    #[test]
    fn invalid_video_url_is_dropped() {
        let mut article = sample_article();
        article.sections[0].video_url = Some("https://example.com/not-youtube".to_string());
        let html = render_html(&article, &sample_job(), &CompanyContext::default(), "en");
        assert!(!html.contains("video-link"));
    }
}
