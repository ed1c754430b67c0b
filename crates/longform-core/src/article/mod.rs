//! Article generator (C7, §4.7).
//!
//! Prompt composition follows the original pipeline's
//! `pipeline/prompts/simple_article_prompt.py`: a topic-focus block, a
//! company-context block, optional sections for pain points/value
//! propositions/use cases/content themes/competitors, a guidelines block
//! merging batch- and article-level instructions, and a market-context
//! block. The response-schema/repair-attempt flow is C7's own (§4.7
//! steps 2-3), layered on top of the shared `ProviderSet::generate_text`.

use crate::domain::{ArticleJob, ArticleOutput, BatchContext, UrlLabel};
use crate::error::CoreError;
use crate::llm::GenerationParams;
use crate::providers::FailoverAttempt;

/// Everything a prompt builder may see, visible per §4.7 step 1.
pub struct ArticlePromptInput<'a> {
    /// The target keyword/topic.
    pub keyword: &'a str,
    /// Resolved word-count target for this article.
    pub word_count_target: u32,
    /// The batch's resolved company profile.
    pub company: &'a crate::domain::CompanyContext,
    /// BCP-47-like language tag.
    pub language: &'a str,
    /// ISO-3166 alpha-2 market code.
    pub market: &'a str,
    /// Per-batch free-text instructions.
    pub batch_instructions: Option<&'a str>,
    /// Per-keyword free-text instructions.
    pub keyword_instructions: Option<&'a str>,
    /// Blog-labelled URLs from the crawled sitemap, for potential
    /// internal linking.
    pub blog_urls: &'a [String],
}

/// A pluggable prompt builder; the core treats the prompt text itself as
/// opaque (§1 Non-goals), only the inputs are specified.
pub trait ArticlePromptBuilder: Send + Sync {
    /// Build the complete user-message prompt for one article.
    fn build(&self, input: &ArticlePromptInput<'_>) -> String;
}

/// The default prompt builder, grounded in the original pipeline's
/// company-context-based article prompt.
pub struct DefaultArticlePromptBuilder;

impl ArticlePromptBuilder for DefaultArticlePromptBuilder {
    fn build(&self, input: &ArticlePromptInput<'_>) -> String {
        build_default_prompt(input)
    }
}

fn build_default_prompt(input: &ArticlePromptInput<'_>) -> String {
    let company = input.company;
    let tone = if company.tone.trim().is_empty() { "professional" } else { &company.tone };

    let mut company_section = format!(
        "COMPANY CONTEXT:\nCompany: {}\nWebsite: {}",
        if company.name.is_empty() { "the company" } else { &company.name },
        company.url
    );
    if !company.industry.is_empty() {
        company_section.push_str(&format!("\nIndustry: {}", company.industry));
    }
    if !company.description.is_empty() {
        company_section.push_str(&format!("\nDescription: {}", company.description));
    }
    if !company.products.is_empty() {
        company_section.push_str(&format!("\nProducts/Services: {}", company.products.join(", ")));
    }
    if !company.target_audience.is_empty() {
        company_section.push_str(&format!("\nTarget Audience: {}", company.target_audience));
    }
    company_section.push_str(&format!("\nBrand Tone: {tone}"));

    let mut optional_sections = String::new();
    if !company.pain_points.is_empty() {
        optional_sections.push_str(&format!(
            "\n\nCUSTOMER PAIN POINTS:\n{}",
            company.pain_points.join("\n")
        ));
    }
    if !company.value_propositions.is_empty() {
        optional_sections.push_str(&format!(
            "\n\nVALUE PROPOSITIONS:\n{}",
            company.value_propositions.join("\n")
        ));
    }
    if !company.use_cases.is_empty() {
        optional_sections.push_str(&format!("\n\nUSE CASES:\n{}", company.use_cases.join("\n")));
    }
    if !company.content_themes.is_empty() {
        optional_sections.push_str(&format!(
            "\n\nCONTENT THEMES: {}",
            company.content_themes.join(", ")
        ));
    }
    if !company.competitors.is_empty() {
        optional_sections.push_str(&format!(
            "\n\nCOMPETITORS TO DIFFERENTIATE FROM: {}",
            company.competitors.join(", ")
        ));
    }

    let mut guidelines_section = String::new();
    if let Some(system_instructions) = company.system_instructions.as_deref().filter(|s| !s.trim().is_empty()) {
        guidelines_section.push_str(&format!(
            "\n\nSYSTEM INSTRUCTIONS (Article-level):\n{system_instructions}"
        ));
    }
    if let Some(batch_instructions) = input.batch_instructions.filter(|s| !s.trim().is_empty()) {
        guidelines_section.push_str(&format!(
            "\n\nBATCH INSTRUCTIONS (Applies to all articles in this batch):\n{batch_instructions}"
        ));
    }
    if let Some(kb) = company.client_knowledge_base.as_deref().filter(|s| !s.trim().is_empty()) {
        guidelines_section.push_str(&format!("\n\nCOMPANY KNOWLEDGE BASE:\n{kb}"));
    }
    if let Some(keyword_instructions) = input.keyword_instructions.filter(|s| !s.trim().is_empty()) {
        guidelines_section.push_str(&format!(
            "\n\nCONTENT WRITING INSTRUCTIONS (Article-level):\n{keyword_instructions}"
        ));
    }

    let market_section = market_context_section(input.market);

    let blog_links_section = if input.blog_urls.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nEXISTING BLOG CONTENT (consider linking internally where relevant):\n{}",
            input.blog_urls.iter().take(15).map(|u| format!("- {u}")).collect::<Vec<_>>().join("\n")
        )
    };

    format!(
        "Write a comprehensive, high-quality blog article about \"{keyword}\".\n\n\
         TOPIC FOCUS:\n\
         The article must be entirely focused on \"{keyword}\". Every section, paragraph, and \
         example should relate directly to this topic.\n\
         - Deep dive into what \"{keyword}\" means, how it works, why it matters\n\
         - Provide practical, actionable insights about \"{keyword}\"\n\
         - Include real-world examples and use cases related to \"{keyword}\"\n\
         - Address common questions and concerns about \"{keyword}\"\n\n\
         {company_section}{optional_sections}{guidelines_section}{market_section}{blog_links_section}\n\n\
         ARTICLE REQUIREMENTS:\n\
         - Target language: {language}\n\
         - Write in {tone} tone\n\
         - Target length: approximately {word_count} words\n\
         - Structure with clear headings and subheadings, an introduction, main sections, a \
         conclusion, and an FAQ\n\
         - Include specific examples and actionable insights\n\
         - Vary section lengths: at least 2 long sections, 2-3 medium sections, the rest short\n\
         - Cite sources inline with `[k]` markers in body order; include a matching citation list\n\n\
         Respond with a single JSON object matching the provided schema. Respond with JSON only, \
         no commentary, no markdown code fences.",
        keyword = input.keyword,
        company_section = company_section,
        optional_sections = optional_sections,
        guidelines_section = guidelines_section,
        market_section = market_section,
        blog_links_section = blog_links_section,
        language = input.language,
        tone = tone,
        word_count = input.word_count_target,
    )
}

fn market_context_section(market: &str) -> String {
    let country_name = country_display_name(market);
    format!(
        "\n\nTARGET MARKET:\n\
         - Primary country: {country_name} ({market})\n\
         - Adapt content for {country_name} market context, regulations, and cultural expectations\n\
         - Use market-appropriate examples, authorities, and references"
    )
}

fn country_display_name(market: &str) -> &'static str {
    match market.to_uppercase().as_str() {
        "US" => "United States",
        "DE" => "Germany",
        "FR" => "France",
        "GB" | "UK" => "United Kingdom",
        "IT" => "Italy",
        "ES" => "Spain",
        "NL" => "Netherlands",
        "BE" => "Belgium",
        "AT" => "Austria",
        "CH" => "Switzerland",
        "PL" => "Poland",
        "SE" => "Sweden",
        "NO" => "Norway",
        "DK" => "Denmark",
        "FI" => "Finland",
        "IE" => "Ireland",
        "PT" => "Portugal",
        "GR" => "Greece",
        "CZ" => "Czech Republic",
        "HU" => "Hungary",
        "RO" => "Romania",
        _ => "the target market",
    }
}

/// JSON-schema description of `ArticleOutput`, handed to the text LLM as
/// `GenerationParams::response_schema` (§4.7 step 2).
const ARTICLE_RESPONSE_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "headline": {"type": "string"},
    "meta_description": {"type": "string"},
    "lead": {"type": "string"},
    "sections": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {
          "heading": {"type": "string"},
          "body": {"type": "string"},
          "subsections": {"type": "array"}
        },
        "required": ["heading", "body"]
      }
    },
    "faq": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {"question": {"type": "string"}, "answer": {"type": "string"}}
      }
    },
    "citations": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {"n": {"type": "integer"}, "title": {"type": "string"}, "url": {"type": "string"}}
      }
    }
  },
  "required": ["headline", "meta_description", "lead", "sections"]
}"#;

/// Generate one `ArticleOutput` for `job` (§4.7).
pub async fn generate_article(
    batch: &BatchContext,
    job: &ArticleJob,
    builder: &dyn ArticlePromptBuilder,
    providers: &crate::providers::ProviderSet,
) -> Result<(ArticleOutput, Vec<FailoverAttempt>), CoreError> {
    let blog_urls = batch.sitemap.urls_with_label(UrlLabel::Blog);
    let prompt_input = ArticlePromptInput {
        keyword: &job.keyword_spec.keyword,
        word_count_target: job.word_count_target,
        company: &batch.company,
        language: &batch.input.language,
        market: &batch.input.market,
        batch_instructions: batch.input.batch_instructions.as_deref(),
        keyword_instructions: job.keyword_spec.instructions.as_deref(),
        blog_urls: &blog_urls,
    };
    let prompt = builder.build(&prompt_input);

    let system = "You are an expert content writer producing long-form, well-researched blog \
        articles grounded in web search.";
    let params = GenerationParams {
        enable_web_search: true,
        response_schema: Some(ARTICLE_RESPONSE_SCHEMA.to_string()),
        system_prompt: Some(system.to_string()),
        max_tokens: 8192,
        temperature: 0.7,
    };

    let (response, mut attempts) = providers.generate_text(system, &prompt, &params).await?;

    match parse_article_output(&response.text) {
        Ok(article) => Ok((article, attempts)),
        Err(first_error) => {
            tracing::warn!(job_id = %job.job_id, error = %first_error, "article JSON failed to parse, attempting repair");
            let repair_message = format!(
                "The following response did not match the required JSON schema:\n\n{}\n\n\
                 Re-emit it as valid JSON matching the schema exactly, fixing any structural \
                 problems. Respond with JSON only.",
                response.text
            );
            let (repaired, mut repair_attempts) =
                providers.generate_text(system, &repair_message, &params).await?;
            attempts.append(&mut repair_attempts);
            parse_article_output(&repaired.text).map(|article| (article, attempts)).map_err(|_| {
                CoreError::InvalidOutput {
                    provider: "article-generator".to_string(),
                    message: format!("job {}: article JSON still invalid after repair attempt", job.job_id),
                }
            })
        }
    }
}

fn parse_article_output(text: &str) -> Result<ArticleOutput, String> {
    let start = text.find('{').ok_or("no JSON object found in response")?;
    let end = text.rfind('}').ok_or("no JSON object found in response")?;
    if end < start {
        return Err("malformed JSON object bounds".to_string());
    }
    serde_json::from_str(&text[start..=end]).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchInput, CompanyContext, KeywordEntry, KeywordSpec, SitemapData};

    fn sample_input() -> ArticlePromptInput<'static> {
        ArticlePromptInput {
            keyword: "coffee makers",
            word_count_target: 1500,
            company: Box::leak(Box::new(CompanyContext {
                name: "Acme".into(),
                url: "https://acme.test".into(),
                industry: "coffee".into(),
                tone: "friendly".into(),
                ..Default::default()
            })),
            language: "en",
            market: "US",
            batch_instructions: None,
            keyword_instructions: None,
            blog_urls: &[],
        }
    }

    #[test]
    fn default_builder_includes_keyword_and_company_name() {
        let prompt = DefaultArticlePromptBuilder.build(&sample_input());
        assert!(prompt.contains("coffee makers"));
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains("friendly tone"));
        assert!(prompt.contains("United States"));
    }

    #[test]
    fn parse_article_output_extracts_json_object() {
        let text = "Sure, here you go:\n{\"headline\": \"H\", \"meta_description\": \"M\", \"lead\": \"L\", \"sections\": []}\nEnjoy!";
        let parsed = parse_article_output(text).unwrap();
        assert_eq!(parsed.headline, "H");
    }

    #[test]
    fn parse_article_output_rejects_non_json() {
        assert!(parse_article_output("no json here").is_err());
    }

    #[test]
    fn batch_context_helper_compiles() {
        let batch = BatchContext {
            input: BatchInput {
                keywords: vec![KeywordEntry::Bare("x".into())],
                company_url: "https://acme.test".into(),
                language: "en".into(),
                market: "US".into(),
                default_word_count: 1000,
                batch_instructions: None,
                max_parallel: 1,
                skip_images: true,
                export_formats: vec!["json".into()],
            },
            company: CompanyContext::default(),
            sitemap: SitemapData::empty(),
        };
        let _spec = KeywordSpec { keyword: "x".into(), word_count: None, instructions: None };
        assert_eq!(batch.input.language, "en");
    }
}
