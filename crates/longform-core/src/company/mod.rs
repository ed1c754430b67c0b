//! Company-context resolver (C4, §4.4).
//!
//! A single grounded text-LLM call that asks for a JSON object shaped like
//! `CompanyContext`. The resolver is pure: given the same URL and a
//! deterministic provider, it returns an equivalent object — all
//! randomness lives in the provider, not here. It does not validate
//! business facts, only JSON shape.

use crate::domain::CompanyContext;
use crate::error::CoreError;
use crate::llm::GenerationParams;
use crate::providers::{FailoverAttempt, ProviderSet};

const SYSTEM_PROMPT: &str = "You are a company research assistant. Given a company website URL, \
research the company using web search and respond with a single JSON object describing it. \
Respond with JSON only, no commentary, no markdown code fences.";

const RESPONSE_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "name": {"type": "string"},
    "url": {"type": "string"},
    "industry": {"type": "string"},
    "description": {"type": "string"},
    "products": {"type": "array", "items": {"type": "string"}},
    "target_audience": {"type": "string"},
    "tone": {"type": "string"},
    "voice_persona": {"type": "object", "additionalProperties": {"type": "string"}},
    "authors": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {
          "name": {"type": "string"},
          "title": {"type": "string"},
          "bio": {"type": "string"},
          "image_url": {"type": "string"},
          "linkedin_url": {"type": "string"},
          "twitter_url": {"type": "string"}
        }
      }
    },
    "visual_identity": {
      "type": "object",
      "properties": {
        "brand_colors": {"type": "array", "items": {"type": "string"}},
        "secondary_colors": {"type": "array", "items": {"type": "string"}},
        "visual_style": {"type": "string"},
        "design_elements": {"type": "array", "items": {"type": "string"}},
        "typography_style": {"type": "string"},
        "mood": {"type": "string"},
        "image_style_prompt": {"type": "string"},
        "avoid_in_images": {"type": "array", "items": {"type": "string"}}
      }
    },
    "competitors": {"type": "array", "items": {"type": "string"}},
    "pain_points": {"type": "array", "items": {"type": "string"}},
    "value_propositions": {"type": "array", "items": {"type": "string"}},
    "use_cases": {"type": "array", "items": {"type": "string"}},
    "content_themes": {"type": "array", "items": {"type": "string"}},
    "system_instructions": {"type": "string"},
    "client_knowledge_base": {"type": "string"}
  },
  "required": ["name", "url"]
}"#;

/// Resolve a `CompanyContext` for `company_url` via the grounded text LLM,
/// trying providers in C2's fallback order.
pub async fn resolve_company_context(
    company_url: &str,
    providers: &ProviderSet,
) -> Result<(CompanyContext, Vec<FailoverAttempt>), CoreError> {
    let user_message = format!(
        "Company website: {company_url}\n\n\
         Research this company and produce the JSON object described by the schema. \
         Every field is optional except `name` and `url`; omit fields you can't determine \
         rather than guessing."
    );

    let params = GenerationParams {
        enable_web_search: true,
        response_schema: Some(RESPONSE_SCHEMA.to_string()),
        system_prompt: Some(SYSTEM_PROMPT.to_string()),
        max_tokens: 4096,
        temperature: 0.2,
    };

    let (response, attempts) = providers.generate_text(SYSTEM_PROMPT, &user_message, &params).await?;

    let mut context = parse_company_context(&response.text, company_url)?;
    if context.name.trim().is_empty() {
        context.name = CompanyContext::host_name_fallback(company_url);
    }
    if context.url.trim().is_empty() {
        context.url = company_url.to_string();
    }

    tracing::debug!(
        provider_attempts = attempts.len(),
        company_url,
        "resolved company context"
    );

    Ok((context, attempts))
}

/// Extract the JSON object from a (possibly fenced) LLM response and decode
/// it as a `CompanyContext`, tolerating a partial object (§4.4).
fn parse_company_context(text: &str, company_url: &str) -> Result<CompanyContext, CoreError> {
    let json_slice = extract_json_object(text).ok_or_else(|| CoreError::InvalidOutput {
        provider: "company-context-resolver".to_string(),
        message: "response did not contain a JSON object".to_string(),
    })?;

    serde_json::from_str(json_slice).map_err(|e| CoreError::InvalidOutput {
        provider: "company-context-resolver".to_string(),
        message: format!("company context for {company_url} failed to parse: {e}"),
    })
}

/// Find the outermost `{...}` span in `text`, tolerating ```` ```json ```` fences
/// and leading/trailing commentary some providers add despite instructions.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_json() {
        let text = r#"{"name": "Acme", "url": "https://acme.test"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn extracts_json_from_fenced_code_block() {
        let text = "```json\n{\"name\": \"Acme\"}\n```";
        assert_eq!(extract_json_object(text), Some("{\"name\": \"Acme\"}"));
    }

    #[test]
    fn parses_partial_object_with_missing_optional_fields() {
        let ctx = parse_company_context(r#"{"name": "Acme", "url": "https://acme.test"}"#, "https://acme.test")
            .unwrap();
        assert_eq!(ctx.name, "Acme");
        assert!(ctx.products.is_empty());
        assert!(ctx.visual_identity.is_none());
    }

    #[test]
    fn missing_name_and_url_is_still_shape_valid() {
        // Fields are optional at the parse layer; `resolve_company_context`
        // is the one that fills in the host fallback for `name`.
        let ctx = parse_company_context(r#"{"industry": "Coffee"}"#, "https://acme.test").unwrap();
        assert_eq!(ctx.name, "");
        assert_eq!(ctx.industry, "Coffee");
    }

    #[test]
    fn non_json_response_is_invalid_output() {
        let err = parse_company_context("sorry, I can't help with that", "https://acme.test").unwrap_err();
        assert!(matches!(err, CoreError::InvalidOutput { .. }));
    }
}
