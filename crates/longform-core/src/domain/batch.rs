//! Batch input and per-keyword job specification.

use serde::{Deserialize, Serialize};

fn default_word_count() -> u32 {
    2000
}

fn default_max_parallel() -> u32 {
    4
}

fn default_export_formats() -> Vec<String> {
    vec!["html".into(), "markdown".into(), "json".into()]
}

/// One keyword entry in a batch, either a bare string or a detailed object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordEntry {
    /// Bare keyword string; inherits the batch's defaults.
    Bare(String),
    /// Fully specified keyword with optional overrides.
    Detailed(KeywordSpec),
}

impl KeywordEntry {
    /// Normalize into a `KeywordSpec`, applying no batch-level defaults yet.
    pub fn into_spec(self) -> KeywordSpec {
        match self {
            KeywordEntry::Bare(keyword) => KeywordSpec {
                keyword,
                word_count: None,
                instructions: None,
            },
            KeywordEntry::Detailed(spec) => spec,
        }
    }
}

/// A single keyword job request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSpec {
    /// The non-empty target keyword.
    pub keyword: String,
    /// Per-keyword word-count override.
    #[serde(default)]
    pub word_count: Option<u32>,
    /// Free-text per-keyword instructions.
    #[serde(default)]
    pub instructions: Option<String>,
}

/// The batch input payload (§6 JSON schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    /// Ordered list of keyword entries.
    pub keywords: Vec<KeywordEntry>,
    /// Absolute company URL used to resolve company context and sitemap.
    pub company_url: String,
    /// BCP-47-like language tag.
    #[serde(default = "default_language")]
    pub language: String,
    /// ISO-3166 alpha-2 market code.
    #[serde(default = "default_market")]
    pub market: String,
    /// Default word-count target for keywords that don't override it.
    #[serde(default = "default_word_count")]
    pub default_word_count: u32,
    /// Free-text instructions applied to every article in the batch.
    #[serde(default)]
    pub batch_instructions: Option<String>,
    /// Maximum number of articles processed concurrently.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: u32,
    /// Skip the image-generation/asset-finding stages entirely.
    #[serde(default)]
    pub skip_images: bool,
    /// Which renderer outputs to produce.
    #[serde(default = "default_export_formats")]
    pub export_formats: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_market() -> String {
    "US".to_string()
}

impl BatchInput {
    /// Validate the batch, accumulating every violation rather than
    /// stopping at the first one found.
    pub fn validate(&self) -> Vec<crate::error::InputError> {
        use crate::error::InputError;

        let mut errors = Vec::new();

        if self.keywords.is_empty() {
            errors.push(InputError::MissingField {
                field: "keywords".into(),
            });
        }
        for (i, k) in self.keywords.iter().enumerate() {
            let keyword = match k {
                KeywordEntry::Bare(s) => s,
                KeywordEntry::Detailed(spec) => &spec.keyword,
            };
            if keyword.trim().is_empty() {
                errors.push(InputError::InvalidValue {
                    field: format!("keywords[{i}].keyword"),
                    message: "must be non-empty".into(),
                });
            }
        }
        if self.company_url.trim().is_empty() {
            errors.push(InputError::MissingField {
                field: "company_url".into(),
            });
        } else if url::Url::parse(&self.company_url).is_err() {
            errors.push(InputError::InvalidValue {
                field: "company_url".into(),
                message: "must be an absolute URL".into(),
            });
        }
        if self.max_parallel == 0 {
            errors.push(InputError::InvalidValue {
                field: "max_parallel".into(),
                message: "must be a positive integer".into(),
            });
        }
        if self.default_word_count == 0 {
            errors.push(InputError::InvalidValue {
                field: "default_word_count".into(),
                message: "must be greater than zero".into(),
            });
        }

        errors
    }

    /// Resolve the effective word-count target for a keyword spec.
    pub fn word_count_for(&self, spec: &KeywordSpec) -> u32 {
        spec.word_count.unwrap_or(self.default_word_count)
    }
}
