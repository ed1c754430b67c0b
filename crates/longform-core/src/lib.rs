//! Core library for the long-form content generation pipeline.
//!
//! Turns a batch of keywords plus a company URL into a set of fully
//! formed articles (structured content, images, metadata) via external
//! LLM and search providers. See `SPEC_FULL.md` at the workspace root
//! for the component map this module layout follows.
pub mod article;
pub mod assets;
pub mod company;
pub mod config;
pub mod domain;
pub mod error;
pub mod images;
pub mod llm;
pub mod orchestrator;
pub mod output;
pub mod postprocess;
pub mod providers;
pub mod quality;
pub mod render;
pub mod safety;
pub mod sitemap;

pub use error::*;

/// Returns the version of the longform-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
