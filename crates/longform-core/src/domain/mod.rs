//! The batch/article data model shared across every pipeline component.

pub mod article;
pub mod batch;
pub mod company;
pub mod report;
pub mod sitemap;
pub mod slug;

pub use article::{
    ArticleImage, ArticleJob, ArticleOutput, AssetKind, ComparisonTable, FoundAsset, ImageSlot,
    QnA, Section, Source, TocEntry,
};
pub use batch::{BatchInput, KeywordEntry, KeywordSpec};
pub use company::{AuthorInfo, CompanyContext, VisualIdentity};
pub use report::{ArticleResult, ArticleStatus, BatchReport, StageReport, StageStatus};
pub use sitemap::{SitemapData, SitemapEntry, UrlLabel};

/// The read-only context shared by every article worker in Phase B.
///
/// Immutable from the start of the article phase onward (spec invariant):
/// workers read it concurrently without locking.
#[derive(Debug, Clone)]
pub struct BatchContext {
    /// The validated batch input.
    pub input: BatchInput,
    /// The resolved company profile (C4).
    pub company: CompanyContext,
    /// The crawled (or degraded-empty) sitemap (C3).
    pub sitemap: SitemapData,
}
