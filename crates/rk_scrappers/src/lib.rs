pub mod extractor;
pub mod jsonld;
pub mod strategy;

pub use extractor::{extract_from_html, ArticleExtractor};
pub use strategy::{SiteRule, SiteRuleError, Strategy, StrategyChain};

pub mod prelude {
    pub use super::extractor::ArticleExtractor;
    pub use super::strategy::{SiteRule, Strategy, StrategyChain};
    pub use rk_core::{ContentExtractor, ExtractedContent, ExtractionError};
}
