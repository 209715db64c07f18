use async_trait::async_trait;

use crate::error::{ExtractionError, FeedFetchError};
use crate::types::{ExtractedContent, FeedEntry, FeedSource};

#[async_trait]
pub trait FeedSourceReader: Send + Sync {
    /// Returns at most `limit` entries of `feed`, in the order the feed lists them
    async fn fetch_entries(
        &self,
        feed: &FeedSource,
        limit: usize,
    ) -> std::result::Result<Vec<FeedEntry>, FeedFetchError>;
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Fetches the page at `url` and isolates the article text
    async fn extract_content(&self, url: &str) -> std::result::Result<ExtractedContent, ExtractionError>;
}
