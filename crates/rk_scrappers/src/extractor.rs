use async_trait::async_trait;
use rk_core::{ContentExtractor, ExtractedContent, ExtractionError};
use scraper::Html;
use tracing::debug;

use crate::jsonld;
use crate::strategy::StrategyChain;

/// Fetches article pages and isolates their text with a [`StrategyChain`].
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    client: reqwest::Client,
    chain: StrategyChain,
}

impl ArticleExtractor {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_chain(client, StrategyChain::default())
    }

    pub fn with_chain(client: reqwest::Client, chain: StrategyChain) -> Self {
        Self { client, chain }
    }

    pub fn chain(&self) -> &StrategyChain {
        &self.chain
    }

    async fn fetch_page(&self, url: &str) -> Result<String, ExtractionError> {
        let fetch_error = |reason: String| ExtractionError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        response.text().await.map_err(|e| fetch_error(e.to_string()))
    }
}

#[async_trait]
impl ContentExtractor for ArticleExtractor {
    async fn extract_content(&self, url: &str) -> Result<ExtractedContent, ExtractionError> {
        let html = self.fetch_page(url).await?;
        let extracted = extract_with(&self.chain, &html)?;
        debug!(
            "🔎 {} -> {} chars, {} author(s)",
            url,
            extracted.content.len(),
            extracted.authors.len()
        );
        Ok(extracted)
    }
}

/// Runs the default chain over an already fetched page.
pub fn extract_from_html(html: &str) -> Result<ExtractedContent, ExtractionError> {
    extract_with(&StrategyChain::default(), html)
}

pub fn extract_with(chain: &StrategyChain, html: &str) -> Result<ExtractedContent, ExtractionError> {
    let document = Html::parse_document(html);

    let (strategy, content) = chain
        .extract(&document)
        .ok_or(ExtractionError::NoContentFound)?;
    debug!("Matched content with the {} strategy", strategy.name());

    Ok(ExtractedContent {
        content,
        authors: jsonld::extract_authors(&document),
    })
}
