use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use rk_core::logging::Logger;
use rk_core::{
    Article, ConfigError, ContentExtractor, DocumentSender, Error, FeedEntry, FeedSource,
    FeedSourceReader, PipelineConfig, RenderedDocument, Result,
};
use rk_feeds::select_entries;
use rk_render::RenderOptions;

/// Counts per stage, logged at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub feeds_failed: usize,
    pub fetched: usize,
    pub selected: usize,
    pub extracted: usize,
    pub extraction_failed: usize,
    pub sections: usize,
    pub document: Option<PathBuf>,
    pub delivered: bool,
    pub cleaned_up: bool,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "fetched {} ({} feed(s) failed), selected {}, extracted {} ({} failed), rendered {} section(s), delivered: {}",
            self.fetched,
            self.feeds_failed,
            self.selected,
            self.extracted,
            self.extraction_failed,
            self.sections,
            if self.delivered { "yes" } else { "no" },
        )
    }
}

/// Fetch, extract, render and deliver, strictly one stage after the other.
pub struct Pipeline {
    config: PipelineConfig,
    reader: Arc<dyn FeedSourceReader>,
    extractor: Arc<dyn ContentExtractor>,
    sender: Option<Arc<dyn DocumentSender>>,
    logger: Logger,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        reader: Arc<dyn FeedSourceReader>,
        extractor: Arc<dyn ContentExtractor>,
        sender: Option<Arc<dyn DocumentSender>>,
    ) -> Self {
        Self {
            config,
            reader,
            extractor,
            sender,
            logger: Logger::new(),
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// `now` anchors the age cutoff and the document title.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let mut report = RunReport::default();

        let entries: Vec<FeedEntry> = self
            .gather(now, &mut report)
            .await
            .into_iter()
            .flat_map(|(_, entries)| entries)
            .collect();
        let articles = self.extract(entries, &mut report).await;

        report.sections = articles.iter().filter(|a| a.has_content()).count();
        if report.sections == 0 {
            self.logger.clone()
                .with_new_prefixes("[render]")
                .error(&format!("Nothing to render: {}", report.summary()));
            return Err(Error::NothingToRender);
        }

        let document = self.render(&articles, now)?;
        report.document = Some(document.path.clone());

        self.deliver(&document, &mut report).await?;

        self.logger.info(&format!("🏁 Done: {}", report.summary()));
        Ok(report)
    }

    /// Selected entries of every feed, in feed order. A failing feed is logged
    /// and left out.
    pub async fn gather(
        &self,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Vec<(&FeedSource, Vec<FeedEntry>)> {
        let logger = self.logger.clone().with_new_prefixes("[fetch]");
        logger.info(&format!("🌐 Fetching {} feed(s)", self.config.feeds.len()));

        let mut selected = Vec::new();
        for feed in &self.config.feeds {
            let feed_logger = logger.clone().with_prefix(format!("[{}]", feed.name));
            let entries = match self.reader.fetch_entries(feed, usize::MAX).await {
                Ok(entries) => entries,
                Err(e) => {
                    report.feeds_failed += 1;
                    feed_logger.warn(&format!("⚠️ Skipping feed: {}", e));
                    continue;
                }
            };

            let listed = entries.len();
            let kept = select_entries(entries, &self.config.selection, now);
            feed_logger.info(&format!("📰 {} listed, {} selected", listed, kept.len()));

            report.fetched += listed;
            report.selected += kept.len();
            selected.push((feed, kept));
        }

        selected
    }

    /// Articles whose extraction failed are dropped.
    async fn extract(&self, entries: Vec<FeedEntry>, report: &mut RunReport) -> Vec<Article> {
        let logger = self.logger.clone().with_new_prefixes("[extract]");
        logger.info(&format!("🔎 Extracting {} article(s)", entries.len()));

        let mut articles = Vec::with_capacity(entries.len());
        for entry in entries {
            let article = Article::from_entry(entry);
            match self.extractor.extract_content(&article.url).await {
                Ok(extracted) => {
                    report.extracted += 1;
                    logger.debug(&format!("✨ {}", article.title));
                    articles.push(article.with_content(extracted));
                }
                Err(e) => {
                    report.extraction_failed += 1;
                    logger.warn(&format!("⚠️ Dropping {} ({}): {}", article.title, article.url, e));
                }
            }
        }

        logger.info(&format!(
            "📑 {} extracted, {} failed",
            report.extracted, report.extraction_failed
        ));
        articles
    }

    fn render(&self, articles: &[Article], now: DateTime<Utc>) -> Result<RenderedDocument> {
        let logger = self.logger.clone().with_new_prefixes("[render]");
        let output = &self.config.output;
        logger.info(&format!("📚 Rendering {} to {}", output.format, output.path.display()));

        let options = RenderOptions::for_date(now.with_timezone(&Local).date_naive());
        Ok(rk_render::render(articles, output.format, &output.path, &options)?)
    }

    async fn deliver(&self, document: &RenderedDocument, report: &mut RunReport) -> Result<()> {
        let logger = self.logger.clone().with_new_prefixes("[deliver]");
        let delivery = &self.config.delivery;

        if !delivery.enabled {
            logger.warn(&format!("Sending disabled, document kept at {}", document.path.display()));
            return Ok(());
        }
        let sender = match (&self.sender, delivery.should_send()) {
            (Some(sender), true) => sender,
            _ => {
                logger.warn(&format!(
                    "No SMTP credentials configured, skipping delivery. Document kept at {}",
                    document.path.display()
                ));
                return Ok(());
            }
        };
        let recipient = delivery
            .recipient
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("a recipient address is required to send the document".to_string()))?;

        logger.info(&format!("📬 Sending {} to {}", document.file_name(), recipient));
        if let Err(e) = sender
            .send_document(document, recipient, &delivery.subject, &delivery.body)
            .await
        {
            logger.error(&format!(
                "Delivery failed, document kept at {} for a manual resend",
                document.path.display()
            ));
            return Err(e.into());
        }
        report.delivered = true;

        if delivery.cleanup {
            match tokio::fs::remove_file(&document.path).await {
                Ok(()) => {
                    report.cleaned_up = true;
                    logger.debug(&format!("🧹 Removed {}", document.path.display()));
                }
                Err(e) => logger.warn(&format!("Could not remove {}: {}", document.path.display(), e)),
            }
        }

        Ok(())
    }
}
