use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::Parser;
use rk_core::http::build_client;
use rk_core::logging::{init_logging, Logger};
use rk_core::{ContentExtractor, DocumentSender, HttpSettings, PipelineConfig};
use rk_delivery::Mailer;
use rk_feeds::FeedReader;
use rk_scrappers::ArticleExtractor;

mod cli;
mod pipeline;

use cli::{Cli, Commands, RunArgs, SourceArgs};
use pipeline::{Pipeline, RunReport};

fn build_pipeline(config: PipelineConfig) -> anyhow::Result<Pipeline> {
    let client = build_client(&config.http)?;
    let reader = Arc::new(FeedReader::new(client.clone()));
    let extractor = Arc::new(ArticleExtractor::new(client));

    let sender = match &config.delivery.smtp.credentials {
        Some(credentials) if config.delivery.enabled => {
            let mailer = Mailer::new(&config.delivery.smtp, credentials.clone())
                .with_timeout(Duration::from_secs(config.http.timeout_secs));
            Some(Arc::new(mailer) as Arc<dyn DocumentSender>)
        }
        _ => None,
    };

    Ok(Pipeline::new(config, reader, extractor, sender))
}

async fn run(args: RunArgs, logger: &Logger) -> anyhow::Result<()> {
    let config = args.into_config(Local::now().date_naive())?;
    config.validate()?;

    let pipeline = build_pipeline(config)?;
    let report: RunReport = pipeline.run().await.context("digest run failed")?;

    if let Some(path) = &report.document {
        logger.info(&format!("📄 Document: {}", path.display()));
    }
    Ok(())
}

async fn list_feeds(args: SourceArgs) -> anyhow::Result<()> {
    let config = args.into_config(Local::now().date_naive())?;
    config.validate()?;

    let pipeline = build_pipeline(config)?;
    let mut report = RunReport::default();
    let gathered = pipeline.gather(Utc::now(), &mut report).await;

    for (feed, entries) in &gathered {
        println!("{} ({})", feed.name, feed.url);
        for entry in entries {
            let date = entry
                .published_at
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "undated".to_string());
            println!("  [{}] {}\n      {}", date, entry.title, entry.link);
        }
    }
    println!(
        "{} of {} entries selected, {} feed(s) failed",
        report.selected, report.fetched, report.feeds_failed
    );
    Ok(())
}

async fn extract(url: String, timeout: u64) -> anyhow::Result<()> {
    let settings = HttpSettings {
        timeout_secs: timeout,
        ..Default::default()
    };
    let extractor = ArticleExtractor::new(build_client(&settings)?);
    let extracted = extractor
        .extract_content(&url)
        .await
        .with_context(|| format!("could not extract {}", url))?;

    if !extracted.authors.is_empty() {
        println!("By: {}\n", extracted.authors.join(", "));
    }
    println!("{}", extracted.content);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = init_logging(cli.verbose);

    match cli.command {
        Commands::Run(args) => run(args, &logger).await,
        Commands::Feeds(args) => list_feeds(args).await,
        Commands::Extract { url, timeout } => extract(url, timeout).await,
    }
}
