use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use rk_core::{FeedEntry, FeedFetchError, FeedSource, FeedSourceReader};
use tracing::debug;
use url::Url;

const UNTITLED: &str = "Untitled";

/// Reads RSS, Atom and JSON feeds over HTTP.
#[derive(Debug, Clone)]
pub struct FeedReader {
    client: reqwest::Client,
}

impl FeedReader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSourceReader for FeedReader {
    async fn fetch_entries(
        &self,
        feed: &FeedSource,
        limit: usize,
    ) -> Result<Vec<FeedEntry>, FeedFetchError> {
        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .map_err(|source| FeedFetchError::Http {
                url: feed.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedFetchError::Status {
                url: feed.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| FeedFetchError::Http {
            url: feed.url.clone(),
            source,
        })?;

        let entries = parse_entries(feed, &body, limit)?;
        debug!("📰 {} listed {} entries (limit {})", feed.name, entries.len(), limit);
        Ok(entries)
    }
}

/// Parses a feed document and keeps the first `limit` entries that carry a link,
/// in the order the feed lists them.
pub fn parse_entries(
    feed: &FeedSource,
    body: &[u8],
    limit: usize,
) -> Result<Vec<FeedEntry>, FeedFetchError> {
    let parsed = parser::parse(body).map_err(|e| FeedFetchError::Parse {
        url: feed.url.clone(),
        message: e.to_string(),
    })?;

    let base = Url::parse(&feed.url).ok();

    Ok(parsed
        .entries
        .into_iter()
        .filter_map(|entry| to_feed_entry(feed, base.as_ref(), entry))
        .take(limit)
        .collect())
}

fn to_feed_entry(feed: &FeedSource, base: Option<&Url>, entry: Entry) -> Option<FeedEntry> {
    let href = entry.links.first()?.href.trim().to_string();
    if href.is_empty() {
        return None;
    }

    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    Some(FeedEntry {
        title,
        link: resolve_link(base, &href),
        published_at: entry.published.or(entry.updated),
        source: feed.name.clone(),
    })
}

// Some feeds list site-relative links.
fn resolve_link(base: Option<&Url>, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Blog</title>
    <link>https://blog.example.com</link>
    <description>Posts</description>
    <item>
      <title> Third post </title>
      <link>https://blog.example.com/2024/03/third.html</link>
      <pubDate>Sat, 09 Mar 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Second post</title>
      <link>https://blog.example.com/2024/03/second.html</link>
      <pubDate>not a date</pubDate>
    </item>
    <item>
      <title>No link</title>
      <pubDate>Thu, 07 Mar 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <link>/2024/03/first.html</link>
      <pubDate>Wed, 06 Mar 2024 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:example:feed</id>
  <updated>2024-03-09T12:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:example:1</id>
    <link href="https://atom.example.com/entry-1"/>
    <updated>2024-03-09T12:00:00Z</updated>
  </entry>
</feed>"#;

    fn source(url: &str) -> FeedSource {
        FeedSource::new("Example", url)
    }

    #[test]
    fn test_parse_keeps_feed_order_and_skips_linkless() {
        let entries = parse_entries(&source("https://blog.example.com/feeds/posts"), RSS.as_bytes(), 10).unwrap();

        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Third post", "Second post", "Untitled"]);
        assert!(entries.iter().all(|e| e.source == "Example"));
    }

    #[test]
    fn test_parse_dates() {
        let entries = parse_entries(&source("https://blog.example.com/feed"), RSS.as_bytes(), 10).unwrap();
        assert_eq!(
            entries[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap())
        );
        assert_eq!(entries[1].published_at, None);
    }

    #[test]
    fn test_parse_resolves_relative_links() {
        let entries = parse_entries(&source("https://blog.example.com/feed"), RSS.as_bytes(), 10).unwrap();
        assert_eq!(entries[2].link, "https://blog.example.com/2024/03/first.html");
    }

    #[test]
    fn test_parse_respects_limit() {
        let entries = parse_entries(&source("https://blog.example.com/feed"), RSS.as_bytes(), 2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].title, "Second post");
    }

    #[test]
    fn test_parse_never_pads() {
        let entries = parse_entries(&source("https://blog.example.com/feed"), RSS.as_bytes(), 50).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_parse_atom() {
        let entries = parse_entries(&source("https://atom.example.com/feed"), ATOM.as_bytes(), 5).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://atom.example.com/entry-1");
        assert_eq!(
            entries[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_malformed_feed() {
        let result = parse_entries(&source("https://example.com/feed"), b"<html>nope</html>", 5);
        assert!(matches!(result, Err(FeedFetchError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_fetch_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .expect(1)
            .mount(&server)
            .await;

        let reader = FeedReader::new(reqwest::Client::new());
        let feed = source(&format!("{}/feed", server.uri()));
        let entries = reader.fetch_entries(&feed, 1).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Third post");
    }

    #[tokio::test]
    async fn test_fetch_entries_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let reader = FeedReader::new(reqwest::Client::new());
        let feed = source(&format!("{}/feed", server.uri()));
        let result = reader.fetch_entries(&feed, 5).await;

        assert!(matches!(result, Err(FeedFetchError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_fetch_entries_unreachable() {
        let reader = FeedReader::new(reqwest::Client::new());
        let result = reader.fetch_entries(&source("http://127.0.0.1:1/feed"), 5).await;
        assert!(matches!(result, Err(FeedFetchError::Http { .. })));
    }
}
