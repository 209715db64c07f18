//! Format-independent pieces of an article section.

use chrono::{DateTime, Utc};
use rk_core::Article;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// One paragraph per input line; blank lines are dropped.
pub fn paragraphs(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Source, date (when known) and authors (when known), in that order.
pub fn byline(article: &Article) -> Vec<String> {
    let mut lines = vec![format!("Source: {}", article.source)];
    if let Some(published) = &article.published_at {
        lines.push(format!("Date: {}", format_date(published)));
    }
    if !article.authors.is_empty() {
        lines.push(format!("By: {}", article.authors.join(", ")));
    }
    lines
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn xhtml_page(title: &str, language: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
<meta charset="UTF-8"/>
<title>{title}</title>
<link rel="stylesheet" type="text/css" href="stylesheet.css"/>
</head>
<body>
{body}</body>
</html>
"#,
        lang = escape(language),
        title = escape(title),
        body = body,
    )
}

/// XHTML for one article. Depends on nothing but the article.
pub fn section_xhtml(article: &Article, language: &str) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape(&article.title));
    for line in byline(article) {
        body.push_str(&format!("<p class=\"byline\"><em>{}</em></p>\n", escape(&line)));
    }
    body.push_str("<hr/>\n<div class=\"article\">\n");
    for paragraph in paragraphs(article.content.as_deref().unwrap_or_default()) {
        body.push_str(&format!("<p>{}</p>\n", escape(paragraph)));
    }
    body.push_str("</div>\n");

    xhtml_page(&article.title, language, &body)
}

pub fn title_page_xhtml(title: &str, author: &str, language: &str, sections: usize) -> String {
    let body = format!(
        "<div class=\"title-page\">\n<h1>{}</h1>\n<p class=\"byline\">{}</p>\n<p class=\"byline\">{} article{}</p>\n</div>\n",
        escape(title),
        escape(author),
        sections,
        if sections == 1 { "" } else { "s" },
    );
    xhtml_page(title, language, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn article() -> Article {
        Article {
            url: "https://example.com/a".to_string(),
            title: "Rust & <Feeds>".to_string(),
            content: Some("First line\n\n  Second line  \n".to_string()),
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap()),
            source: "Tech News".to_string(),
            authors: vec![],
        }
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(paragraphs("a\n\n b \r\nc"), vec!["a", "b", "c"]);
        assert!(paragraphs("\n \n").is_empty());
    }

    #[test]
    fn test_byline() {
        assert_eq!(byline(&article()), vec!["Source: Tech News", "Date: 2024-03-09 07:05"]);

        let mut undated = article();
        undated.published_at = None;
        undated.authors = vec!["Ada".to_string(), "Alan".to_string()];
        assert_eq!(byline(&undated), vec!["Source: Tech News", "By: Ada, Alan"]);
    }

    #[test]
    fn test_section_xhtml() {
        let xhtml = section_xhtml(&article(), "en");
        assert!(xhtml.contains("<h1>Rust &amp; &lt;Feeds&gt;</h1>"));
        assert!(xhtml.contains("<em>Source: Tech News</em>"));
        assert!(xhtml.contains("<em>Date: 2024-03-09 07:05</em>"));
        assert!(xhtml.contains("<hr/>"));
        assert!(xhtml.contains("<p>First line</p>\n<p>Second line</p>"));
    }

    #[test]
    fn test_section_xhtml_is_deterministic() {
        assert_eq!(section_xhtml(&article(), "en"), section_xhtml(&article(), "en"));
    }

    #[test]
    fn test_title_page() {
        let xhtml = title_page_xhtml("Daily Digest - 2024-03-09", "RSS Aggregator", "en", 1);
        assert!(xhtml.contains("<h1>Daily Digest - 2024-03-09</h1>"));
        assert!(xhtml.contains("1 article</p>"));
    }
}
