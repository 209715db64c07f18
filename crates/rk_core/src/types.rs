use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured feed. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One item as listed by a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
    pub authors: Vec<String>,
}

impl Article {
    /// An article that has not been through extraction yet.
    pub fn from_entry(entry: FeedEntry) -> Self {
        Self {
            url: entry.link,
            title: entry.title,
            content: None,
            published_at: entry.published_at,
            source: entry.source,
            authors: Vec::new(),
        }
    }

    pub fn with_content(mut self, extracted: ExtractedContent) -> Self {
        self.content = Some(extracted.content);
        self.authors = extracted.authors;
        self
    }

    /// Non-empty content after trimming. Only these articles get rendered.
    pub fn has_content(&self) -> bool {
        self.content
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}

/// What the extractor isolated from an article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub content: String,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Epub,
    Pdf,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Epub => "epub",
            DocumentFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Epub => "application/epub+zip",
            DocumentFormat::Pdf => "application/pdf",
        }
    }

    /// Infers the format from a file extension, if it is one we produce.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epub" => Ok(DocumentFormat::Epub),
            "pdf" => Ok(DocumentFormat::Pdf),
            other => Err(format!("Unsupported document format: {}", other)),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A document written to disk by the renderer. Never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub sections: usize,
}

impl RenderedDocument {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("digest.{}", self.format.extension()))
    }
}
