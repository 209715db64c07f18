use std::path::PathBuf;

use thiserror::Error;

/// A feed could not be read. The run skips the feed and continues.
#[derive(Error, Debug)]
pub enum FeedFetchError {
    #[error("Failed to fetch feed {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Feed {url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse feed {url}: {message}")]
    Parse { url: String, message: String },
}

/// An article could not be turned into text. The run drops the article and continues.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to fetch article {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No article content found")]
    NoContentFound,
}

/// The document could not be produced. Fatal for the run.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("EPUB generation failed: {0}")]
    Epub(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// The document could not be sent. The document stays on disk.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Invalid email address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to read attachment {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build email message: {0}")]
    Message(String),

    #[error("SMTP delivery via {host}:{port} failed: {reason}")]
    Transport {
        host: String,
        port: u16,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Run-level failures. Feed and extraction errors never reach this type: the
/// pipeline logs and skips them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("No article with content survived extraction, nothing to render")]
    NothingToRender,
}
