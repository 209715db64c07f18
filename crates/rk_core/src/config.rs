use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::types::{DocumentFormat, FeedSource};

pub const DEFAULT_MAX_ARTICLES_PER_FEED: usize = 5;
pub const DEFAULT_MAX_AGE_DAYS: u32 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_BODY: &str = "Attached is your RSS feed content.";
pub const DEFAULT_USER_AGENT: &str = concat!("rk/", env!("CARGO_PKG_VERSION"));

/// What to do with entries whose publication date is missing or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndatedPolicy {
    #[default]
    Include,
    Skip,
}

impl FromStr for UndatedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(UndatedPolicy::Include),
            "skip" => Ok(UndatedPolicy::Skip),
            other => Err(format!("Unknown undated policy: {} (expected include or skip)", other)),
        }
    }
}

/// Per-feed selection applied between fetching and extraction.
/// Entries are filtered by age first, then capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub max_articles_per_feed: usize,
    pub max_age_days: u32,
    pub undated: UndatedPolicy,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            max_articles_per_feed: DEFAULT_MAX_ARTICLES_PER_FEED,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            undated: UndatedPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (port 587)
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (port 465)
    Tls,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub credentials: Option<Credentials>,
    pub from: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            security: SmtpSecurity::default(),
            credentials: None,
            from: None,
        }
    }
}

impl SmtpSettings {
    /// Sender address: the explicit `from`, else the login name.
    pub fn sender(&self) -> Option<&str> {
        self.from
            .as_deref()
            .or_else(|| self.credentials.as_ref().map(|c| c.username.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySettings {
    pub enabled: bool,
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
    pub cleanup: bool,
    pub smtp: SmtpSettings,
}

impl DeliverySettings {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            enabled: true,
            recipient: None,
            subject: default_title(date),
            body: DEFAULT_BODY.to_string(),
            cleanup: false,
            smtp: SmtpSettings::default(),
        }
    }

    /// Delivery is attempted only when enabled and credentials are known.
    pub fn should_send(&self) -> bool {
        self.enabled && self.smtp.credentials.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub path: PathBuf,
    pub format: DocumentFormat,
}

impl OutputSettings {
    /// `digest_YYYYMMDD.<ext>` in the working directory.
    pub fn default_for(date: NaiveDate, format: DocumentFormat) -> Self {
        Self {
            path: PathBuf::from(format!("digest_{}.{}", date.format("%Y%m%d"), format.extension())),
            format,
        }
    }
}

/// Everything a run needs, built once before the pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub feeds: Vec<FeedSource>,
    pub selection: SelectionPolicy,
    pub http: HttpSettings,
    pub output: OutputSettings,
    pub delivery: DeliverySettings,
}

impl PipelineConfig {
    pub fn new(feeds: Vec<FeedSource>, date: NaiveDate) -> Self {
        Self {
            feeds,
            selection: SelectionPolicy::default(),
            http: HttpSettings::default(),
            output: OutputSettings::default_for(date, DocumentFormat::default()),
            delivery: DeliverySettings::for_date(date),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.feeds.is_empty() {
            return Err(ConfigError::Invalid("at least one feed is required".to_string()));
        }

        for feed in &self.feeds {
            let url = Url::parse(&feed.url).map_err(|e| {
                ConfigError::Invalid(format!("feed {} has an invalid URL {}: {}", feed.name, feed.url, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "feed {} must use http or https: {}",
                    feed.name, feed.url
                )));
            }
        }

        if self.selection.max_articles_per_feed == 0 {
            return Err(ConfigError::Invalid("max articles per feed must be at least 1".to_string()));
        }

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout must be at least 1 second".to_string()));
        }

        if self.delivery.should_send() {
            if self.delivery.recipient.as_deref().map_or(true, |r| r.trim().is_empty()) {
                return Err(ConfigError::Invalid(
                    "a recipient address is required to send the document".to_string(),
                ));
            }
            if self.delivery.smtp.host.trim().is_empty() {
                return Err(ConfigError::Invalid("SMTP host must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Title shared by the document metadata and the default mail subject.
pub fn default_title(date: NaiveDate) -> String {
    format!("Daily Digest - {}", date.format("%Y-%m-%d"))
}

/// Optional TOML file. Every field may be overridden from the command line.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
    pub kindle_email: Option<String>,
    pub max_articles_per_feed: Option<usize>,
    pub max_age_days: Option<u32>,
    pub undated: Option<UndatedPolicy>,
    pub output: Option<PathBuf>,
    pub format: Option<DocumentFormat>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub timeout_secs: Option<u64>,
    pub cleanup: Option<bool>,
    #[serde(default)]
    pub smtp: FileSmtpConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileSmtpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub security: Option<SmtpSecurity>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
