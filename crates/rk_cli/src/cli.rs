use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rk_core::config::{FileConfig, DEFAULT_TIMEOUT_SECS};
use rk_core::{ConfigError, Credentials, DocumentFormat, FeedSource, OutputSettings, PipelineConfig, UndatedPolicy};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "rk", author, version, about = "Bundles recent RSS articles into an e-book and mails it to an e-reader", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch feeds, extract articles, render the digest and send it
    Run(RunArgs),
    /// Fetch and filter feeds, then list the entries that would be extracted
    Feeds(SourceArgs),
    /// Extract a single article page and print its text
    Extract {
        url: String,
        /// Request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
    },
}

/// Where articles come from and which ones are kept.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Feed to read, as URL or NAME=URL (repeatable). The name defaults to the URL host
    #[arg(long = "feed", value_name = "URL|NAME=URL", value_parser = parse_feed)]
    pub feeds: Vec<FeedSource>,
    /// TOML config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Articles kept per feed [default: 5]
    #[arg(long)]
    pub max_articles: Option<usize>,
    /// Drop entries published more than this many days ago [default: 1]
    #[arg(long)]
    pub max_age_days: Option<u32>,
    /// Entries without a publication date: include or skip [default: include]
    #[arg(long)]
    pub undated: Option<UndatedPolicy>,
    /// HTTP and SMTP timeout in seconds [default: 30]
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// E-reader address the digest is sent to
    #[arg(long, env = "RK_KINDLE_EMAIL")]
    pub to: Option<String>,
    #[arg(long, env = "RK_SMTP_USERNAME")]
    pub smtp_user: Option<String>,
    #[arg(long, env = "RK_SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,
    /// [default: smtp.gmail.com]
    #[arg(long)]
    pub smtp_host: Option<String>,
    /// [default: 587]
    #[arg(long)]
    pub smtp_port: Option<u16>,
    /// Sender address, defaults to the SMTP username
    #[arg(long)]
    pub from: Option<String>,
    /// Output file [default: digest_YYYYMMDD.<ext>]
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// epub or pdf; inferred from --output when omitted
    #[arg(long)]
    pub format: Option<DocumentFormat>,
    #[arg(long)]
    pub subject: Option<String>,
    #[arg(long)]
    pub body: Option<String>,
    /// Render the document but do not send it
    #[arg(long)]
    pub no_send: bool,
    /// Delete the document after a successful send
    #[arg(long)]
    pub cleanup: bool,
}

/// `NAME=URL` or a bare URL named after its host.
pub fn parse_feed(raw: &str) -> Result<FeedSource, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("feed must not be empty".to_string());
    }

    if let Some((name, url)) = raw.split_once('=') {
        // An `=` inside the URL's query is not a name separator.
        if !name.contains("://") && !name.contains('/') {
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || url.is_empty() {
                return Err(format!("expected NAME=URL, got {}", raw));
            }
            return Ok(FeedSource::new(name, url));
        }
    }

    let name = Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| raw.to_string());
    Ok(FeedSource::new(name, raw))
}

fn load_file(path: Option<&PathBuf>) -> Result<FileConfig, ConfigError> {
    match path {
        Some(path) => FileConfig::load(path),
        None => Ok(FileConfig::default()),
    }
}

impl SourceArgs {
    fn apply(&self, file: &FileConfig, config: &mut PipelineConfig) {
        if !self.feeds.is_empty() {
            config.feeds = self.feeds.clone();
        }

        let selection = &mut config.selection;
        if let Some(max) = self.max_articles.or(file.max_articles_per_feed) {
            selection.max_articles_per_feed = max;
        }
        if let Some(days) = self.max_age_days.or(file.max_age_days) {
            selection.max_age_days = days;
        }
        if let Some(undated) = self.undated.or(file.undated) {
            selection.undated = undated;
        }
        if let Some(timeout) = self.timeout.or(file.timeout_secs) {
            config.http.timeout_secs = timeout;
        }
    }

    /// Config for listing feeds only. Delivery stays off.
    pub fn into_config(self, today: NaiveDate) -> Result<PipelineConfig, ConfigError> {
        let file = load_file(self.config.as_ref())?;
        let mut config = PipelineConfig::new(file.feeds.clone(), today);
        self.apply(&file, &mut config);
        config.delivery.enabled = false;
        Ok(config)
    }
}

impl RunArgs {
    /// Defaults, then the config file, then flags and environment.
    pub fn into_config(self, today: NaiveDate) -> Result<PipelineConfig, ConfigError> {
        let file = load_file(self.source.config.as_ref())?;
        let mut config = PipelineConfig::new(file.feeds.clone(), today);
        self.source.apply(&file, &mut config);

        let output_path = self.output.or_else(|| file.output.clone());
        let format = self
            .format
            .or(file.format)
            .or_else(|| output_path.as_deref().and_then(DocumentFormat::from_path))
            .unwrap_or_default();
        config.output = match output_path {
            Some(path) => OutputSettings { path, format },
            None => OutputSettings::default_for(today, format),
        };

        let delivery = &mut config.delivery;
        delivery.enabled = !self.no_send;
        delivery.cleanup = self.cleanup || file.cleanup.unwrap_or(false);
        delivery.recipient = self.to.or_else(|| file.kindle_email.clone());
        if let Some(subject) = self.subject.or_else(|| file.subject.clone()) {
            delivery.subject = subject;
        }
        if let Some(body) = self.body.or_else(|| file.body.clone()) {
            delivery.body = body;
        }

        let smtp = &mut delivery.smtp;
        if let Some(host) = self.smtp_host.or_else(|| file.smtp.host.clone()) {
            smtp.host = host;
        }
        if let Some(port) = self.smtp_port.or(file.smtp.port) {
            smtp.port = port;
        }
        if let Some(security) = file.smtp.security {
            smtp.security = security;
        }
        smtp.from = self.from.or_else(|| file.smtp.from.clone());

        let username = self.smtp_user.or_else(|| file.smtp.username.clone());
        let password = self.smtp_password.or_else(|| file.smtp.password.clone());
        smtp.credentials = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(
                    "SMTP username and password must be given together".to_string(),
                ))
            }
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rk_core::SmtpSecurity;
    use std::io::Write;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn run_args(feeds: &[&str]) -> RunArgs {
        RunArgs {
            source: SourceArgs {
                feeds: feeds.iter().map(|f| parse_feed(f).unwrap()).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_feed() {
        assert_eq!(
            parse_feed("Tech=https://example.com/feed").unwrap(),
            FeedSource::new("Tech", "https://example.com/feed")
        );
        assert_eq!(
            parse_feed("https://blog.example.org/rss").unwrap(),
            FeedSource::new("blog.example.org", "https://blog.example.org/rss")
        );
        assert_eq!(
            parse_feed("https://example.com/feed?format=rss").unwrap(),
            FeedSource::new("example.com", "https://example.com/feed?format=rss")
        );
        assert!(parse_feed("=https://example.com").is_err());
        assert!(parse_feed("").is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "rk",
            "-v",
            "run",
            "--feed",
            "Tech=https://example.com/feed",
            "--feed",
            "https://other.example.com/rss",
            "--max-articles",
            "3",
            "--undated",
            "skip",
            "--format",
            "pdf",
            "--no-send",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.source.feeds.len(), 2);
        assert_eq!(args.source.max_articles, Some(3));
        assert_eq!(args.source.undated, Some(UndatedPolicy::Skip));
        assert_eq!(args.format, Some(DocumentFormat::Pdf));
        assert!(args.no_send);
    }

    #[test]
    fn test_run_defaults() {
        let config = run_args(&["https://example.com/feed"]).into_config(today()).unwrap();

        assert_eq!(config.output.path, PathBuf::from("digest_20240309.epub"));
        assert_eq!(config.output.format, DocumentFormat::Epub);
        assert_eq!(config.delivery.subject, "Daily Digest - 2024-03-09");
        assert_eq!(config.delivery.body, "Attached is your RSS feed content.");
        assert_eq!(config.delivery.smtp.host, "smtp.gmail.com");
        assert_eq!(config.delivery.smtp.port, 587);
        assert!(config.delivery.enabled);
        assert!(!config.delivery.should_send());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_format_inferred_from_output() {
        let mut args = run_args(&["https://example.com/feed"]);
        args.output = Some(PathBuf::from("out/today.pdf"));
        let config = args.into_config(today()).unwrap();
        assert_eq!(config.output.format, DocumentFormat::Pdf);

        let mut args = run_args(&["https://example.com/feed"]);
        args.format = Some(DocumentFormat::Pdf);
        let config = args.into_config(today()).unwrap();
        assert_eq!(config.output.path, PathBuf::from("digest_20240309.pdf"));
    }

    #[test]
    fn test_credentials_must_be_paired() {
        let mut args = run_args(&["https://example.com/feed"]);
        args.smtp_user = Some("me@example.com".to_string());
        assert!(matches!(args.into_config(today()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
kindle_email = "file@kindle.com"
max_articles_per_feed = 2
max_age_days = 3
subject = "From file"
cleanup = true

[[feeds]]
name = "File feed"
url = "https://file.example.com/rss"

[smtp]
host = "smtp.example.com"
port = 465
security = "tls"
username = "sender@example.com"
password = "secret"
"#
        )
        .unwrap();

        let mut args = RunArgs::default();
        args.source.config = Some(file.path().to_path_buf());
        args.source.max_articles = Some(4);
        args.to = Some("flag@kindle.com".to_string());
        let config = args.into_config(today()).unwrap();

        assert_eq!(config.feeds, vec![FeedSource::new("File feed", "https://file.example.com/rss")]);
        assert_eq!(config.selection.max_articles_per_feed, 4);
        assert_eq!(config.selection.max_age_days, 3);
        assert_eq!(config.delivery.recipient.as_deref(), Some("flag@kindle.com"));
        assert_eq!(config.delivery.subject, "From file");
        assert!(config.delivery.cleanup);
        assert_eq!(config.delivery.smtp.port, 465);
        assert_eq!(config.delivery.smtp.security, SmtpSecurity::Tls);
        assert!(config.delivery.should_send());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_feeds_replace_file_feeds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[[feeds]]\nname = \"A\"\nurl = \"https://a.example.com/rss\"\n").unwrap();

        let mut args = run_args(&["B=https://b.example.com/rss"]);
        args.source.config = Some(file.path().to_path_buf());
        let config = args.into_config(today()).unwrap();

        assert_eq!(config.feeds, vec![FeedSource::new("B", "https://b.example.com/rss")]);
    }

    #[test]
    fn test_missing_config_file() {
        let mut args = run_args(&[]);
        args.source.config = Some(PathBuf::from("/nonexistent/rk.toml"));
        assert!(matches!(args.into_config(today()), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_feeds_listing_never_sends() {
        let args = SourceArgs {
            feeds: vec![parse_feed("https://example.com/feed").unwrap()],
            max_age_days: Some(7),
            ..Default::default()
        };
        let config = args.into_config(today()).unwrap();
        assert!(!config.delivery.enabled);
        assert_eq!(config.selection.max_age_days, 7);
    }
}
