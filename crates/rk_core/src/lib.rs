pub mod config;
pub mod delivery;
pub mod error;
pub mod http;
pub mod logging;
pub mod sources;
pub mod types;

pub use config::{
    Credentials, DeliverySettings, FileConfig, HttpSettings, OutputSettings, PipelineConfig,
    SelectionPolicy, SmtpSecurity, SmtpSettings, UndatedPolicy,
};
pub use delivery::DocumentSender;
pub use error::{ConfigError, DeliveryError, Error, ExtractionError, FeedFetchError, RenderError};
pub use sources::{ContentExtractor, FeedSourceReader};
pub use types::{Article, DocumentFormat, ExtractedContent, FeedEntry, FeedSource, RenderedDocument};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::sources::{ContentExtractor, FeedSourceReader};
    pub use super::types::{Article, FeedEntry, FeedSource};
    pub use super::{Error, Result};
}
