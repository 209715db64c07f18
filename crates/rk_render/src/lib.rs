use std::path::Path;

use chrono::{Local, NaiveDate};
use rk_core::config::default_title;
use rk_core::{Article, DocumentFormat, RenderError, RenderedDocument};
use tracing::info;

pub mod epub;
pub mod markup;
pub mod pdf;

pub const DEFAULT_AUTHOR: &str = "RSS Aggregator";
pub const DEFAULT_LANGUAGE: &str = "en";

/// Document-level metadata shown on the title page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub title: String,
    pub author: String,
    pub language: String,
}

impl RenderOptions {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            title: default_title(date),
            author: DEFAULT_AUTHOR.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::for_date(Local::now().date_naive())
    }
}

/// Renders every article with content into one document at `path`.
///
/// Articles without content are left out. The file is written in one go once
/// the whole document is built; if writing fails, nothing is left at `path`.
pub fn render(
    articles: &[Article],
    format: DocumentFormat,
    path: &Path,
    options: &RenderOptions,
) -> Result<RenderedDocument, RenderError> {
    let sections: Vec<&Article> = articles.iter().filter(|a| a.has_content()).collect();

    let bytes = match format {
        DocumentFormat::Epub => epub::build(&sections, options)?,
        DocumentFormat::Pdf => pdf::build(&sections, options)?,
    };

    write_document(path, &bytes)?;
    info!(
        "📚 Wrote {} with {} section(s) ({} bytes)",
        path.display(),
        sections.len(),
        bytes.len()
    );

    Ok(RenderedDocument {
        path: path.to_path_buf(),
        format,
        sections: sections.len(),
    })
}

fn write_document(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    std::fs::write(path, bytes).map_err(|source| {
        // A failed write may leave a truncated file behind.
        let _ = std::fs::remove_file(path);
        RenderError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
