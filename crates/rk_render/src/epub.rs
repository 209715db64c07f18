use std::fmt::Display;

use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ReferenceType, ZipLibrary};
use rk_core::{Article, RenderError};

use crate::markup;
use crate::RenderOptions;

const STYLESHEET: &str = r#"
body { font-family: serif; line-height: 1.4; }
h1 { font-size: 1.5em; margin-bottom: 0.4em; }
p.byline { margin: 0.1em 0; color: #555; font-size: 0.9em; }
div.article p { text-indent: 0; margin: 0 0 0.8em 0; }
div.title-page { text-align: center; margin-top: 30%; }
"#;

fn epub_error(e: impl Display) -> RenderError {
    RenderError::Epub(e.to_string())
}

pub fn chapter_file_name(index: usize) -> String {
    format!("article_{}.xhtml", index)
}

/// EPUB 3 with a title page, an inline table of contents and one chapter per article.
pub fn build(articles: &[&Article], options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
    let mut builder = EpubBuilder::new(ZipLibrary::new().map_err(epub_error)?).map_err(epub_error)?;
    builder.epub_version(EpubVersion::V30);

    builder
        .metadata("title", options.title.as_str())
        .map_err(epub_error)?
        .metadata("author", options.author.as_str())
        .map_err(epub_error)?
        .metadata("lang", options.language.as_str())
        .map_err(epub_error)?
        .metadata("generator", "rk")
        .map_err(epub_error)?;

    builder.stylesheet(STYLESHEET.as_bytes()).map_err(epub_error)?;

    // No title on the title page keeps it out of the table of contents.
    let title_page = markup::title_page_xhtml(&options.title, &options.author, &options.language, articles.len());
    builder
        .add_content(
            EpubContent::new("title.xhtml", title_page.as_bytes()).reftype(ReferenceType::TitlePage),
        )
        .map_err(epub_error)?;
    builder.inline_toc();

    for (index, article) in articles.iter().enumerate() {
        let xhtml = markup::section_xhtml(article, &options.language);
        builder
            .add_content(
                EpubContent::new(chapter_file_name(index), xhtml.as_bytes())
                    .title(article.title.as_str())
                    .reftype(ReferenceType::Text),
            )
            .map_err(epub_error)?;
    }

    let mut bytes = Vec::new();
    builder.generate(&mut bytes).map_err(epub_error)?;
    Ok(bytes)
}
