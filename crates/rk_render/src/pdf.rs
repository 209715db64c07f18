//! PDF output with the standard Helvetica faces.
//!
//! Layout happens in two passes: [`section_lines`] turns an article into
//! wrapped lines, then [`paginate`] places them on A4 pages. The drawing step
//! only copies positioned lines onto printpdf layers.

use std::fmt::Display;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use rk_core::{Article, RenderError};

use crate::markup;
use crate::RenderOptions;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.35;
// Average Helvetica glyph width, in em.
const AVG_CHAR_EM: f32 = 0.5;

const TITLE_SIZE: f32 = 24.0;
const HEADING_SIZE: f32 = 16.0;
const META_SIZE: f32 = 10.0;
const BODY_SIZE: f32 = 11.0;
const PARAGRAPH_GAP: f32 = 2.0;
const LAYER: &str = "Layer 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub face: Face,
    pub size: f32,
    pub gap_before: f32,
}

impl Line {
    fn new(text: impl Into<String>, face: Face, size: f32) -> Self {
        Self {
            text: text.into(),
            face,
            size,
            gap_before: 0.0,
        }
    }

    fn with_gap(mut self, gap: f32) -> Self {
        self.gap_before = gap;
        self
    }

    fn height(&self) -> f32 {
        self.size * PT_TO_MM * LINE_SPACING
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub line: Line,
    pub x: f32,
    pub y: f32,
}

fn pdf_error(e: impl Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

fn usable_width() -> f32 {
    PAGE_WIDTH - 2.0 * MARGIN
}

fn chars_per_line(size: f32) -> usize {
    ((usable_width() / (size * PT_TO_MM * AVG_CHAR_EM)).floor() as usize).max(10)
}

/// Characters outside Latin-1 that WinAnsi (CP1252) still has glyphs for.
const WIN_ANSI_EXTRAS: &[char] = &[
    '\u{20AC}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}', '\u{02C6}',
    '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{017D}', '\u{2018}', '\u{2019}', '\u{201C}',
    '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
    '\u{0153}', '\u{017E}', '\u{0178}',
];

/// The builtin fonts are written as WinAnsi. Its punctuation is kept, a few
/// look-alikes are folded to ASCII and everything else becomes `?`. The C1
/// controls (U+0080..U+009F) are `?` too, since WinAnsi reuses those bytes.
pub fn to_win_ansi(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2032}' => '\'',
            '\u{2033}' => '"',
            '\u{2212}' => '-',
            '\u{00A0}' | '\t' => ' ',
            c if (c as u32) < 0x20 => ' ',
            c if (0x80..=0x9F).contains(&(c as u32)) => '?',
            c if (c as u32) <= 0xFF => c,
            c if WIN_ANSI_EXTRAS.contains(&c) => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap at `width` characters. Longer words are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn wrapped(text: &str, face: Face, size: f32) -> Vec<Line> {
    wrap(&to_win_ansi(text), chars_per_line(size))
        .into_iter()
        .map(|t| Line::new(t, face, size))
        .collect()
}

/// Heading, byline, separator and body of one article, wrapped to the page width.
pub fn section_lines(article: &Article) -> Vec<Line> {
    let mut lines = wrapped(&article.title, Face::Bold, HEADING_SIZE);

    for entry in markup::byline(article) {
        lines.extend(wrapped(&entry, Face::Italic, META_SIZE));
    }

    lines.push(Line::new("-".repeat(chars_per_line(META_SIZE)), Face::Regular, META_SIZE));

    for paragraph in markup::paragraphs(article.content.as_deref().unwrap_or_default()) {
        let mut body = wrapped(paragraph, Face::Regular, BODY_SIZE);
        if let Some(first) = body.first_mut() {
            first.gap_before = PARAGRAPH_GAP;
        }
        lines.extend(body);
    }

    lines
}

/// Places lines top to bottom, opening a new page whenever one is full.
pub fn paginate(lines: Vec<Line>) -> Vec<Vec<Placed>> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages = vec![Vec::new()];
    let mut y = top;

    for line in lines {
        let first_on_page = pages.last().map_or(true, |p| p.is_empty());
        let gap = if first_on_page { 0.0 } else { line.gap_before };
        let needed = gap + line.height();

        if y - needed < MARGIN && !first_on_page {
            pages.push(Vec::new());
            y = top;
        } else {
            y -= gap;
        }

        y -= line.height();
        if let Some(page) = pages.last_mut() {
            page.push(Placed { line, x: MARGIN, y });
        }
    }

    pages
}

fn title_page(options: &RenderOptions, sections: usize) -> Vec<Placed> {
    let mut lines = wrapped(&options.title, Face::Bold, TITLE_SIZE);
    lines.push(Line::new(to_win_ansi(&options.author), Face::Italic, META_SIZE * 1.2).with_gap(6.0));
    lines.push(Line::new(
        format!("{} article{}", sections, if sections == 1 { "" } else { "s" }),
        Face::Italic,
        META_SIZE * 1.2,
    ));

    let mut placed = paginate(lines).into_iter().next().unwrap_or_default();
    // Start a third of the way down the page.
    for p in &mut placed {
        p.y -= PAGE_HEIGHT / 3.0;
    }
    placed
}

fn toc_entries_per_page() -> usize {
    let heading = Line::new("", Face::Bold, HEADING_SIZE).height() + PARAGRAPH_GAP * 2.0;
    let entry = Line::new("", Face::Regular, BODY_SIZE).height();
    ((PAGE_HEIGHT - 2.0 * MARGIN - heading) / entry).floor() as usize
}

/// Contents pages: one line per section with the page its first line is on.
fn toc_pages(titles: &[&str], first_pages: &[usize]) -> Vec<Vec<Placed>> {
    let per_page = toc_entries_per_page().max(1);
    let title_width = chars_per_line(BODY_SIZE).saturating_sub(8);
    let mut pages = Vec::new();

    let chunks: Vec<Vec<(usize, &str)>> = if titles.is_empty() {
        vec![Vec::new()]
    } else {
        titles
            .iter()
            .copied()
            .enumerate()
            .collect::<Vec<_>>()
            .chunks(per_page)
            .map(|c| c.to_vec())
            .collect()
    };

    for chunk in chunks {
        let mut lines = vec![Line::new("Contents", Face::Bold, HEADING_SIZE)];
        for (_, title) in &chunk {
            let mut text: String = to_win_ansi(title).chars().take(title_width).collect();
            if title.chars().count() > title_width {
                text.push_str("...");
            }
            let gap = if lines.len() == 1 { PARAGRAPH_GAP * 2.0 } else { 0.0 };
            lines.push(Line::new(text, Face::Regular, BODY_SIZE).with_gap(gap));
        }

        let mut placed = paginate(lines).into_iter().next().unwrap_or_default();
        // Page numbers, right aligned against the margin.
        let numbers: Vec<Placed> = placed
            .iter()
            .skip(1)
            .zip(chunk.iter())
            .map(|(p, (index, _))| Placed {
                line: Line::new((first_pages[*index] + 1).to_string(), Face::Regular, BODY_SIZE),
                x: PAGE_WIDTH - MARGIN - 10.0,
                y: p.y,
            })
            .collect();
        placed.extend(numbers);
        pages.push(placed);
    }

    pages
}

fn draw(layer: &PdfLayerReference, placed: &[Placed], fonts: &Fonts) {
    for p in placed {
        let font = match p.line.face {
            Face::Regular => &fonts.regular,
            Face::Bold => &fonts.bold,
            Face::Italic => &fonts.italic,
        };
        layer.use_text(p.line.text.as_str(), p.line.size, Mm(p.x), Mm(p.y), font);
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, RenderError> {
        Ok(Self {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
            italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_error)?,
        })
    }
}

/// Title page, contents, then every article starting on a fresh page.
/// Each article also gets a PDF outline bookmark.
pub fn build(articles: &[&Article], options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
    let sections: Vec<Vec<Vec<Placed>>> = articles
        .iter()
        .map(|article| paginate(section_lines(article)))
        .collect();

    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    let toc_page_count = titles.len().div_ceil(toc_entries_per_page().max(1)).max(1);

    let mut first_pages = Vec::with_capacity(sections.len());
    let mut next_page = 1 + toc_page_count;
    for pages in &sections {
        first_pages.push(next_page);
        next_page += pages.len();
    }

    let (doc, title_page_index, title_layer_index) =
        PdfDocument::new(options.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    let fonts = Fonts::load(&doc)?;

    let title_layer = doc.get_page(title_page_index).get_layer(title_layer_index);
    draw(&title_layer, &title_page(options, articles.len()), &fonts);

    for page in toc_pages(&titles, &first_pages) {
        let (page_index, layer_index) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        draw(&doc.get_page(page_index).get_layer(layer_index), &page, &fonts);
    }

    for (article, pages) in articles.iter().zip(sections) {
        for (n, page) in pages.into_iter().enumerate() {
            let (page_index, layer_index) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            if n == 0 {
                doc.add_bookmark(to_win_ansi(&article.title), page_index);
            }
            draw(&doc.get_page(page_index).get_layer(layer_index), &page, &fonts);
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn article(content: &str) -> Article {
        Article {
            url: "https://example.com/a".to_string(),
            title: "A heading".to_string(),
            content: Some(content.to_string()),
            published_at: None,
            source: "Example".to_string(),
            authors: vec![],
        }
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aa bb cc dd", 5), vec!["aa bb", "cc dd"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("x abcdefgh", 4), vec!["x", "abcd", "efgh"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_to_win_ansi() {
        assert_eq!(
            to_win_ansi("\u{201C}caf\u{e9}\u{201D} \u{2014} \u{2026} \u{20AC}5 \u{65e5}"),
            "\u{201C}caf\u{e9}\u{201D} \u{2014} \u{2026} \u{20AC}5 ?"
        );
        assert_eq!(to_win_ansi("a\u{0080}b\u{009F}c"), "a?b?c");
        assert_eq!(to_win_ansi("x\u{2212}y \u{2032}"), "x-y '");
    }

    #[test]
    fn test_section_lines_layout() {
        let lines = section_lines(&article("One\n\nTwo"));
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();

        assert_eq!(texts[0], "A heading");
        assert_eq!(texts[1], "Source: Example");
        assert!(texts[2].starts_with("---"));
        assert_eq!(&texts[3..], &["One", "Two"]);
        assert_eq!(lines[3].gap_before, PARAGRAPH_GAP);
        assert_eq!(lines[0].face, Face::Bold);
    }

    #[test]
    fn test_section_lines_are_deterministic() {
        let a = article("Some text\nMore text");
        assert_eq!(section_lines(&a), section_lines(&a));
    }

    #[test]
    fn test_paginate_spills_to_new_pages() {
        let long = vec!["word"; 4000].join(" ");
        let pages = paginate(section_lines(&article(&long)));

        assert!(pages.len() > 1);
        for page in &pages {
            assert!(!page.is_empty());
            for placed in page {
                assert!(placed.y >= MARGIN - 0.01, "line below bottom margin: {}", placed.y);
                assert!(placed.y <= PAGE_HEIGHT - MARGIN);
            }
        }
    }

    #[test]
    fn test_toc_lists_page_numbers() {
        let pages = toc_pages(&["First", "Second"], &[2, 5]);
        assert_eq!(pages.len(), 1);
        let texts: Vec<&str> = pages[0].iter().map(|p| p.line.text.as_str()).collect();
        assert_eq!(texts, vec!["Contents", "First", "Second", "3", "6"]);
    }

    #[test]
    fn test_build_pdf() {
        let a = article("Body");
        let bytes = build(&[&a], &RenderOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_build_empty_pdf() {
        let bytes = build(&[], &RenderOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
