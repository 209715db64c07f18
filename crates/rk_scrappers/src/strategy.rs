//! Ordered content-isolation heuristics.
//!
//! A [`StrategyChain`] tries each [`Strategy`] in turn and keeps the first one
//! that yields text. Site-specific rules always come first, followed by the
//! generic `<article>` and container fallbacks, in that order.

use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;

/// Removed from every matched container before its text is read.
const ALWAYS_STRIP: &[&str] = &["script", "style", "noscript", "div.post-labels"];

const CONTAINER_SELECTORS: &[&str] = &["div.content", "div.post"];

#[derive(Error, Debug)]
#[error("Invalid selector {selector:?}: {reason}")]
pub struct SiteRuleError {
    pub selector: String,
    pub reason: String,
}

fn parse_selector(selector: &str) -> Result<Selector, SiteRuleError> {
    Selector::parse(selector).map_err(|e| SiteRuleError {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

// Only called with the literals in this module.
fn static_selector(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selectors are valid CSS")
}

/// A site's own post container plus the blocks inside it that are not article text.
#[derive(Debug, Clone)]
pub struct SiteRule {
    name: String,
    container: Selector,
    strip: Vec<Selector>,
}

impl SiteRule {
    pub fn new(name: impl Into<String>, container: &str, strip: &[&str]) -> Result<Self, SiteRuleError> {
        Ok(Self {
            name: name.into(),
            container: parse_selector(container)?,
            strip: strip.iter().map(|s| parse_selector(s)).collect::<Result<_, _>>()?,
        })
    }

    /// Blogger/Blogspot posts: `div.post-body`, without the labels block.
    pub fn blogger() -> Self {
        Self {
            name: "blogger".to_string(),
            container: static_selector("div.post-body"),
            strip: vec![static_selector("div.post-labels")],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Selectors are parsed when the strategy is built, not per page.
#[derive(Debug, Clone)]
pub enum Strategy {
    Site(SiteRule),
    /// The first `<article>` element
    Article(Selector),
    /// The first match of each selector, tried in order
    Container(Vec<Selector>),
}

impl Strategy {
    pub fn article() -> Self {
        Strategy::Article(static_selector("article"))
    }

    /// `div.content`, else `div.post`.
    pub fn container() -> Self {
        Strategy::Container(CONTAINER_SELECTORS.iter().map(|s| static_selector(s)).collect())
    }

    pub fn name(&self) -> &str {
        match self {
            Strategy::Site(rule) => rule.name(),
            Strategy::Article(_) => "article",
            Strategy::Container(_) => "container",
        }
    }

    /// Text of the container this strategy targets, if it exists and has any.
    /// `always_strip` is removed on top of the strategy's own strip list.
    pub fn apply(&self, document: &Html, always_strip: &[Selector]) -> Option<String> {
        match self {
            Strategy::Site(rule) => first_match_text(document, &rule.container, &rule.strip, always_strip),
            Strategy::Article(selector) => first_match_text(document, selector, &[], always_strip),
            Strategy::Container(selectors) => selectors
                .iter()
                .find_map(|s| first_match_text(document, s, &[], always_strip)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyChain {
    strategies: Vec<Strategy>,
    always_strip: Vec<Selector>,
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::new(vec![
            Strategy::Site(SiteRule::blogger()),
            Strategy::article(),
            Strategy::container(),
        ])
    }
}

impl StrategyChain {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self {
            strategies,
            always_strip: ALWAYS_STRIP.iter().map(|s| static_selector(s)).collect(),
        }
    }

    /// Adds a site rule after the existing ones. The generic fallbacks keep their
    /// place at the end of the chain.
    pub fn with_site_rule(mut self, rule: SiteRule) -> Self {
        let position = self
            .strategies
            .iter()
            .rposition(|s| matches!(s, Strategy::Site(_)))
            .map(|p| p + 1)
            .unwrap_or(0);
        self.strategies.insert(position, Strategy::Site(rule));
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// First strategy that yields text, together with that text.
    pub fn extract(&self, document: &Html) -> Option<(&Strategy, String)> {
        self.strategies
            .iter()
            .find_map(|strategy| {
                strategy
                    .apply(document, &self.always_strip)
                    .map(|text| (strategy, text))
            })
    }
}

fn first_match_text(
    document: &Html,
    container: &Selector,
    strip: &[Selector],
    always_strip: &[Selector],
) -> Option<String> {
    let element = document.select(container).next()?;
    let text = container_text(element, strip, always_strip);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Visible text nodes under `container`, trimmed and joined with newlines.
/// Subtrees matching `strip` or `always_strip` are left out.
pub fn container_text(container: ElementRef<'_>, strip: &[Selector], always_strip: &[Selector]) -> String {
    let skipped: Vec<ElementRef<'_>> = strip
        .iter()
        .chain(always_strip)
        .flat_map(|selector| container.select(selector))
        .collect();

    let mut parts = Vec::new();
    collect_text(container, &skipped, &mut parts);
    parts.join("\n")
}

fn collect_text<'a>(element: ElementRef<'a>, skipped: &[ElementRef<'a>], parts: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !skipped.iter().any(|s| s.id() == child_element.id()) {
                collect_text(child_element, skipped, parts);
            }
        } else if let Node::Text(text) = child.value() {
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
    }
}
