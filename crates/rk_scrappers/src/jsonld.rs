use scraper::{Html, Selector};
use serde_json::Value;

/// Extracts author names from JSON-LD metadata, falling back to
/// `<meta name="author">`. Order is preserved and duplicates are dropped.
pub fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();

    if let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") {
        for script in document.select(&script_selector) {
            if let Ok(json) = serde_json::from_str::<Value>(script.text().collect::<String>().trim()) {
                collect_from_node(&json, &mut authors);
            }
        }
    }

    if authors.is_empty() {
        if let Ok(meta_selector) = Selector::parse("meta[name='author']") {
            for meta in document.select(&meta_selector) {
                if let Some(content) = meta.value().attr("content") {
                    authors.push(content.trim().to_string());
                }
            }
        }
    }

    let mut unique: Vec<String> = Vec::with_capacity(authors.len());
    for author in authors {
        if !author.is_empty() && !unique.contains(&author) {
            unique.push(author);
        }
    }
    unique
}

// A JSON-LD block may be a single object, a list of objects, or an object with `@graph`.
fn collect_from_node(node: &Value, authors: &mut Vec<String>) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect_from_node(item, authors);
            }
        }
        Value::Object(obj) => {
            if let Some(graph) = obj.get("@graph") {
                collect_from_node(graph, authors);
            }
            if let Some(author) = obj.get("author") {
                collect_author(author, authors);
            }
        }
        _ => {}
    }
}

fn collect_author(author: &Value, authors: &mut Vec<String>) {
    match author {
        Value::Array(arr) => {
            for author_obj in arr {
                collect_author(author_obj, authors);
            }
        }
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(|n| n.as_str()) {
                authors.push(name.trim().to_string());
            }
        }
        Value::String(s) => {
            authors.push(s.trim().to_string());
        }
        _ => {}
    }
}
