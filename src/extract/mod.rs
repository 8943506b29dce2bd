// src/extract/mod.rs

pub mod forecast;
pub mod table;
pub mod text_block;

use scraper::{ElementRef, Html, Node, Selector};

use crate::error::ScrapeError;

/// C0 controls, DEL and the C1 block.
pub fn is_nonprintable(c: char) -> bool {
    matches!(c as u32, 0x00..=0x1f | 0x7f..=0x9f)
}

pub fn remove_nonprintable(s: &str) -> String {
    s.chars().filter(|&c| !is_nonprintable(c)).collect()
}

/// Drop non-printable characters, then collapse runs of whitespace to
/// single spaces and trim.
pub fn clean_text(s: &str) -> String {
    remove_nonprintable(s)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text of an element and all its descendants, cleaned; `empty`
/// when nothing is left.
pub fn element_text(el: ElementRef<'_>, empty: &str) -> String {
    let text = clean_text(&el.text().collect::<String>());
    if text.is_empty() {
        empty.to_string()
    } else {
        text
    }
}

/// Text that appears directly inside `el` before its first child element.
pub fn leading_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(_) => break,
            _ => {}
        }
    }
    out
}

/// Direct element children of `el` with the given tag name.
pub fn child_elements<'a>(
    el: ElementRef<'a>,
    name: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |c| c.value().name() == name)
}

/// Whitespace-separated class list contains `class`.
pub fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value()
        .attr("class")
        .map(|c| c.split_whitespace().any(|k| k == class))
        .unwrap_or(false)
}

/// Exactly one `<tag id="id">` in the document.
pub fn select_unique<'a>(doc: &'a Html, tag: &str, id: &str) -> Result<ElementRef<'a>, ScrapeError> {
    let css = format!("{}[id=\"{}\"]", tag, id.replace('"', "\\\""));
    let structure = |found| ScrapeError::Structure {
        selector: css.clone(),
        found,
    };
    let selector = Selector::parse(&css).map_err(|_| structure(0))?;
    let mut hits = doc.select(&selector);
    let first = hits.next().ok_or_else(|| structure(0))?;
    let extra = hits.count();
    if extra > 0 {
        return Err(structure(extra + 1));
    }
    Ok(first)
}

/// Document `<title>`, non-printables removed.
pub fn page_title(doc: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    doc.select(&selector)
        .next()
        .map(|t| clean_text(&t.text().collect::<String>()))
}
