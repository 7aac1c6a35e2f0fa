//! Parsing an arXiv abstract page.
//!
//! The landing page carries the title in `h1.title` and the abstract in
//! `blockquote.abstract`, each prefixed with a visually hidden label
//! (`Title:`, `Abstract:`). Parsing is synchronous: `scraper::Html` is not
//! `Send`, so it must never be held across an `.await`.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static SEL_ABSTRACT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("blockquote.abstract").unwrap());
static SEL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1.title").unwrap());

/// Title and abstract scraped from a landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbstractPage {
    pub title: Option<String>,
    pub abstract_text: String,
}

/// Extract the title (if present) and the abstract from `html`.
///
/// Returns a human-readable reason when the page has no abstract or the
/// abstract is blank.
pub fn parse_abstract_page(html: &str) -> Result<AbstractPage, String> {
    let document = Html::parse_document(html);

    let abstract_text = document
        .select(&SEL_ABSTRACT)
        .next()
        .map(|el| labelled_text(el, "Abstract:"))
        .ok_or_else(|| "page has no abstract block".to_string())?;
    if abstract_text.is_empty() {
        return Err("abstract block is empty".into());
    }

    let title = document
        .select(&SEL_TITLE)
        .next()
        .map(|el| labelled_text(el, "Title:"))
        .filter(|t| !t.is_empty());

    Ok(AbstractPage {
        title,
        abstract_text,
    })
}

/// Element text with whitespace collapsed and a leading `label` removed.
fn labelled_text(el: ElementRef<'_>, label: &str) -> String {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .strip_prefix(label)
        .unwrap_or(&collapsed)
        .trim()
        .to_string()
}
