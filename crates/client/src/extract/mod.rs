//! Title and plain-text extraction from HTML.
//!
//! ### Title
//! - Text of the first `<title>` element, trimmed.
//! - Falls back to [`NO_TITLE`] when the element is missing or blank.
//!
//! ### Content
//! - Every text node outside `script`, `style`, `template` and `noscript`.
//! - Each node trimmed, blank nodes dropped, the rest joined with `\n`.
//! - Truncated to a character budget to bound storage.

pub mod normalize;

pub use normalize::{join_text_nodes, truncate_chars};

use scraper::{Html, Node, Selector, node::Element};

/// Title used when the document has none.
pub const NO_TITLE: &str = "No title found";

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template", "noscript"];

/// Title and text pulled from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: String,
    pub content: String,
}

/// Extract title and visible text, keeping at most `max_chars` characters of text.
pub fn extract_page(html: &str, max_chars: usize) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage { title: extract_title(&document), content: truncate_chars(extract_text(&document), max_chars) }
}

fn extract_title(document: &Html) -> String {
    let selector = Selector::parse("title").expect("invalid selector");

    document
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

fn is_hidden(element: &Element) -> bool {
    HIDDEN_ELEMENTS.contains(&element.name())
}

fn extract_text(document: &Html) -> String {
    let nodes = document.tree.root().descendants().filter_map(|node| match node.value() {
        Node::Text(text) => {
            let hidden = node.ancestors().any(|a| a.value().as_element().is_some_and(is_hidden));
            (!hidden).then_some(&**text)
        }
        _ => None,
    });

    join_text_nodes(nodes)
}
