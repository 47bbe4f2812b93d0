//! Turn fetched bytes into bounded clean text plus title/description.
//!
//! Parsing goes through `scraper` (html5ever), which accepts any input and
//! always yields a tree, so nothing in here fails.

use scraper::{Html, Node, Selector};
use siphon_common::{ExtractedContent, NO_TITLE};

/// Appended when text is cut at the length limit.
pub const TRUNCATION_MARKER: &str = "... [content truncated]";

/// Subtrees whose text never reaches the output. `noscript` is included
/// because html5ever keeps its body as raw markup text.
const EXCLUDED_ELEMENTS: [&str; 6] = ["script", "style", "nav", "header", "footer", "noscript"];

/// Clean text and metadata from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtract {
    pub title: String,
    pub description: String,
    pub text: String,
    /// Characters in `text`, truncation marker included.
    pub text_length: usize,
}

impl PageExtract {
    pub fn into_content(
        self,
        url: impl Into<String>,
        final_url: impl Into<String>,
    ) -> ExtractedContent {
        ExtractedContent {
            url: url.into(),
            final_url: final_url.into(),
            title: self.title,
            description: self.description,
            text: self.text,
            text_length: self.text_length,
        }
    }
}

/// Bytes to text; invalid UTF-8 sequences are dropped, as is a leading BOM.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    match out.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => out,
    }
}

/// Parse once and pull metadata and text from the same document.
///
/// ```
/// use siphon_web::extract::extract_page;
///
/// let page = extract_page(
///     "<html><head><title>T</title></head><body><script>bad()</script><p>Hello  World</p></body></html>",
///     10_000,
/// );
/// assert_eq!(page.title, "T");
/// assert!(page.text.contains("Hello World"));
/// assert!(!page.text.contains("bad()"));
/// ```
pub fn extract_page(html: &str, max_text_length: usize) -> PageExtract {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let description = extract_description(&document);
    let text = truncate_text(collapse_whitespace(&visible_text(&document)), max_text_length);
    let text_length = text.chars().count();

    tracing::trace!(
        html_len = html.len(),
        text_length,
        has_description = !description.is_empty(),
        "extract.page"
    );

    PageExtract {
        title,
        description,
        text,
        text_length,
    }
}

/// Concatenate every text node in document order, skipping excluded subtrees.
///
/// Walks with an explicit stack so deeply nested markup cannot exhaust the
/// call stack.
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    let mut stack = vec![document.tree.root()];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if EXCLUDED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) | Node::Document | Node::Fragment => {
                stack.extend(node.children().rev());
            }
            _ => {}
        }
    }

    out
}

/// Two-level collapse: per line, then per double-space run.
///
/// Lines are trimmed, each line is split on `"  "`, fragments are trimmed,
/// empties dropped, and survivors joined with a single space.
///
/// ```
/// use siphon_web::extract::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("  a  \n\n  b   c \r\n d"), "a b c d");
/// ```
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split(is_line_boundary)
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep the first `max` characters and mark the cut.
pub fn truncate_text(mut text: String, max: usize) -> String {
    if let Some((cut, _)) = text.char_indices().nth(max) {
        text.truncate(cut);
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

/// First `<title>`, trimmed, or the [`NO_TITLE`] sentinel.
pub fn extract_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_else(|| NO_TITLE.to_string())
}

/// `content` of the first `<meta name="description">`, or empty.
pub fn extract_description(document: &Html) -> String {
    let Ok(sel) = Selector::parse("meta[name]") else {
        return String::new();
    };
    document
        .select(&sel)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
        })
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
        .unwrap_or_default()
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0b}'
            | '\u{0c}'
            | '\u{1c}'
            | '\u{1d}'
            | '\u{1e}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}
