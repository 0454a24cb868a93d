//! Plain text extraction from fetched markup.
use lazy_static::lazy_static;
use scraper::{Html, Selector};

lazy_static! {
    static ref TITLE_SELECTOR: Selector = Selector::parse("title").unwrap();
    static ref TEXT_SELECTOR: Selector = Selector::parse("h1, h2, h3, h4, h5, h6, p, a").unwrap();
    static ref DESCRIPTION_SELECTOR: Selector =
        Selector::parse(r#"meta[name="description"]"#).unwrap();
}

/// The searchable content of a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub text: String,
    pub description: Option<String>,
}

/// Extract the title, body text and meta description from raw markup.
///
/// Body text is the [sanitized](sanitize) text of every heading, paragraph and anchor element in
/// document order, concatenated without a separator. Parsing never fails: malformed markup is
/// recovered by the HTML5 parser and at worst produces empty fields.
pub fn extract(markup: &str) -> Extracted {
    let document = Html::parse_document(markup);

    let title = document
        .select(&TITLE_SELECTOR)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string();

    let text = document
        .select(&TEXT_SELECTOR)
        .map(|el| sanitize(&el.text().collect::<String>()))
        .collect::<String>();

    let description = document
        .select(&DESCRIPTION_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(ToString::to_string);

    Extracted {
        title,
        text,
        description,
    }
}

/// Keep only ASCII letters, digits and spaces, collapse space runs to one and trim.
///
/// Whitespace other than a plain space is dropped, not converted, so `"a\nb"` becomes `"ab"`.
pub fn sanitize(input: &str) -> String {
    let kept: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
