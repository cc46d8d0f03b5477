use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::ContentExtractor;
use crate::{Error, Result};

const TEXT_WIDTH: usize = 120;

/// Containers tried in order; the first one with enough text wins
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    "#content",
    ".post-content",
    ".entry-content",
    "body",
];

/// Minimum characters a container needs before it is preferred over `body`
const MIN_CONTAINER_CHARS: usize = 200;

/// Picks the main content container of a page and renders it as plain text
#[derive(Debug, Default, Clone)]
pub struct ReadableExtractor;

impl ReadableExtractor {
    pub fn new() -> Self {
        Self
    }

    fn main_container<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
        let mut fallback = None;

        for css in CONTENT_SELECTORS {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            for element in document.select(&selector) {
                let chars: usize = element.text().map(|t| t.trim().len()).sum();
                if chars >= MIN_CONTAINER_CHARS {
                    return Some(element);
                }
                if fallback.is_none() && chars > 0 {
                    fallback = Some(element);
                }
            }
        }

        fallback
    }
}

impl ContentExtractor for ReadableExtractor {
    fn extract(&self, html: &str) -> Result<String> {
        let document = Html::parse_document(html);

        // Plain-text summaries parse into an empty-ish tree; keep them as they are
        let fragment = match Self::main_container(&document) {
            Some(element) => element.html(),
            None if html.trim().is_empty() => return Ok(String::new()),
            None => html.to_string(),
        };

        let text = html2text::from_read(fragment.as_bytes(), TEXT_WIDTH)
            .map_err(|e| Error::Extraction(e.to_string()))?;

        Ok(strip_noise(&text))
    }
}

/// html2text's link footnotes, e.g. `[3]: https://example.com/x`
static LINK_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\d+\]: \S+$").expect("valid link reference pattern"));

/// Drop the link footnotes html2text appends and trim trailing whitespace
fn strip_noise(text: &str) -> String {
    text.lines()
        .filter(|line| !LINK_REFERENCE.is_match(line.trim()))
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
