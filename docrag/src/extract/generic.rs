//! Best-effort fallback extraction for files with no dedicated extractor.
//!
//! HTML has its markup stripped. Zipped formats such as `.pptx` or `.xlsx`
//! are not unpacked: only printable runs of the compressed bytes survive,
//! which is rarely useful text. Register a dedicated [`Extractor`] for them.

use std::path::Path;

use super::{Extractor, read_bytes};
use crate::document::DocumentFormat;
use crate::error::{RagError, Result};

/// Shortest run of printable characters kept from a binary file.
const MIN_RUN_CHARS: usize = 4;

/// Best-effort fallback for formats without a dedicated extractor.
///
/// UTF-8 files are returned unchanged, except `.html`/`.htm` files, which
/// are reduced to their visible text. For anything else the printable runs
/// of at least four characters are harvested from the raw bytes and joined
/// with newlines, in the manner of `strings(1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericExtractor;

impl Extractor for GenericExtractor {
    fn name(&self) -> &str {
        "generic"
    }

    fn can_handle(&self, _format: DocumentFormat) -> bool {
        true
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let bytes = read_bytes(path)?;
        let bytes = match String::from_utf8(bytes) {
            Ok(text) if is_html(path) => return Ok(html_text(&text)),
            Ok(text) => return Ok(text),
            Err(e) => e.into_bytes(),
        };

        let text = printable_runs(&String::from_utf8_lossy(&bytes));
        if text.is_empty() {
            return Err(RagError::extraction(path, "no readable text found in binary file"));
        }
        Ok(text)
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Elements whose content is never visible text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "head"];

/// Tags that end a line of visible text.
const BLOCK_TAGS: &[&str] =
    &["p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "title", "section"];

/// Drop tags and comments, skip hidden elements, decode common entities,
/// and keep one line per block element.
fn html_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..open]));
        let tail = &rest[open..];

        if let Some(comment) = tail.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        let Some(close) = tail.find('>') else {
            rest = "";
            break;
        };
        let name = tag_name(&tail[1..close]);
        rest = &tail[close + 1..];

        if HIDDEN_ELEMENTS.contains(&name.as_str()) && !tail[1..].starts_with('/') {
            let end_tag = format!("</{name}");
            let lower = rest.to_ascii_lowercase();
            rest = match lower.find(&end_tag) {
                Some(end) => rest[end..].find('>').map_or("", |gt| &rest[end + gt + 1..]),
                None => "",
            };
            continue;
        }
        if BLOCK_TAGS.contains(&name.as_str()) {
            out.push('\n');
        }
    }
    out.push_str(&decode_entities(rest));

    out.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
}

/// Lower-cased element name of a tag body such as `/p` or `div class="x"`.
fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn printable_runs(text: &str) -> String {
    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut flush = |current: &mut String| {
        let trimmed = current.trim();
        if trimmed.chars().count() >= MIN_RUN_CHARS {
            runs.push(trimmed.to_string());
        }
        current.clear();
    };

    for ch in text.chars() {
        if ch == char::REPLACEMENT_CHARACTER || (ch.is_control() && ch != '\t') {
            flush(&mut current);
        } else {
            current.push(ch);
        }
    }
    flush(&mut current);

    runs.join("\n")
}
