use regex::{Captures, Regex};
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;

use crate::extractor::error::ExtractorError;

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[inline]
pub fn capture_group_1_or_invalid_url<'a>(
    re: &Regex,
    input: &'a str,
) -> Result<&'a str, ExtractorError> {
    capture_group_1(re, input).ok_or_else(|| ExtractorError::InvalidUrl(input.to_string()))
}

/// Captures of the first pattern in `patterns` that matches `input`.
pub fn match_one_of<'a>(input: &'a str, patterns: &[&Regex]) -> Option<Captures<'a>> {
    patterns.iter().find_map(|re| re.captures(input))
}

/// Decodes the JSON object assigned in a page script.
///
/// `start` must match up to and including the opening brace, e.g.
/// `window\.__playinfo__\s*=\s*\{`. Exactly one value is read, whatever
/// script follows it is ignored.
pub fn parse_embedded_json<T: DeserializeOwned>(
    page: &str,
    start: &Regex,
    what: &'static str,
) -> Result<T, ExtractorError> {
    let m = start.find(page).ok_or(ExtractorError::PatternNotFound(what))?;
    let json = &page[m.end() - 1..];
    let value = serde_json::Deserializer::from_str(json)
        .into_iter::<T>()
        .next()
        .ok_or(ExtractorError::PatternNotFound(what))??;
    Ok(value)
}

/// Title of an HTML page: the first non-empty `<h1>`, then `og:title`, then `<title>`.
pub fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let text_of = |selector: &str| -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        doc.select(&sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|t| !t.is_empty())
    };

    if let Some(title) = text_of("h1") {
        return Some(title);
    }

    let og = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
    if let Some(title) = doc
        .select(&og)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|t| !t.is_empty())
    {
        return Some(title.to_string());
    }

    text_of("title")
}

/// Last path segment of `url` split into `(name, ext)`.
///
/// The extension is empty when the segment has none.
pub fn name_and_ext(url: &url::Url) -> (String, String) {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or_default();
    let segment = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    match segment.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() && !ext.is_empty() => {
            (name.to_string(), ext.to_ascii_lowercase())
        }
        _ => (segment, String::new()),
    }
}
