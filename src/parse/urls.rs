use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use url::Url;

use super::Draft;

static SCHEME_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[a-z][a-z0-9+.\-]*://\S+").unwrap());

static WWW_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bwww\.\S+").unwrap());

static BARE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}/\S*")
        .unwrap()
});

static HAS_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://").unwrap());

/// A URL found in free text.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundUrl {
    /// Byte range of the literal text that matched.
    pub span: Range<usize>,
    pub url: Url,
}

/// Prefix `https://` when the text carries no scheme.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if HAS_SCHEME_RE.is_match(raw) {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// Normalize and parse; `None` for anything that is not an absolute URL with a host.
pub fn parse_url(raw: &str) -> Option<Url> {
    let url = Url::parse(&normalize_url(raw)).ok()?;
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url)
}

/// Every URL-like substring of `text`, in order of appearance.
///
/// Matches from the three patterns are de-overlapped before parsing: when two
/// matches overlap, the one starting first (then the longer one) is kept.
pub fn find_urls(text: &str) -> Vec<FoundUrl> {
    let mut spans: Vec<Range<usize>> = [&*SCHEME_URL_RE, &*WWW_URL_RE, &*BARE_URL_RE]
        .into_iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.range()))
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut found = Vec::new();
    let mut covered_to = 0;
    for span in spans {
        if span.start < covered_to {
            continue;
        }
        covered_to = span.end;

        let span = span.start..span.start + trim_trailing_punctuation(&text[span.clone()]).len();
        let raw = &text[span.clone()];
        match parse_url(raw) {
            Some(url) => found.push(FoundUrl { span, url }),
            None => log::warn!("Discarding malformed URL: {}", raw),
        }
    }
    found
}

/// Drop sentence punctuation glued to the end of a match. Closing brackets stay when balanced.
fn trim_trailing_punctuation(raw: &str) -> &str {
    let mut s = raw;
    loop {
        let Some(last) = s.chars().last() else {
            return s;
        };
        let trim = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' => true,
            ')' => s.matches(')').count() > s.matches('(').count(),
            ']' => s.matches(']').count() > s.matches('[').count(),
            _ => false,
        };
        if !trim {
            return s;
        }
        s = &s[..s.len() - last.len_utf8()];
    }
}

/// Collect URLs into the draft's links and cut their literal text out of the title.
pub fn extract(mut draft: Draft) -> Draft {
    let found = find_urls(&draft.text);
    if found.is_empty() {
        return draft;
    }

    let mut text = draft.text.clone();
    for f in found.iter().rev() {
        text.replace_range(f.span.clone(), "");
    }
    draft.text = text;
    draft
        .fields
        .links
        .extend(found.into_iter().map(|f| f.url.to_string()));
    draft
}
