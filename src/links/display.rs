//! Short forms of a URL for list rows.

use url::Url;

use crate::core::link::domain_of;

pub const DEFAULT_MAX_LEN: usize = 50;

/// `url` if it fits in `max_len`, otherwise the domain and path, the path
/// truncated with `...` when even that is too long.
pub fn shorten_url(url: &str, max_len: usize) -> String {
    if url.chars().count() <= max_len {
        return url.to_string();
    }
    let Ok(parsed) = Url::parse(url) else {
        return format!("{}...", take_chars(url, max_len.saturating_sub(3)));
    };

    let domain = domain_of(&parsed);
    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }

    let room = max_len.saturating_sub(domain.chars().count());
    if path.chars().count() > room.saturating_sub(5) {
        format!("{}{}...", domain, take_chars(&path, room.saturating_sub(8)))
    } else {
        format!("{}{}", domain, path)
    }
}

/// Which service a link points at, for badges.
pub fn link_type_label(url: &str) -> &'static str {
    let url = url.to_ascii_lowercase();
    if url.contains("docs.google.com/document") {
        "Google Doc"
    } else if url.contains("docs.google.com/spreadsheets") || url.contains("sheets.google.com") {
        "Google Sheet"
    } else if url.contains("figma.com") {
        "Figma"
    } else if url.contains("clickup.com") {
        "ClickUp"
    } else if url.contains("notion.so") {
        "Notion"
    } else if url.contains("github.com") {
        "GitHub"
    } else {
        "Link"
    }
}

fn take_chars(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(i, _)| &s[..i])
}
