// shelfmark link formatting
// Normalises user-entered URLs, tags and notes before they reach the store.

use url::Url;

use crate::types::errors::BookmarkError;

const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons?sz=128&domain=";

/// Returns true if the string starts with an `http://` or `https://` scheme.
fn has_http_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Prepends `https://` when the URL carries no http(s) scheme.
pub fn format_url(url: &str) -> String {
    let url = url.trim();
    if has_http_scheme(url) {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Parses a (possibly scheme-less) string as an http(s) URL that names a host.
pub fn parse_http_url(url: &str) -> Option<Url> {
    let formatted = format_url(url);
    // the parser silently drops tabs and newlines; a typed URL must not hold any
    if formatted.chars().any(char::is_whitespace) {
        return None;
    }
    let parsed = Url::parse(&formatted).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str().filter(|host| !host.is_empty())?;
    Some(parsed)
}

/// Host component of a (possibly scheme-less) URL, lowercased by the parser.
pub fn host_of(url: &str) -> Option<String> {
    parse_http_url(url).and_then(|u| u.host_str().map(str::to_string))
}

/// Checks whether a (possibly scheme-less) string would form a usable http(s) URL.
pub fn is_valid_url(url: &str) -> bool {
    parse_http_url(url).is_some()
}

/// Builds the favicon-service URL for a bookmark's host.
pub fn favicon_url(url: &str) -> Option<String> {
    host_of(url).map(|host| format!("{}{}", FAVICON_SERVICE, host))
}

/// Validates and formats a required URL field.
pub fn sanitize_url(url: &str) -> Result<String, BookmarkError> {
    if url.trim().is_empty() {
        return Err(BookmarkError::Validation("URL is required".to_string()));
    }
    if !is_valid_url(url) {
        return Err(BookmarkError::Validation("Please enter a valid URL".to_string()));
    }
    Ok(format_url(url))
}

/// Validates a required title field.
pub fn sanitize_title(title: &str) -> Result<String, BookmarkError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BookmarkError::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}

/// Trims tags, drops empty ones and removes duplicates, keeping first-seen order.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Blank notes are stored as `None`.
pub fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
