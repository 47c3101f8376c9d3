//! Track URL validation

use regex::Regex;
use std::sync::LazyLock;

/// Accepted URL shapes; each captures an 11 character video id that must not
/// run on into further id characters.
static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"^(?:https?://)?(?:www\.)?youtu\.be/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"^(?:https?://)?(?:www\.)?youtube\.com/embed/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"^(?:https?://)?(?:www\.)?youtube\.com/v/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Extract the video id from a track URL in one of the accepted forms
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check that a URL has one of the accepted shapes (watch page, short link,
/// embed or direct `/v/` link). Pure string check, no network.
pub fn validate_url(url: &str) -> bool {
    extract_video_id(url).is_some()
}
