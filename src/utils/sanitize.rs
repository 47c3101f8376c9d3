//! Filename sanitization utilities

/// Maximum length (in characters) of a sanitized base filename
pub const MAX_FILENAME_CHARS: usize = 200;

/// Sanitize a track title into a filesystem-safe base filename
///
/// Each of `< > : " / \ | ? *` becomes `_`, whitespace runs collapse to a
/// single space, leading and trailing spaces and dots are stripped and the
/// result is capped at [`MAX_FILENAME_CHARS`] characters.
///
/// # Examples
///
/// ```
/// use tunepress::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c*d?e"), "a_b_c_d_e");
/// assert_eq!(sanitize_filename("  Intro...  "), "Intro");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    collapsed
        .trim_matches(|c| c == ' ' || c == '.')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_reserved_characters() {
        assert_eq!(sanitize_filename("a/b:c*d?e"), "a_b_c_d_e");
        assert_eq!(sanitize_filename("<\"x\"|y>\\z"), "__x___y__z");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(sanitize_filename("Song \t  Title\n(Live)"), "Song Title (Live)");
    }

    #[test]
    fn test_strip_spaces_and_dots() {
        assert_eq!(sanitize_filename(" ..Hidden Track.. "), "Hidden Track");
        assert_eq!(sanitize_filename("..."), "");
    }

    #[test]
    fn test_truncate_long_title() {
        let title = "x".repeat(300);
        assert_eq!(sanitize_filename(&title).chars().count(), 200);
    }

    #[test]
    fn test_truncate_counts_characters() {
        let title = "é".repeat(250);
        let sanitized = sanitize_filename(&title);
        assert_eq!(sanitized.chars().count(), 200);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_no_changes_needed() {
        assert_eq!(sanitize_filename("Normal Track Name"), "Normal Track Name");
    }
}
