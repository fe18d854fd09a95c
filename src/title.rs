//! Title canonicalization.
//!
//! Every title-accepting write path stores `sanitize_title(input)`. Reads
//! look titles up as given; the case-insensitive collation on the `page`
//! table handles case, nothing else is rewritten on the way in.

/// Maps spaces to underscores and drops every character outside
/// `[A-Za-z0-9_]`.
///
/// ```
/// assert_eq!(revwiki::title::sanitize_title("My Page!"), "My_Page");
/// ```
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// True if `title` is already in canonical form.
pub fn is_sanitized(title: &str) -> bool {
    title.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_spaces_become_underscores() {
        assert_eq!(sanitize_title("Intro Guide"), "Intro_Guide");
    }

    #[test]
    fn test_punctuation_is_dropped() {
        assert_eq!(sanitize_title("My Page!"), "My_Page");
        assert_eq!(sanitize_title("a/b\\c.d"), "abcd");
        assert_eq!(sanitize_title("C++ & Rust?"), "C__Rust");
    }

    #[test]
    fn test_non_ascii_is_dropped() {
        assert_eq!(sanitize_title("Café Über"), "Caf_ber");
    }

    #[test]
    fn test_tabs_are_not_spaces() {
        assert_eq!(sanitize_title("a\tb"), "ab");
    }

    #[test]
    fn test_only_symbols_sanitize_to_empty() {
        assert_eq!(sanitize_title("!!!"), "");
        assert_eq!(sanitize_title(""), "");
    }

    #[test]
    fn test_is_sanitized() {
        assert!(is_sanitized("Intro_Guide_2"));
        assert!(!is_sanitized("Intro Guide"));
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(input in any::<String>()) {
            let once = sanitize_title(&input);
            prop_assert_eq!(sanitize_title(&once), once.clone());
        }

        #[test]
        fn sanitize_output_is_canonical(input in "[ -~]{0,40}") {
            prop_assert!(is_sanitized(&sanitize_title(&input)));
        }

        #[test]
        fn sanitize_keeps_canonical_titles(input in "[A-Za-z0-9_]{1,40}") {
            prop_assert_eq!(sanitize_title(&input), input);
        }
    }
}
