//! Title slugs used by the public, title-addressed routes.
//!
//! Both the stored title and the requested key are normalized: lowercased,
//! with whitespace and `+` treated alike and collapsed into a single `+`.

pub fn normalize(title: &str) -> String {
    title
        .split(|c: char| c.is_whitespace() || c == '+')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("+")
}

pub fn matches(stored: &str, key: &str) -> bool {
    let key = normalize(key);
    !key.is_empty() && normalize(stored) == key
}

/// True when either language's title matches the key
pub fn matches_either(indonesian: &str, english: &str, key: &str) -> bool {
    matches(indonesian, key) || matches(english, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Foo Bar"), "foo+bar");
        assert_eq!(normalize("  Foo\t  Bar "), "foo+bar");
        assert_eq!(normalize("Foo+Bar"), "foo+bar");
        assert_eq!(normalize("Tahap ++ Dua"), "tahap+dua");
        assert_eq!(normalize("ÜBER Straße"), "über+straße");
    }

    #[test]
    fn test_lookup_keys_are_interchangeable() {
        for key in ["Foo Bar", "foo+bar", "Foo+Bar", "FOO  BAR"] {
            assert!(matches("Foo Bar", key), "{key}");
        }
        assert!(!matches("Foo Bar", "foo+baz"));
        assert!(!matches("", ""));
    }

    #[test]
    fn test_matches_either_language() {
        assert!(matches_either("Progres Pertama", "First Progress", "first+progress"));
        assert!(matches_either("Progres Pertama", "First Progress", "progres pertama"));
        assert!(!matches_either("Progres Pertama", "First Progress", "second"));
    }
}
