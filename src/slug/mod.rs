//! URL-safe identifier derivation for category names and article titles.
//!
//! Only ASCII letters and digits survive; everything else (including non-ASCII
//! characters, which are not transliterated) becomes a hyphen separator.

use crate::errors::AppError;

/// Derive a slug from a display string.
///
/// Returns `None` when nothing alphanumeric is left after stripping.
pub fn slugify(text: &str) -> Option<String> {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Derive a slug, reporting an empty result as a validation error on `field`.
pub fn require_slug(field: &str, text: &str) -> Result<String, AppError> {
    slugify(text).ok_or_else(|| {
        AppError::Validation(format!(
            "{} must contain at least one letter or digit",
            field
        ))
    })
}

/// Append a disambiguator to an already-derived slug.
pub fn with_disambiguator(slug: &str, disambiguator: impl std::fmt::Display) -> String {
    format!("{}-{}", slug, disambiguator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_well_formed(slug: &str) -> bool {
        !slug.is_empty()
            && !slug.starts_with('-')
            && !slug.ends_with('-')
            && !slug.contains("--")
            && slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    #[test]
    fn test_basic_title() {
        assert_eq!(slugify("Hello World").as_deref(), Some("hello-world"));
    }

    #[test]
    fn test_collapses_punctuation_runs() {
        assert_eq!(
            slugify("  Rust -- async / await!!  ").as_deref(),
            Some("rust-async-await")
        );
    }

    #[test]
    fn test_non_ascii_is_stripped() {
        assert_eq!(slugify("Café Über 2024").as_deref(), Some("caf-ber-2024"));
    }

    #[test]
    fn test_all_punctuation_is_empty() {
        assert_eq!(slugify("!!! ... ---"), None);
        assert_eq!(slugify(""), None);
        assert!(matches!(
            require_slug("Title", "???"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_idempotent_and_well_formed() {
        let inputs = [
            "Tech",
            "A  B\tC",
            "-leading and trailing-",
            "Numbers 123 and UPPER",
            "emoji 🚀 launch",
            "snake_case_title",
            "über-ünïcödé",
            "x",
        ];
        for input in inputs {
            let Some(once) = slugify(input) else {
                continue;
            };
            assert!(is_well_formed(&once), "bad slug {:?} from {:?}", once, input);
            assert_eq!(slugify(&once).as_deref(), Some(once.as_str()));
        }
    }

    #[test]
    fn test_disambiguator() {
        assert_eq!(
            with_disambiguator("hello-world", 1700000000000u64),
            "hello-world-1700000000000"
        );
        let slug = with_disambiguator("hello-world", 42);
        assert_eq!(slugify(&slug).as_deref(), Some(slug.as_str()));
    }
}
