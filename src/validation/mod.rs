//! Input validation and sanitization.
//!
//! Every check runs before any store or media call. Store-level constraints
//! (unique names and slugs) still back these up under concurrent writes.

use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::slug;

pub const CATEGORY_NAME_MIN: usize = 3;
pub const CATEGORY_NAME_MAX: usize = 50;
pub const CATEGORY_DESCRIPTION_MAX: usize = 500;
pub const ARTICLE_TITLE_MIN: usize = 5;
pub const ARTICLE_TITLE_MAX: usize = 200;
pub const ARTICLE_DESCRIPTION_MIN: usize = 20;
pub const ARTICLE_CATEGORY_MAX: usize = 50;
pub const COMMENT_TEXT_MAX: usize = 1000;
pub const COMMENT_USER_MAX: usize = 50;
pub const ANONYMOUS_COMMENTER: &str = "Anonymous";

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Accumulates field errors for one payload.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a non-blank value with a character count in `min..=max`.
    pub fn length(
        &mut self,
        field: &str,
        label: &str,
        value: &str,
        min: usize,
        max: Option<usize>,
    ) {
        let len = value.chars().count();
        if len == 0 {
            self.errors
                .push(FieldError::new(field, format!("{} is required", label)));
        } else if len < min {
            self.errors.push(FieldError::new(
                field,
                format!("{} must be at least {} characters", label, min),
            ));
        } else if let Some(max) = max {
            if len > max {
                self.errors.push(FieldError::new(
                    field,
                    format!("{} cannot exceed {} characters", label, max),
                ));
            }
        }
    }

    /// Optional value: only checked when present.
    pub fn max_length(&mut self, field: &str, label: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.errors.push(FieldError::new(
                    field,
                    format!("{} cannot exceed {} characters", label, max),
                ));
            }
        }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(self.errors))
        }
    }
}

/// Trim a single-line value and drop every control character.
pub fn sanitize_line(value: &str) -> String {
    value.trim().chars().filter(|c| !c.is_control()).collect()
}

/// Trim a multi-line value, keeping newlines and tabs but no other control characters.
pub fn sanitize_text(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Parse a record identifier, reporting malformed ids as validation errors.
pub fn parse_id(kind: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("Invalid {} ID format", kind)))
}

/// Checks for a category. `None` name means it is not being changed.
pub fn validate_category(name: Option<&str>, description: Option<&str>) -> Result<(), AppError> {
    let mut v = Validator::new();
    if let Some(name) = name {
        v.length("name", "Category name", name, CATEGORY_NAME_MIN, Some(CATEGORY_NAME_MAX));
    }
    v.max_length(
        "description",
        "Description",
        description,
        CATEGORY_DESCRIPTION_MAX,
    );
    v.finish()
}

/// Checks for the text fields of an article.
///
/// `None` means "not being changed" on updates; creates pass every field.
pub fn validate_article(
    title: Option<&str>,
    description: Option<&str>,
    category: Option<&str>,
) -> Result<(), AppError> {
    let mut v = Validator::new();
    if let Some(title) = title {
        v.length("title", "Title", title, ARTICLE_TITLE_MIN, Some(ARTICLE_TITLE_MAX));
        if title.chars().count() >= ARTICLE_TITLE_MIN && slug::slugify(title).is_none() {
            v.push("title", "Title must contain at least one letter or digit");
        }
    }
    if let Some(description) = description {
        v.length(
            "description",
            "Description",
            description,
            ARTICLE_DESCRIPTION_MIN,
            None,
        );
    }
    if let Some(category) = category {
        v.length("category", "Category", category, 1, Some(ARTICLE_CATEGORY_MAX));
    }
    v.finish()
}

/// Checks for a new comment. Expects already-sanitized input.
pub fn validate_comment(user: &str, text: &str) -> Result<(), AppError> {
    let mut v = Validator::new();
    v.length("text", "Comment text", text, 1, Some(COMMENT_TEXT_MAX));
    v.max_length("user", "User name", Some(user), COMMENT_USER_MAX);
    v.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: AppError) -> Vec<String> {
        match err {
            AppError::InvalidFields(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    #[test]
    fn test_category_name_bounds() {
        assert!(validate_category(Some("Tech"), None).is_ok());
        assert_eq!(fields(validate_category(Some("ab"), None).unwrap_err()), ["name"]);
        assert_eq!(
            fields(validate_category(Some("x".repeat(51).as_str()), None).unwrap_err()),
            ["name"]
        );
        assert_eq!(
            fields(validate_category(None, Some("d".repeat(501).as_str())).unwrap_err()),
            ["description"]
        );
        assert!(validate_category(None, Some("Short blurb")).is_ok());
    }

    #[test]
    fn test_article_create_collects_all_errors() {
        let err = validate_article(Some("Hey"), Some("too short"), Some("")).unwrap_err();
        assert_eq!(fields(err), ["title", "description", "category"]);
    }

    #[test]
    fn test_article_title_needs_slug_characters() {
        let err = validate_article(Some("?!?!?!"), None, None).unwrap_err();
        assert_eq!(fields(err), ["title"]);
        assert!(validate_article(Some("Ünïcödé 42"), None, None).is_ok());
    }

    #[test]
    fn test_article_partial_update_skips_absent_fields() {
        assert!(validate_article(None, None, None).is_ok());
        assert!(validate_article(Some("A valid title"), None, None).is_ok());
    }

    #[test]
    fn test_comment_text_bounds() {
        assert!(validate_comment("Ann", "Nice post").is_ok());
        assert_eq!(fields(validate_comment("Ann", "").unwrap_err()), ["text"]);
        assert_eq!(
            fields(validate_comment("Ann", &"a".repeat(1001)).unwrap_err()),
            ["text"]
        );
        assert!(validate_comment("Ann", &"a".repeat(1000)).is_ok());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_line("  Ann\u{0007} "), "Ann");
        assert_eq!(sanitize_text(" line one\nline\ttwo\u{0000} "), "line one\nline\ttwo");
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("article", &id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_id("article", "not-an-id"),
            Err(AppError::Validation(msg)) if msg == "Invalid article ID format"
        ));
    }
}
