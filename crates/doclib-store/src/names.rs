//! Validation of display names, tag categories and tag keys.
//!
//! A display name is used verbatim as a link filename in `titles/` and in
//! every tag directory, and is stored on a single line of the properties
//! file. Valid names:
//! - Must be non-empty
//! - Must not be `.` or `..`
//! - Must not contain `/`, NUL, or any control character
//! - Must not start or end with whitespace (the property codec trims it)
//!
//! Categories and tag keys end up in `tags.<category>=a,b` lines. Both follow
//! the same rules as names, and additionally a category must not contain `=`
//! and a tag key must not contain `,`.

use crate::error::{StoreError, StoreResult};

/// Characters that are forbidden anywhere in a display name.
const FORBIDDEN_CHARS: &[char] = &['/', '\0'];

/// Forbidden in a category; `=` ends a property key.
const CATEGORY_FORBIDDEN_CHARS: &[char] = &['/', '\0', '='];

/// Forbidden in a tag key; `,` separates the keys of one category.
const TAG_FORBIDDEN_CHARS: &[char] = &['/', '\0', ','];

fn invalid(name: &str, reason: impl Into<String>) -> StoreError {
    StoreError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a display name, returning `Ok(())` if it can be stored and
/// linked.
///
/// # Examples
///
/// ```
/// use doclib_store::names::validate_name;
///
/// assert!(validate_name("Annual report 2023.pdf").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("a/b").is_err());
/// ```
pub fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }

    if name == "." || name == ".." {
        return Err(invalid(name, "name must not be '.' or '..'"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
        }
    }

    if name.chars().any(char::is_control) {
        return Err(invalid(name, "contains a control character"));
    }

    if name.trim() != name {
        return Err(invalid(name, "must not start or end with whitespace"));
    }

    Ok(())
}

/// Validate a tag category, as found in a directory name or a `tags.` key.
pub fn validate_category(category: &str) -> StoreResult<()> {
    match component_problem(category, CATEGORY_FORBIDDEN_CHARS) {
        Some(reason) => Err(StoreError::InvalidCategory {
            category: category.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Validate a tag key of `category`.
pub fn validate_tag(category: &str, tag: &str) -> StoreResult<()> {
    match component_problem(tag, TAG_FORBIDDEN_CHARS) {
        Some(reason) => Err(StoreError::InvalidTag {
            category: category.to_string(),
            tag: tag.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn component_problem(value: &str, forbidden: &[char]) -> Option<String> {
    if value.is_empty() {
        return Some("must not be empty".into());
    }
    if let Some(ch) = value.chars().find(|ch| forbidden.contains(ch)) {
        return Some(format!("contains forbidden character: {ch:?}"));
    }
    if value.chars().any(char::is_control) {
        return Some("contains a control character".into());
    }
    if value.trim() != value {
        return Some("must not start or end with whitespace".into());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_name("doc1").is_ok());
        assert!(validate_name("Some paper (2021).pdf").is_ok());
        assert!(validate_name("...hidden").is_ok());
        assert!(validate_name("ünïcödé").is_ok());
    }

    #[test]
    fn empty_name_is_invalid() {
        assert!(matches!(
            validate_name(""),
            Err(StoreError::InvalidName { .. })
        ));
    }

    #[test]
    fn dot_names_are_invalid() {
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn path_separator_is_invalid() {
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("/abs").is_err());
    }

    #[test]
    fn control_characters_are_invalid() {
        assert!(validate_name("line\nbreak").is_err());
        assert!(validate_name("nul\0").is_err());
        assert!(validate_name("tab\there").is_err());
    }

    #[test]
    fn surrounding_whitespace_is_invalid() {
        assert!(validate_name(" padded").is_err());
        assert!(validate_name("padded ").is_err());
        assert!(validate_name("inner space").is_ok());
    }

    #[test]
    fn categories() {
        assert!(validate_category("topic").is_ok());
        assert!(validate_category("Year, fiscal").is_ok());
        assert!(matches!(
            validate_category("a=b"),
            Err(StoreError::InvalidCategory { .. })
        ));
        assert!(validate_category("").is_err());
        assert!(validate_category(" topic").is_err());
        assert!(validate_category("to\npic").is_err());
    }

    #[test]
    fn tag_keys() {
        assert!(validate_tag("topic", "rust").is_ok());
        assert!(validate_tag("topic", "a=b").is_ok());
        assert!(matches!(
            validate_tag("topic", "c,d"),
            Err(StoreError::InvalidTag { .. })
        ));
        assert!(validate_tag("topic", "").is_err());
        assert!(validate_tag("topic", " padded").is_err());
        assert!(validate_tag("topic", "padded ").is_err());
    }
}
