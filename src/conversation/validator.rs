//! Ordered text validators for conversation steps.
//!
//! Each step defines an ordered validator list; the first failing check
//! produces the reply message key and the step does not advance.

use lazy_regex::regex;

use crate::core::config::validation;

/// Translation key of the first failing validator, if any.
pub type ValidationError = &'static str;

fn not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err("text.not_blank");
    }
    Ok(())
}

fn single_line(text: &str) -> Result<(), ValidationError> {
    if text.contains('\n') || text.contains('\r') {
        return Err("text.single_line");
    }
    Ok(())
}

fn allowed_chars(text: &str) -> Result<(), ValidationError> {
    // Brackets, quotes and control characters never appear in a legitimate
    // username, phone number, link or name. URL punctuation stays allowed.
    let forbidden = regex!(r#"[(){}\[\]<>;"`]"#);
    if forbidden.is_match(text) || text.chars().any(char::is_control) {
        return Err("text.allowed_chars");
    }
    Ok(())
}

fn min_length(text: &str, min: usize) -> Result<(), ValidationError> {
    if text.chars().count() < min {
        return Err("text.min_length");
    }
    Ok(())
}

fn max_length(text: &str, max: usize) -> Result<(), ValidationError> {
    if text.chars().count() > max {
        return Err("text.max_length");
    }
    Ok(())
}

/// Validates free-text input at the search-term step.
pub fn validate_search_term(text: &str) -> Result<(), ValidationError> {
    not_blank(text)?;
    single_line(text)?;
    allowed_chars(text)?;
    min_length(text, validation::MIN_SEARCH_TERM_LENGTH)?;
    max_length(text, validation::MAX_SEARCH_TERM_LENGTH)?;
    Ok(())
}

/// Validates free-text input at the feedback description step.
pub fn validate_description(text: &str) -> Result<(), ValidationError> {
    not_blank(text)?;
    max_length(text, validation::MAX_DESCRIPTION_LENGTH)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fails_first() {
        assert_eq!(validate_search_term(""), Err("text.not_blank"));
        assert_eq!(validate_search_term("   "), Err("text.not_blank"));
    }

    #[test]
    fn multiline_fails() {
        assert_eq!(validate_search_term("john\ndoe"), Err("text.single_line"));
        assert_eq!(validate_search_term("john\r\ndoe"), Err("text.single_line"));
    }

    #[test]
    fn forbidden_chars_fail() {
        assert_eq!(validate_search_term("john (doe)"), Err("text.allowed_chars"));
        assert_eq!(validate_search_term("a<script>"), Err("text.allowed_chars"));
    }

    #[test]
    fn length_bounds() {
        assert_eq!(validate_search_term("i"), Err("text.min_length"));
        let long = "i".repeat(257);
        assert_eq!(validate_search_term(&long), Err("text.max_length"));
    }

    #[test]
    fn url_punctuation_is_allowed() {
        assert_eq!(validate_search_term("https://t.me/john_doe?start=1"), Ok(()));
        assert_eq!(validate_search_term("+380 67 123 45 67"), Ok(()));
        assert_eq!(validate_search_term("john.doe@example.com"), Ok(()));
    }

    #[test]
    fn validators_run_in_order() {
        // Blank beats every later check, even combined failures
        assert_eq!(validate_search_term(""), Err("text.not_blank"));
        // A multiline forbidden-chars input reports the line check first
        assert_eq!(validate_search_term("(a)\n(b)"), Err("text.single_line"));
    }
}
