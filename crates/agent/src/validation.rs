//! Inbound message validation and sanitization.

use std::sync::OnceLock;

use regex::Regex;

use wayfarer_core::config::defaults;
use wayfarer_core::Error;

/// Why an inbound message was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("\"message\" is not allowed to be empty")]
    Empty,

    #[error("\"message\" length must be less than or equal to {max} characters long")]
    TooLong { max: usize },
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err.to_string())
    }
}

struct Patterns {
    script: Regex,
    javascript: Regex,
    handler: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        script: Regex::new(r"(?is)<script\b.*?</script>").unwrap(),
        javascript: Regex::new(r"(?i)javascript:").unwrap(),
        handler: Regex::new(r"(?i)on\w+\s*=").unwrap(),
    })
}

/// Strip script blocks, `javascript:` schemes and inline event handlers, then trim.
pub fn sanitize_text(text: &str) -> String {
    let p = patterns();
    let text = p.script.replace_all(text, "");
    let text = p.javascript.replace_all(&text, "");
    let text = p.handler.replace_all(&text, "");
    text.trim().to_string()
}

/// Check the trimmed message is between 1 and the configured maximum characters.
pub fn validate_message(text: &str) -> Result<&str, ValidationError> {
    validate_message_with(text, defaults::MAX_MESSAGE_LENGTH)
}

pub fn validate_message_with(text: &str, max: usize) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { max });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_scripts() {
        assert_eq!(sanitize_text("<script>alert(1)</script>Hello"), "Hello");
        assert_eq!(
            sanitize_text("a<SCRIPT type=\"x\">\nsteal()\n</script>b"),
            "ab"
        );
    }

    #[test]
    fn test_sanitize_removes_handlers_and_schemes() {
        assert_eq!(
            sanitize_text("  <img src=x onerror=boom> click JavaScript:go() "),
            "<img src=x boom> click go()"
        );
    }

    #[test]
    fn test_validate_message() {
        assert_eq!(validate_message("  hi there ").unwrap(), "hi there");
        assert_eq!(validate_message(" \n\t ").unwrap_err(), ValidationError::Empty);

        let long = "x".repeat(4001);
        assert_eq!(
            validate_message(&long).unwrap_err(),
            ValidationError::TooLong { max: 4000 }
        );
        assert!(validate_message(&"é".repeat(4000)).is_ok());
    }

    #[test]
    fn test_into_core_error() {
        let err: Error = ValidationError::Empty.into();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("Invalid message: "));
    }
}
