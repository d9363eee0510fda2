//! Character-name and mail-content validation

use std::collections::HashSet;

pub const NAME_MIN_LENGTH: usize = 3;
pub const NAME_MAX_LENGTH: usize = 20;
pub const SUBJECT_MAX_BYTES: usize = 120;
pub const BODY_MAX_BYTES: usize = 4000;

/// Character name validation errors with helpful messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("Name is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Name cannot contain consecutive spaces")]
    RepeatedSpaces,

    #[error("Name is reserved")]
    Reserved,
}

/// Mail content errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} too long (max {max_bytes} bytes)")]
    TooLong { field: &'static str, max_bytes: usize },
}

/// Get set of reserved names that should not be allowed
fn reserved_names() -> HashSet<&'static str> {
    [
        "admin", "administrator", "root", "system", "moderator", "gamemaster", "gm",
        "server", "staff", "support", "guest", "anonymous", "npc",
        "veylan", "urghan", "aureen", "camyra",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a character name and return it trimmed.
///
/// Letters (accented included), digits, single spaces, `_`, `-` and `'` are allowed.
pub fn validate_character_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();

    if length < NAME_MIN_LENGTH {
        return Err(NameError::TooShort { min: NAME_MIN_LENGTH });
    }
    if length > NAME_MAX_LENGTH {
        return Err(NameError::TooLong { max: NAME_MAX_LENGTH });
    }

    if reserved_names().contains(trimmed.to_lowercase().as_str()) {
        return Err(NameError::Reserved);
    }

    if trimmed.contains("  ") {
        return Err(NameError::RepeatedSpaces);
    }

    let invalid: HashSet<char> = trimmed
        .chars()
        .filter(|&c| !(c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' || c == '\''))
        .collect();
    if !invalid.is_empty() {
        let mut chars: Vec<char> = invalid.into_iter().collect();
        chars.sort_unstable();
        return Err(NameError::InvalidCharacters {
            chars: chars.into_iter().collect(),
        });
    }

    Ok(trimmed.to_string())
}

/// Sanitize message content (remove control characters, validate length)
pub fn sanitize_message_content(
    field: &'static str,
    content: &str,
    max_bytes: usize,
) -> Result<String, ContentError> {
    if content.len() > max_bytes {
        return Err(ContentError::TooLong { field, max_bytes });
    }

    // Keep newlines and tabs
    let sanitized: String = content
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .collect();

    if sanitized.trim().is_empty() {
        return Err(ContentError::Empty { field });
    }
    Ok(sanitized)
}

/// Validate a mail subject and body together.
pub fn validate_mail(subject: &str, body: &str) -> Result<(String, String), ContentError> {
    let subject = sanitize_message_content("Subject", subject.trim(), SUBJECT_MAX_BYTES)?;
    let body = sanitize_message_content("Body", body, BODY_MAX_BYTES)?;
    Ok((subject, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_name_validation() {
        assert_eq!(validate_character_name("  Martin ").unwrap(), "Martin");
        assert!(validate_character_name("José María").is_ok());
        assert!(validate_character_name("D'Arcy-2").is_ok());

        assert_eq!(validate_character_name("Al"), Err(NameError::TooShort { min: 3 }));
        assert!(matches!(
            validate_character_name(&"x".repeat(21)),
            Err(NameError::TooLong { .. })
        ));
        assert_eq!(validate_character_name("Two  Spaces"), Err(NameError::RepeatedSpaces));
        assert_eq!(validate_character_name("Admin"), Err(NameError::Reserved));
        assert_eq!(validate_character_name("urghan"), Err(NameError::Reserved));
    }

    #[test]
    fn test_invalid_characters_are_listed() {
        match validate_character_name("bad<name>") {
            Err(NameError::InvalidCharacters { chars }) => assert_eq!(chars, "<>"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(validate_character_name("../etc").is_err());
    }

    #[test]
    fn test_message_content_sanitization() {
        assert_eq!(
            sanitize_message_content("Body", "Hello world!", 100).unwrap(),
            "Hello world!"
        );

        let content_with_whitespace = "Line 1\nLine 2\tTabbed";
        assert_eq!(
            sanitize_message_content("Body", content_with_whitespace, 100).unwrap(),
            content_with_whitespace
        );

        let sanitized = sanitize_message_content("Body", "Hello\x00\x01\x02World", 100).unwrap();
        assert_eq!(sanitized, "HelloWorld");

        let long_content = "a".repeat(1000);
        assert!(sanitize_message_content("Body", &long_content, 100).is_err());
        assert_eq!(
            validate_mail("  ", "body"),
            Err(ContentError::Empty { field: "Subject" })
        );
    }
}
