//! Topic name validation.
//!
//! Topics are named rendezvous channels; peers that agree on a name meet
//! there. Names are opaque to the relay beyond these structural checks.

/// Maximum topic name length in bytes.
pub const MAX_TOPIC_NAME_LENGTH: usize = 512;

/// Validate a topic name.
///
/// # Errors
///
/// Returns a static message describing why the name was rejected.
pub fn validate_topic_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("topic name cannot be empty");
    }
    if name.len() > MAX_TOPIC_NAME_LENGTH {
        return Err("topic name too long");
    }
    if name.chars().any(|c| c.is_control()) {
        return Err("topic name contains control characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_topic_name("room-1").is_ok());
        assert!(validate_topic_name("signal:lobby/west").is_ok());
        assert!(validate_topic_name("日本語の部屋").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(validate_topic_name("").is_err());
        assert!(validate_topic_name("line\nbreak").is_err());
        assert!(validate_topic_name("nul\0byte").is_err());

        let long = "a".repeat(MAX_TOPIC_NAME_LENGTH + 1);
        assert!(validate_topic_name(&long).is_err());
    }
}
