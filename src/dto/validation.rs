//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest user identifier accepted from clients.
const MAX_USER_ID_LEN: usize = 128;

/// Validates a caller-supplied user identifier: non-empty, bounded, no whitespace or control characters.
pub fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_USER_ID_LEN {
        let mut err = ValidationError::new("user_id_length");
        err.message = Some(
            format!(
                "User ID must be 1 to {MAX_USER_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        let mut err = ValidationError::new("user_id_format");
        err.message = Some("User ID must not contain whitespace or control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a timestamp is RFC 3339 with an explicit offset.
pub fn validate_rfc3339(value: &str) -> Result<(), ValidationError> {
    super::parse_system_time(value).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("rfc3339");
        err.message = Some("Expected an RFC 3339 timestamp, e.g. 2026-03-01T18:30:00Z".into());
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_provider_style_ids() {
        assert!(validate_user_id("auth0|5f7c8ec7c33c6c004bbafe82").is_ok());
        assert!(validate_user_id("a").is_ok());
    }

    #[test]
    fn rejects_empty_or_oversized_ids() {
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id(&"x".repeat(MAX_USER_ID_LEN + 1)).is_err());
    }

    #[test]
    fn rejects_whitespace() {
        assert!(validate_user_id("john doe").is_err());
        assert!(validate_user_id("tab\tbed").is_err());
    }

    #[test]
    fn rfc3339_requires_an_offset() {
        assert!(validate_rfc3339("2026-03-01T18:30:00Z").is_ok());
        assert!(validate_rfc3339("2026-03-01 18:30").is_err());
    }
}
