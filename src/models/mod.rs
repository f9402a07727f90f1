pub mod activity;
pub mod link;
pub mod participant;
pub mod trip;

use std::str::FromStr;

use lettre::Address;

use crate::error::AppError;

/// Fails when `value` is empty or only whitespace.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn validate_email(field: &str, value: &str) -> Result<(), AppError> {
    require_text(field, value)?;
    Address::from_str(value.trim())
        .map(|_| ())
        .map_err(|err| AppError::invalid(format!("{field} is not a valid email: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(require_text("title", "  ").is_err());
        assert!(require_text("title", "Louvre").is_ok());
    }

    #[test]
    fn emails_must_have_a_domain() {
        assert!(validate_email("email", "a@x.com").is_ok());
        assert!(validate_email("email", "not-an-email").is_err());
        assert!(validate_email("email", "").is_err());
    }
}
