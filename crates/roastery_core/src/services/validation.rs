//! Field checks shared by the form-backed services.

use crate::ports::{PortError, PortResult};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_MESSAGE_LEN: usize = 5000;

/// Basic `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let Some(local) = parts.next() else {
        return false;
    };
    let Some(domain) = parts.next() else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Trims and lowercases an email, rejecting malformed input.
pub fn normalize_email(email: &str) -> PortResult<String> {
    let email = email.trim().to_lowercase();
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(PortError::InvalidInput("Please enter a valid email address".to_string()))
    }
}

pub fn validate_password(password: &str) -> PortResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Accepts `+`, spaces, dashes and parentheses around at least 7 digits.
pub fn validate_phone(phone: &str) -> PortResult<()> {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if allowed && digits >= 7 {
        Ok(())
    } else {
        Err(PortError::InvalidInput("Please enter a valid phone number".to_string()))
    }
}

/// Rejects blank required fields, naming the first one missing.
pub fn require_filled(fields: &[(&str, &str)]) -> PortResult<()> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(PortError::InvalidInput(format!("{name} is required"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ayse@example.com"));
        assert!(!is_valid_email("ayse@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ayse example@example.com"));
        assert_eq!(normalize_email("  Ayse@Example.COM ").unwrap(), "ayse@example.com");
    }

    #[test]
    fn phone_numbers() {
        assert!(validate_phone("+90 555 111 22 33").is_ok());
        assert!(validate_phone("(0212) 555-1122").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("+90 555 CALL ME").is_err());
    }

    #[test]
    fn required_fields_name_the_first_blank() {
        let err = require_filled(&[("name", "Ayşe"), ("message", "  ")]).unwrap_err();
        assert_eq!(err, PortError::InvalidInput("message is required".to_string()));
    }
}
