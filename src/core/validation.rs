//! Validation for account fields submitted at signup and login
//!
//! Every validator returns the normalized value it accepted, so callers store
//! exactly what was checked.

use crate::core::auth::Role;
use crate::core::auth::password::validate_password_strength;

/// Maximum length of an email address (RFC 5321)
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length of a first or last name
pub const MAX_NAME_LENGTH: usize = 100;

/// Allowed number of digits in a phone number
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

/// Field validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be at most {1} characters long")]
    TooLong(&'static str, usize),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("{0} contains invalid characters")]
    InvalidName(&'static str),

    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("{0}")]
    WeakPassword(&'static str),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Role {0} cannot be chosen at signup")]
    RoleNotAllowed(Role),

    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}

/// Trim and lower-case an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an email address and return its normalized form
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = normalize_email(email);

    if email.is_empty() {
        return Err(ValidationError::Required("email"));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or(ValidationError::InvalidEmail)?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(email)
}

/// Validate a first or last name and return it trimmed
pub fn validate_name(field: &'static str, name: &str) -> Result<String, ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required(field));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field, MAX_NAME_LENGTH));
    }

    // Letters plus the separators real names use
    if !name
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.'))
    {
        return Err(ValidationError::InvalidName(field));
    }

    Ok(name.to_string())
}

/// Validate an optional phone number.
///
/// Blank input counts as absent.
pub fn validate_phone(phone: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let body = phone.strip_prefix('+').unwrap_or(phone);

    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidPhone);
    }

    let digits = body.chars().filter(char::is_ascii_digit).count();
    if !PHONE_DIGITS.contains(&digits) {
        return Err(ValidationError::InvalidPhone);
    }

    Ok(Some(phone.to_string()))
}

/// Validate a new password
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    validate_password_strength(password).map_err(ValidationError::WeakPassword)
}

/// Resolve the role requested at signup; absent or blank means `PATIENT`
pub fn validate_signup_role(role: Option<&str>) -> Result<Role, ValidationError> {
    let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::default(),
        Some(name) => {
            Role::parse(name).ok_or_else(|| ValidationError::UnknownRole(name.to_string()))?
        }
    };

    if !role.is_self_assignable() {
        return Err(ValidationError::RoleNotAllowed(role));
    }

    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert_eq!(validate_email("a@x.com").unwrap(), "a@x.com");
        assert_eq!(
            validate_email("  Jane.Doe@Clinic.ORG ").unwrap(),
            "jane.doe@clinic.org"
        );
        assert!(validate_email("user+tag@example.co.uk").is_ok());
    }

    #[test]
    fn test_validate_email_invalid() {
        assert_eq!(validate_email(""), Err(ValidationError::Required("email")));
        assert_eq!(validate_email("   "), Err(ValidationError::Required("email")));
        assert_eq!(validate_email("invalid"), Err(ValidationError::InvalidEmail));
        assert_eq!(
            validate_email("@example.com"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(validate_email("user@"), Err(ValidationError::InvalidEmail));
        assert_eq!(
            validate_email("user@example"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_email("user@@example.com"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_email("user@.com"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_email("us er@example.com"),
            Err(ValidationError::InvalidEmail)
        );
    }

    #[test]
    fn test_validate_email_too_long() {
        let email = format!("{}@x.com", "a".repeat(MAX_EMAIL_LENGTH));
        assert_eq!(
            validate_email(&email),
            Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH))
        );
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("firstName", " Ana ").unwrap(), "Ana");
        assert!(validate_name("lastName", "O'Brien-Smith").is_ok());
        assert!(validate_name("lastName", "Müller").is_ok());

        assert_eq!(
            validate_name("firstName", ""),
            Err(ValidationError::Required("firstName"))
        );
        assert_eq!(
            validate_name("firstName", "R2D2"),
            Err(ValidationError::InvalidName("firstName"))
        );
        assert_eq!(
            validate_name("lastName", &"a".repeat(101)),
            Err(ValidationError::TooLong("lastName", MAX_NAME_LENGTH))
        );
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone(None).unwrap(), None);
        assert_eq!(validate_phone(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_phone(Some("+1 (555) 010-2030")).unwrap(),
            Some("+1 (555) 010-2030".to_string())
        );

        assert_eq!(
            validate_phone(Some("12345")),
            Err(ValidationError::InvalidPhone)
        );
        assert_eq!(
            validate_phone(Some("555-CALL-NOW")),
            Err(ValidationError::InvalidPhone)
        );
        assert_eq!(
            validate_phone(Some("++15550102030")),
            Err(ValidationError::InvalidPhone)
        );
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret123").is_ok());
        assert!(matches!(
            validate_password("short1"),
            Err(ValidationError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_validate_signup_role() {
        assert_eq!(validate_signup_role(None).unwrap(), Role::Patient);
        assert_eq!(validate_signup_role(Some(" ")).unwrap(), Role::Patient);
        assert_eq!(validate_signup_role(Some("DOCTOR")).unwrap(), Role::Doctor);
        assert_eq!(validate_signup_role(Some("doctor")).unwrap(), Role::Doctor);
        assert_eq!(
            validate_signup_role(Some("ADMIN")),
            Err(ValidationError::RoleNotAllowed(Role::Admin))
        );
        assert_eq!(
            validate_signup_role(Some("nurse")),
            Err(ValidationError::UnknownRole("nurse".to_string()))
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::Required("email").to_string(),
            "email is required"
        );
        assert_eq!(
            ValidationError::RoleNotAllowed(Role::Admin).to_string(),
            "Role ADMIN cannot be chosen at signup"
        );
    }
}
