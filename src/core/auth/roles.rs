//! Portal roles
//!
//! Every account carries exactly one role. Roles are stored as the PostgreSQL
//! enum `user_role` and travel inside access tokens.

use serde::{Deserialize, Serialize};

/// Role of a portal account
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Patient,
    Doctor,
    Admin,
}

impl Role {
    /// All roles, in declaration order
    pub const ALL: [Role; 3] = [Role::Patient, Role::Doctor, Role::Admin];

    /// Parse a role name, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PATIENT" => Some(Role::Patient),
            "DOCTOR" => Some(Role::Doctor),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Whether an account may pick this role for itself at signup
    pub fn is_self_assignable(&self) -> bool {
        !matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "PATIENT",
            Role::Doctor => "DOCTOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("patient"), Some(Role::Patient));
        assert_eq!(Role::parse("DOCTOR"), Some(Role::Doctor));
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("nurse"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Doctor).unwrap(), r#""DOCTOR""#);

        let parsed: Role = serde_json::from_str(r#""PATIENT""#).unwrap();
        assert_eq!(parsed, Role::Patient);

        assert!(serde_json::from_str::<Role>(r#""patient""#).is_err());
    }

    #[test]
    fn test_role_display_matches_wire_name() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role));
        }
    }

    #[test]
    fn test_self_assignable_roles() {
        assert!(Role::Patient.is_self_assignable());
        assert!(Role::Doctor.is_self_assignable());
        assert!(!Role::Admin.is_self_assignable());
    }

    #[test]
    fn test_default_role_is_patient() {
        assert_eq!(Role::default(), Role::Patient);
    }
}
