use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three parties of a deposit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Agent,
    Renter,
    Landlord,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Agent, Role::Renter, Role::Landlord];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::Renter => "renter",
            Role::Landlord => "landlord",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0}, must be one of: agent, renter, landlord")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Role::Agent),
            "renter" => Ok(Role::Renter),
            "landlord" => Ok(Role::Landlord),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// A user is identified by email *and* role; one person may hold several roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserKey {
    pub email: String,
    pub role: Role,
}

impl UserKey {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self { email: email.into(), role }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.email, self.role)
    }
}

/// Represents a registered user in the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub role: Role,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn key(&self) -> UserKey {
        UserKey::new(self.email.clone(), self.role)
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.email.clone(), self.role)
    }
}

/// Payload for registering a user. A missing name is derived from the email.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub email: String,
    pub role: Role,
    pub name: Option<String>,
}

/// Payload for updating an existing user.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
}

/// Who is performing an operation: an identity (email) acting in a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self { email: email.into(), role }
    }

    pub fn agent(email: impl Into<String>) -> Self {
        Self::new(email, Role::Agent)
    }

    pub fn renter(email: impl Into<String>) -> Self {
        Self::new(email, Role::Renter)
    }

    pub fn landlord(email: impl Into<String>) -> Self {
        Self::new(email, Role::Landlord)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.email, self.role)
    }
}

/// Turns `jane.doe_smith@example.com` into `Jane Doe Smith`.
pub fn display_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    local
        .split(['.', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Loose shape check: one `@`, something before it, a dotted domain after it.
pub fn looks_like_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    match candidate.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("Landlord".parse::<Role>(), Ok(Role::Landlord));
        assert_eq!(" AGENT ".parse::<Role>(), Ok(Role::Agent));
        assert_eq!("tenant".parse::<Role>(), Err(ParseRoleError("tenant".to_string())));
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Renter).unwrap(), "\"renter\"");
        let parsed: Role = serde_json::from_str("\"landlord\"").unwrap();
        assert_eq!(parsed, Role::Landlord);
    }

    #[test]
    fn test_display_name_from_email() {
        assert_eq!(display_name_from_email("jane.doe_smith@example.com"), "Jane Doe Smith");
        assert_eq!(display_name_from_email("r@x.com"), "R");
        assert_eq!(display_name_from_email("BOB@x.com"), "Bob");
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("agent@x.com"));
        assert!(!looks_like_email("agent@localhost"));
        assert!(!looks_like_email("@x.com"));
        assert!(!looks_like_email("a b@x.com"));
        assert!(!looks_like_email("a@b@x.com"));
    }

    #[test]
    fn test_user_key_display() {
        assert_eq!(UserKey::new("a@x.com", Role::Renter).to_string(), "a@x.com#renter");
    }
}
