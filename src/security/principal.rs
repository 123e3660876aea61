//! The authenticated caller.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use serde::Serialize;

use crate::directory::ResolvedUser;

pub const READ_ONLY: &str = "READ_ONLY";
pub const READ_WRITE: &str = "READ_WRITE";

/// Authority prefix that always grants the bare role name.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Identity and authorities attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// The identity exactly as presented in the header, trimmed.
    pub identity: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub roles: Vec<String>,
    /// Prefixes that, stripped from an authority, grant the remaining role.
    #[serde(skip)]
    pub grant_prefixes: Vec<String>,
}

/// The caller lacks every role the operation accepts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Access Denied")]
pub struct AccessDenied {
    pub required: Vec<String>,
}

fn grants(authority: &str, role: &str, prefixes: &[String]) -> bool {
    authority == role
        || prefixes
            .iter()
            .any(|prefix| authority.strip_prefix(prefix.as_str()) == Some(role))
}

impl Principal {
    pub fn new(identity: impl Into<String>, user: ResolvedUser) -> Self {
        Self {
            identity: identity.into(),
            given_name: user.given_name,
            surname: user.surname,
            roles: user.roles,
            grant_prefixes: vec![ROLE_PREFIX.to_string()],
        }
    }

    /// Replace the authority prefixes that grant bare roles.
    pub fn with_grant_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.grant_prefixes = prefixes;
        self
    }

    /// `Given Surname`, or the identity when no name is known.
    pub fn display_name(&self) -> String {
        match (&self.given_name, &self.surname) {
            (Some(given), Some(surname)) => format!("{} {}", given, surname),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self.identity.clone(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .iter()
            .any(|authority| grants(authority, role, &self.grant_prefixes))
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Succeed if the caller holds at least one of `roles`.
    pub fn require_any_role(&self, roles: &[&str]) -> Result<(), AccessDenied> {
        if self.has_any_role(roles) {
            Ok(())
        } else {
            tracing::warn!(identity = %self.identity, required = ?roles, held = ?self.roles, "Access denied");
            Err(AccessDenied {
                required: roles.iter().map(|r| r.to_string()).collect(),
            })
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: &[&str]) -> Principal {
        Principal::new(
            "cn=John Doe,dc=corp",
            ResolvedUser {
                dn: "cn=John Doe,dc=corp".to_string(),
                given_name: Some("John".to_string()),
                surname: Some("Doe".to_string()),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        )
    }

    #[test]
    fn test_bare_and_prefixed_authorities() {
        assert!(principal(&["READ_ONLY"]).has_role(READ_ONLY));
        assert!(principal(&["ROLE_READ_ONLY"]).has_role(READ_ONLY));
        assert!(!principal(&["ACME_READ_WRITE"]).has_role(READ_WRITE));
        assert!(!principal(&["READ_ONLY"]).has_role(READ_WRITE));
        assert!(!principal(&["XREAD_ONLY"]).has_role(READ_ONLY));
    }

    #[test]
    fn test_configured_grant_prefix() {
        let prefixes = vec![ROLE_PREFIX.to_string(), "CORP_".to_string()];
        let writer = principal(&["CORP_READ_WRITE"]).with_grant_prefixes(prefixes.clone());
        assert!(writer.has_role(READ_WRITE));
        assert!(!writer.has_role(READ_ONLY));

        let other = principal(&["ACME_READ_WRITE"]).with_grant_prefixes(prefixes);
        assert!(!other.has_role(READ_WRITE));
    }

    #[test]
    fn test_any_role() {
        let reader = principal(&["READ_ONLY"]);
        assert!(reader.require_any_role(&[READ_ONLY, READ_WRITE]).is_ok());

        let err = reader.require_any_role(&[READ_WRITE]).unwrap_err();
        assert_eq!(err.required, vec!["READ_WRITE".to_string()]);
    }

    #[test]
    fn test_no_roles_is_denied() {
        assert!(principal(&[]).require_any_role(&[READ_ONLY, READ_WRITE]).is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(principal(&[]).display_name(), "John Doe");

        let mut anonymous = principal(&[]);
        anonymous.given_name = None;
        anonymous.surname = None;
        assert_eq!(anonymous.display_name(), "cn=John Doe,dc=corp");
    }
}
