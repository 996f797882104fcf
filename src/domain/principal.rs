//! Principal - the identity on whose behalf a tool executes.

use serde::{Deserialize, Serialize};

use super::foundation::PrincipalId;

/// The caller's identity as seen by tools.
///
/// Authentication happens upstream; this type only carries its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: PrincipalId,
    email: String,
    username: String,
    authenticated: bool,
    roles: Vec<String>,
}

impl Principal {
    /// Creates an authenticated principal with no roles.
    pub fn authenticated(
        id: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: PrincipalId::new(id),
            email: email.into(),
            username: username.into(),
            authenticated: true,
            roles: Vec::new(),
        }
    }

    /// Creates an anonymous principal.
    pub fn anonymous() -> Self {
        Self {
            id: PrincipalId::new("anonymous"),
            email: String::new(),
            username: "anonymous".to_string(),
            authenticated: false,
            roles: Vec::new(),
        }
    }

    /// Adds a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn id(&self) -> &PrincipalId {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// True if the principal holds at least one of `allowed`.
    ///
    /// An empty `allowed` list admits everyone.
    pub fn has_any_role(&self, allowed: &[String]) -> bool {
        allowed.is_empty() || allowed.iter().any(|r| self.roles.contains(r))
    }

    /// The JSON payload every tool backend receives.
    pub fn invocation_payload(&self, parameters: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "principal_id": self.id.as_str(),
            "principal_email": self.email,
            "principal_username": self.username,
            "parameters": parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn anonymous_is_not_authenticated() {
        assert!(!Principal::anonymous().is_authenticated());
    }

    #[test]
    fn empty_allowed_roles_admit_everyone() {
        let p = Principal::authenticated("1", "a@b.c", "alice");
        assert!(p.has_any_role(&[]));
    }

    #[test]
    fn allowed_roles_require_a_match() {
        let p = Principal::authenticated("1", "a@b.c", "alice").with_role("member");
        assert!(p.has_any_role(&["admin".into(), "member".into()]));
        assert!(!p.has_any_role(&["admin".into()]));
    }

    #[test]
    fn invocation_payload_has_identity_and_parameters() {
        let p = Principal::authenticated("42", "a@b.c", "alice");
        let payload = p.invocation_payload(&json!({"mood": 4}));

        assert_eq!(payload["principal_id"], "42");
        assert_eq!(payload["principal_email"], "a@b.c");
        assert_eq!(payload["principal_username"], "alice");
        assert_eq!(payload["parameters"]["mood"], 4);
    }
}
