//! Principals and role groups
//!
//! A request runs on behalf of an optional [`Principal`]. `None` is the
//! anonymous caller.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Implicit group of every anonymous caller
pub const GUESTS: &str = "guests";

/// Implicit group of every authenticated caller
pub const MEMBERS: &str = "members";

/// Implicit group of administrators
pub const ADMINS: &str = "admins";

/// Identity used for all authorization decisions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// User identifier
    pub id: String,

    /// Explicit role names
    #[serde(default)]
    pub roles: BTreeSet<String>,

    /// Administrators read everything
    #[serde(default)]
    pub is_admin: bool,
}

impl Principal {
    /// Create an authenticated, non-admin principal
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
            is_admin: false,
        }
    }

    /// Create an administrator
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(id)
        }
    }

    /// Synthetic privileged principal for system-initiated queries
    pub fn system() -> Self {
        Self::admin("system")
    }

    /// Add a role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }
}

/// Whether the principal holds universal read access
pub fn is_admin(principal: Option<&Principal>) -> bool {
    principal.map(|p| p.is_admin).unwrap_or(false)
}

/// Effective groups of a principal
///
/// Anonymous callers are `{guests}`. Authenticated callers are `{members}`
/// plus their explicit roles, and administrators additionally `{admins}`.
pub fn role_groups(principal: Option<&Principal>) -> BTreeSet<String> {
    let mut groups = BTreeSet::new();
    match principal {
        None => {
            groups.insert(GUESTS.to_string());
        }
        Some(p) => {
            groups.insert(MEMBERS.to_string());
            groups.extend(p.roles.iter().cloned());
            if p.is_admin {
                groups.insert(ADMINS.to_string());
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_is_guest_only() {
        let groups = role_groups(None);
        assert_eq!(groups.len(), 1);
        assert!(groups.contains(GUESTS));
    }

    #[test]
    fn test_member_groups_include_roles() {
        let p = Principal::new("u1").with_role("editors");
        let groups = role_groups(Some(&p));

        assert!(groups.contains(MEMBERS));
        assert!(groups.contains("editors"));
        assert!(!groups.contains(GUESTS));
        assert!(!groups.contains(ADMINS));
    }

    #[test]
    fn test_admin_groups() {
        let p = Principal::admin("root");
        assert!(role_groups(Some(&p)).contains(ADMINS));
        assert!(is_admin(Some(&p)));
        assert!(!is_admin(None));
    }

    #[test]
    fn test_system_principal_is_admin() {
        assert!(Principal::system().is_admin);
    }

    #[test]
    fn test_principal_deserializes_camel_case() {
        let p: Principal =
            serde_json::from_str(r#"{"id": "u1", "roles": ["a"], "isAdmin": true}"#).unwrap();
        assert!(p.is_admin);
        assert!(p.roles.contains("a"));
    }
}
