use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    /// Email not yet verified
    Unverified,
    Blocked,
}

/// A user's role set
pub type Roles = BTreeSet<Role>;

impl Role {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Unverified => "UNVERIFIED",
            Role::Blocked => "BLOCKED",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ADMIN" => Some(Role::Admin),
            "UNVERIFIED" => Some(Role::Unverified),
            "BLOCKED" => Some(Role::Blocked),
            _ => None,
        }
    }

    /// Parse stored role codes, dropping (and logging) unknown ones
    pub fn parse_all<I, S>(codes: I) -> Roles
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        codes
            .into_iter()
            .filter_map(|code| {
                let code = code.as_ref();
                let role = Role::from_code(code);
                if role.is_none() {
                    tracing::error!(code = %code, "Ignoring unknown role code");
                }
                role
            })
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_codes() {
        for role in [Role::Admin, Role::Unverified, Role::Blocked] {
            assert_eq!(Role::from_code(role.code()), Some(role));
        }
        assert_eq!(Role::from_code("admin"), None);
    }

    #[test]
    fn test_parse_all_skips_unknown() {
        let roles = Role::parse_all(["ADMIN", "SUPERUSER", "BLOCKED"]);
        assert_eq!(roles, Roles::from([Role::Admin, Role::Blocked]));
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Unverified).unwrap(), r#""UNVERIFIED""#);
        let role: Role = serde_json::from_str(r#""ADMIN""#).unwrap();
        assert_eq!(role, Role::Admin);
    }
}
