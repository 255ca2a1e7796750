use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use super::role::Role;

/// Non-empty set of roles an action accepts.
///
/// There is exactly one way to hand permitted roles to the guard: build a
/// `RoleSet` and pass it by reference. `new` takes the first role separately
/// so an empty set cannot be written in code; sets coming from configuration
/// go through `parse`, which rejects empty input and unknown names up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet {
    roles: BTreeSet<Role>,
}

/// Configuration-time failures building a `RoleSet`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleSetError {
    #[error("permitted-role set is empty")]
    Empty,

    #[error("unknown role '{0}' in permitted-role set")]
    UnknownRole(String),
}

impl RoleSet {
    pub fn new(first: Role, rest: impl IntoIterator<Item = Role>) -> Self {
        let mut roles = BTreeSet::from([first]);
        roles.extend(rest);
        Self { roles }
    }

    pub fn single(role: Role) -> Self {
        Self::new(role, [])
    }

    /// Every role is permitted.
    pub fn all() -> Self {
        Self {
            roles: Role::ALL.into_iter().collect(),
        }
    }

    /// Build a set from role names, e.g. the value of a `POLICY_*` variable.
    /// Blank entries are skipped; anything else must name a known role.
    pub fn parse<I, S>(names: I) -> Result<Self, RoleSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            let role = name
                .parse::<Role>()
                .map_err(|_| RoleSetError::UnknownRole(name.to_string()))?;
            roles.insert(role);
        }

        if roles.is_empty() {
            return Err(RoleSetError::Empty);
        }
        Ok(Self { roles })
    }

    /// Parse a comma separated list such as `"admin, editor"`.
    pub fn parse_list(value: &str) -> Result<Self, RoleSetError> {
        Self::parse(value.split(','))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Always false; a `RoleSet` holds at least one role.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.roles.iter().map(Role::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// Why the guard refused a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("no role present on the credential")]
    MissingCredential,

    #[error("role '{role}' is not permitted")]
    InsufficientPrivilege { role: String },
}

impl Denial {
    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::MissingCredential => "missing_credential",
            Denial::InsufficientPrivilege { .. } => "insufficient_privilege",
        }
    }
}

/// Decide whether a caller holding `caller` may perform an action that
/// permits `permitted`.
///
/// A blank role counts as absent. A role string that names no known role is
/// present but not permitted.
pub fn authorize(caller: Option<&str>, permitted: &RoleSet) -> Result<Role, Denial> {
    let raw = match caller.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(Denial::MissingCredential),
    };

    match raw.parse::<Role>() {
        Ok(role) if permitted.contains(role) => Ok(role),
        _ => Err(Denial::InsufficientPrivilege {
            role: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_or_editor() -> RoleSet {
        RoleSet::new(Role::Admin, [Role::Editor])
    }

    #[test]
    fn concrete_scenarios() {
        let permitted = admin_or_editor();
        assert_eq!(authorize(Some("admin"), &permitted), Ok(Role::Admin));
        assert_eq!(
            authorize(Some("viewer"), &permitted),
            Err(Denial::InsufficientPrivilege {
                role: "viewer".to_string()
            })
        );
        assert_eq!(authorize(None, &permitted), Err(Denial::MissingCredential));
    }

    #[test]
    fn members_are_allowed_and_non_members_denied() {
        let sets = [
            RoleSet::all(),
            admin_or_editor(),
            RoleSet::single(Role::Viewer),
            RoleSet::new(Role::Admin, [Role::Viewer]),
        ];
        for permitted in &sets {
            for role in Role::ALL {
                let result = authorize(Some(role.as_str()), permitted);
                if permitted.contains(role) {
                    assert_eq!(result, Ok(role), "{role} in {permitted}");
                } else {
                    assert_eq!(
                        result.unwrap_err().reason(),
                        "insufficient_privilege",
                        "{role} not in {permitted}"
                    );
                }
            }
        }
    }

    #[test]
    fn absent_or_blank_role_is_missing_credential() {
        for permitted in [RoleSet::all(), admin_or_editor()] {
            assert_eq!(authorize(None, &permitted), Err(Denial::MissingCredential));
            assert_eq!(authorize(Some(""), &permitted), Err(Denial::MissingCredential));
            assert_eq!(authorize(Some("   "), &permitted), Err(Denial::MissingCredential));
        }
    }

    #[test]
    fn order_of_permitted_roles_is_irrelevant() {
        let forward = RoleSet::new(Role::Admin, [Role::Editor, Role::Viewer]);
        let backward = RoleSet::new(Role::Viewer, [Role::Editor, Role::Admin]);
        let parsed = RoleSet::parse(["editor", "viewer", "admin"]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward, parsed);
        for role in Role::ALL {
            assert_eq!(
                authorize(Some(role.as_str()), &forward),
                authorize(Some(role.as_str()), &backward)
            );
        }
    }

    #[test]
    fn case_variants_are_equal() {
        let permitted = admin_or_editor();
        for caller in ["admin", "Admin", "ADMIN", " aDmIn "] {
            assert_eq!(authorize(Some(caller), &permitted), Ok(Role::Admin));
        }
        let permitted = RoleSet::parse(["ADMIN", "Editor"]).unwrap();
        assert_eq!(authorize(Some("editor"), &permitted), Ok(Role::Editor));
    }

    #[test]
    fn unknown_role_is_insufficient_not_missing() {
        let denial = authorize(Some("root"), &RoleSet::all()).unwrap_err();
        assert_eq!(
            denial,
            Denial::InsufficientPrivilege {
                role: "root".to_string()
            }
        );
    }

    #[test]
    fn parse_fails_fast_on_bad_configuration() {
        assert_eq!(RoleSet::parse(Vec::<String>::new()), Err(RoleSetError::Empty));
        assert_eq!(RoleSet::parse_list(" , "), Err(RoleSetError::Empty));
        assert_eq!(
            RoleSet::parse_list("admin,owner"),
            Err(RoleSetError::UnknownRole("owner".to_string()))
        );
    }

    #[test]
    fn displays_canonical_order() {
        let set = RoleSet::parse_list("viewer, ADMIN").unwrap();
        assert_eq!(set.to_string(), "admin,viewer");
        assert_eq!(set.len(), 2);
    }
}
