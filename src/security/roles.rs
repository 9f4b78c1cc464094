//! Users, roles and the role hierarchy.

use std::collections::{HashMap, HashSet, VecDeque};

/// The user abstraction consulted by authenticators.
pub trait User: Send + Sync {
    /// Returns true once the user has logged in.
    fn is_authenticated(&self) -> bool;

    /// Roles granted directly to the user.
    fn roles(&self) -> &[String];
}

/// Context attached to requests by whatever layer authenticates the session.
#[derive(Clone, Debug, Default)]
pub struct SessionUser {
    pub name: String,
    pub roles: Vec<String>,
    pub authenticated: bool,
}

impl SessionUser {
    /// An authenticated user holding `roles`.
    pub fn authenticated<I, S>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            authenticated: true,
        }
    }

    /// A visitor without a session.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl User for SessionUser {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }
}

/// Maps a role to the sub-roles it implies.
///
/// Expansion is transitive and tolerates cycles in the configuration.
#[derive(Clone, Debug, Default)]
pub struct RoleHierarchy {
    implied: HashMap<String, Vec<String>>,
}

impl RoleHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `role` implies each of `sub_roles`.
    pub fn with_role<I, S>(mut self, role: impl Into<String>, sub_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implied
            .entry(role.into())
            .or_default()
            .extend(sub_roles.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.implied.is_empty()
    }

    /// `roles` plus every role they imply, directly or indirectly.
    pub fn expand<'a, I>(&self, roles: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<&str> = roles.into_iter().map(String::as_str).collect();

        while let Some(role) = queue.pop_front() {
            if !seen.insert(role.to_string()) {
                continue;
            }
            if let Some(subs) = self.implied.get(role) {
                queue.extend(subs.iter().map(String::as_str));
            }
        }
        seen
    }
}

impl From<HashMap<String, Vec<String>>> for RoleHierarchy {
    fn from(implied: HashMap<String, Vec<String>>) -> Self {
        Self { implied }
    }
}
