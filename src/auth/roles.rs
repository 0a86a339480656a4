//! Role gate for dashboard content.
//!
//! Roles are Entra ID app roles, read from the `roles` claim of the ID token.
//! Content behind a guard is left out of the view entirely when the gate
//! denies it.

/// True when any allowed role is present. Empty on either side denies.
pub fn is_allowed<A, P>(allowed_roles: &[A], present_roles: &[P]) -> bool
where
    A: AsRef<str>,
    P: AsRef<str>,
{
    allowed_roles.iter().any(|allowed| {
        present_roles
            .iter()
            .any(|present| present.as_ref() == allowed.as_ref())
    })
}

/// A named set of app roles that may see a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGuard {
    allowed: &'static [&'static str],
}

impl RoleGuard {
    pub const ADMIN: RoleGuard = RoleGuard::new(&["Admin"]);
    pub const EDITORS: RoleGuard = RoleGuard::new(&["Editor", "Admin"]);
    pub const READERS: RoleGuard = RoleGuard::new(&["Reader", "User", "Admin"]);

    pub const fn new(allowed: &'static [&'static str]) -> Self {
        Self { allowed }
    }

    #[must_use]
    pub fn permits<P: AsRef<str>>(&self, present_roles: &[P]) -> bool {
        is_allowed(self.allowed, present_roles)
    }
}
