use serde::{Deserialize, Serialize};

use tourbook_core::UserId;

use crate::Role;

/// A verified caller: identity plus the roles asserted by the identity provider.
///
/// This core trusts the claims it is handed; it never issues or re-verifies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn is_elevated(&self) -> bool {
        self.roles.iter().any(Role::is_elevated)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }
}
