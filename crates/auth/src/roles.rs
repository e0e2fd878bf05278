use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried in verified claims.
///
/// Roles are opaque strings; only `staff` and `admin` carry meaning in this
/// core (they unlock privileged booking operations and the operational
/// broadcast groups).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const STAFF: Role = Role::from_static("staff");
    pub const ADMIN: Role = Role::from_static("admin");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Staff and admin may act on bookings they do not own.
    pub fn is_elevated(&self) -> bool {
        matches!(self.as_str(), "staff" | "admin")
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
