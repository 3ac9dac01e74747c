//! User accounts.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A parent tracking their own children
    Parent,
    /// A supervisor (teacher) managing rooms of children
    Supervisor,
}

impl Role {
    /// Stable string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Supervisor => "supervisor",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent" => Ok(Role::Parent),
            "supervisor" => Ok(Role::Supervisor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,

    /// Login name
    pub username: String,

    /// Contact email
    pub email: String,

    /// Argon2 password hash; never serialized out
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Account role
    pub role: Role,
}
