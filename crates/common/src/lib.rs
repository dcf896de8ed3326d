pub mod logging;
pub mod password;
pub mod settings;

pub use logging::init_logging;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::TrackTime => true,
            Capability::Administer => matches!(self, Role::Admin),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Record and inspect one's own attendance.
    TrackTime,
    /// Cross-user listings and promotion.
    Administer,
}

/// The caller as resolved from an authenticated session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: Uuid, username: String, role: Role) -> Self {
        Self { id, username, role }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}
