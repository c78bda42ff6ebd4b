use serde::{Deserialize, Serialize};

/// Role of an authenticated caller.
///
/// Roles gate two things in the core: who may flip the shortage policy
/// (`Admin`) and which sale records a live subscriber receives (`Teller`
/// sees only their own).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Teller,
}

impl Role {
    /// Whether this role may change the process-wide shortage policy.
    pub fn may_change_policy(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Teller => "teller",
        };
        f.write_str(s)
    }
}

impl core::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "teller" => Ok(Role::Teller),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
