//! Overwatch hero roles.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role a player queued as for one round.
///
/// Upstream stats carry the role as free text under `"Role"`. Anything other than
/// the three known roles (including a missing value) becomes [`Role::Unknown`],
/// which leaves the value-score weights unadjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    Tank,
    Damage,
    Support,
    #[default]
    Unknown,
}

impl Role {
    /// Parse upstream role text, falling back to `Unknown` instead of failing.
    pub fn from_upstream(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or(Role::Unknown)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Tank => "Tank",
            Role::Damage => "Damage",
            Role::Support => "Support",
            Role::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Role {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tank" => Ok(Role::Tank),
            "damage" | "dps" => Ok(Role::Damage),
            "support" => Ok(Role::Support),
            "unknown" => Ok(Role::Unknown),
            _ => Err(PipelineError::InvalidRole {
                role: s.to_string(),
            }),
        }
    }
}
