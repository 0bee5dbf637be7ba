//! ID types for FACEIT matches and championships.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type-safe wrapper for FACEIT match identifiers.
///
/// FACEIT match ids are opaque strings such as `1-6f3b...`. Wrapping them keeps
/// them from being mixed up with nicknames, map ids or championship ids, all of
/// which are strings in the upstream payloads too.
///
/// # Examples
///
/// ```rust
/// use faceit_ow::MatchId;
///
/// let id = MatchId::new("1-abc");
/// assert_eq!(id.as_str(), "1-abc");
/// assert_eq!(id.to_string(), "1-abc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MatchId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::Input {
                message: "match id must not be empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Type-safe wrapper for FACEIT championship identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChampionshipId(pub String);

impl ChampionshipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChampionshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChampionshipId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::Input {
                message: "championship id must not be empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}
