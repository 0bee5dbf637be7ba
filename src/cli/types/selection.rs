//! How rounds are matched to a player's rows during duration allocation.

use crate::error::PipelineError;
use std::fmt;
use std::str::FromStr;

/// Strategy for picking which of a match's rounds belong to a player.
///
/// `ModeMask` keeps every round whose map type appears among the modes the
/// player was recorded in. It can pick the wrong rounds when a mode repeats and
/// the player sat one of them out; in that case the match fails allocation
/// instead of being silently misassigned. `RoundIndex` uses the round position
/// recorded during extraction and does not have that ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoundSelection {
    #[default]
    ModeMask,
    RoundIndex,
}

impl fmt::Display for RoundSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundSelection::ModeMask => "mode-mask",
            RoundSelection::RoundIndex => "round-index",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RoundSelection {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mode-mask" | "mode" => Ok(RoundSelection::ModeMask),
            "round-index" | "index" => Ok(RoundSelection::RoundIndex),
            _ => Err(PipelineError::InvalidRoundSelection {
                value: s.to_string(),
            }),
        }
    }
}
