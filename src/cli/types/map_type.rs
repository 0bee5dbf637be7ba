//! Map types and their scoring conventions.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse category of an Overwatch map.
///
/// The map type decides how a round's recorded points translate into playing
/// time: Control rounds are recorded at half weight and Hybrid rounds are
/// recorded one point short per faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MapType {
    Control,
    Hybrid,
    Escort,
    #[default]
    Unknown,
}

impl MapType {
    /// Parse an upstream mode label (`"OW2 Mode"`), mapping anything unrecognised
    /// to `Unknown`.
    pub fn from_mode(mode: &str) -> Self {
        mode.parse().unwrap_or(MapType::Unknown)
    }

    /// Adjust one faction's round score for this map type.
    pub fn adjust_score(&self, score: f64) -> f64 {
        match self {
            MapType::Control => score * 2.0,
            MapType::Hybrid => score + 1.0,
            MapType::Escort | MapType::Unknown => score,
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MapType::Control => "Control",
            MapType::Hybrid => "Hybrid",
            MapType::Escort => "Escort",
            MapType::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for MapType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "control" => Ok(MapType::Control),
            "hybrid" => Ok(MapType::Hybrid),
            "escort" => Ok(MapType::Escort),
            "unknown" => Ok(MapType::Unknown),
            _ => Err(PipelineError::InvalidMapType {
                map_type: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_score_per_map_type() {
        assert_eq!(MapType::Control.adjust_score(2.0), 4.0);
        assert_eq!(MapType::Hybrid.adjust_score(2.0), 3.0);
        assert_eq!(MapType::Hybrid.adjust_score(0.0), 1.0);
        assert_eq!(MapType::Escort.adjust_score(2.0), 2.0);
        assert_eq!(MapType::Unknown.adjust_score(2.0), 2.0);
    }

    #[test]
    fn test_from_mode_is_lenient() {
        assert_eq!(MapType::from_mode("Control"), MapType::Control);
        assert_eq!(MapType::from_mode("escort"), MapType::Escort);
        assert_eq!(MapType::from_mode("Push"), MapType::Unknown);
        assert!("Push".parse::<MapType>().is_err());
    }

    #[test]
    fn test_serde_uses_variant_names() {
        let json = serde_json::to_string(&vec![MapType::Control, MapType::Unknown]).unwrap();
        assert_eq!(json, r#"["Control","Unknown"]"#);
    }
}
