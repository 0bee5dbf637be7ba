//! Type-safe wrappers and enums for FACEIT Overwatch data.

pub mod ids;
pub mod map_type;
pub mod role;
pub mod selection;

pub use ids::{ChampionshipId, MatchId};
pub use map_type::MapType;
pub use role::Role;
pub use selection::RoundSelection;
