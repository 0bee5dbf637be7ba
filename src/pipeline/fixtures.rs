//! Shared builders for pipeline unit tests.

use super::tables::{MatchRecord, PlayerRound};
use crate::cli::types::{MapType, MatchId, Role};

/// A complete two-round match: Control 2-1 then Hybrid 1-2, 4000 s wall clock.
pub(crate) fn match_record(id: &str) -> MatchRecord {
    MatchRecord {
        match_id: MatchId::new(id),
        competition_type: Some("championship".into()),
        competition_id: Some("c1".into()),
        competition_name: Some("Open".into()),
        started_at: Some(0),
        finished_at: Some(4000),
        winner: Some("faction1".into()),
        faction_1: Some("Alpha".into()),
        faction_2: Some("Bravo".into()),
        faction_1_score: Some(2),
        faction_2_score: Some(1),
        maps: vec!["0x08000000000007E2".into(), "0x08000000000000D4".into()],
        map_types: vec![MapType::Control, MapType::Hybrid],
        map_names: vec!["Busan".into(), "King's Row".into()],
        faction_1_map_scores: vec![2, 1],
        faction_2_map_scores: vec![1, 2],
        map_winner: vec![Some("faction1".into()), Some("faction2".into())],
    }
}

pub(crate) fn player_round(nickname: &str, match_id: &str, round_index: usize, mode: &str) -> PlayerRound {
    PlayerRound {
        nickname: nickname.into(),
        match_id: MatchId::new(match_id),
        round_index,
        role: Role::Damage,
        eliminations: 10,
        assists: 4,
        deaths: 3,
        kd_ratio: 10.0 / 3.0,
        damage_dealt: 8000,
        healing_done: 0,
        damage_mitigated: 500,
        won: true,
        mode: mode.into(),
        map: "Busan".into(),
        duration: None,
        per_10: None,
        value: None,
    }
}
