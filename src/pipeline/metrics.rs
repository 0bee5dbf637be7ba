//! Rate-normalised stats and the composite value score.

use super::report::{BatchReport, DropReason};
use super::tables::{Per10Stats, PlayerRound, Tables};
use super::telemetry::{PipelineEvent, SharedTelemetry, Stage};
use crate::cli::types::{MatchId, Role};
use crate::error::{PipelineError, Result};

/// Base weights for eliminations/10, assists/10, damage, healing and deaths.
pub const STAT_WEIGHTS: [f64; 5] = [2.0, 0.5, 0.001, 0.001, 1.0];

/// Weighted deaths at which the penalty reaches half its maximum.
pub const DEATH_THRESHOLD: f64 = 7.0;
pub const DEATH_STEEPNESS: f64 = 0.5;
pub const MAX_DEATH_PENALTY: f64 = 30.0;

/// Multipliers applied elementwise to [`STAT_WEIGHTS`] for each role.
pub fn role_adjustment(role: Role) -> [f64; 5] {
    match role {
        Role::Tank => [1.2, 1.0, 1.0, 0.0, 1.2],
        Role::Damage => [1.2, 1.0, 1.18, 0.0, 1.2],
        Role::Support => [1.1, 1.2, 1.0, 1.3, 1.15],
        Role::Unknown => [1.0; 5],
    }
}

/// Scale a count to a ten-minute rate: `value * 10 / (seconds / 60)`.
pub fn per_10(value: f64, duration_seconds: f64) -> f64 {
    value * 10.0 / (duration_seconds / 60.0)
}

/// Logistic penalty on weighted deaths, bounded by [`MAX_DEATH_PENALTY`].
pub fn death_penalty(weighted_deaths: f64) -> f64 {
    MAX_DEATH_PENALTY / (1.0 + (-DEATH_STEEPNESS * (weighted_deaths - DEATH_THRESHOLD)).exp())
}

/// Inputs of the value score, in weight order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueInputs {
    pub eliminations_per_10: f64,
    pub assists_per_10: f64,
    pub damage_dealt: f64,
    pub healing_done: f64,
    pub deaths: f64,
}

impl ValueInputs {
    fn as_array(&self) -> [f64; 5] {
        [
            self.eliminations_per_10,
            self.assists_per_10,
            self.damage_dealt,
            self.healing_done,
            self.deaths,
        ]
    }
}

/// Weighted contributions after the role adjustment.
pub fn weighted_stats(role: Role, inputs: &ValueInputs) -> [f64; 5] {
    let adjustment = role_adjustment(role);
    let stats = inputs.as_array();
    std::array::from_fn(|i| STAT_WEIGHTS[i] * adjustment[i] * stats[i])
}

/// Positive contribution of the first four weighted stats minus the death
/// penalty on the fifth.
pub fn value_score(role: Role, inputs: &ValueInputs) -> f64 {
    let weighted = weighted_stats(role, inputs);
    let positive: f64 = weighted[..4].iter().sum();
    positive - death_penalty(weighted[4])
}

/// Per-10 rates for one row. Requires a strictly positive allocated duration.
pub fn per_10_stats(row: &PlayerRound) -> Result<Per10Stats> {
    let duration = match row.duration {
        Some(d) if d > 0.0 && d.is_finite() => d,
        Some(d) => {
            return Err(PipelineError::precondition(
                row.match_id.as_str(),
                format!("{} has non-positive allocated duration {d}", row.nickname),
            ))
        }
        None => {
            return Err(PipelineError::precondition(
                row.match_id.as_str(),
                format!("{} has no allocated duration", row.nickname),
            ))
        }
    };

    Ok(Per10Stats {
        deaths: per_10(row.deaths as f64, duration),
        eliminations: per_10(row.eliminations as f64, duration),
        assists: per_10(row.assists as f64, duration),
        damage_dealt: per_10(row.damage_dealt as f64, duration),
        healing_done: per_10(row.healing_done as f64, duration),
    })
}

pub struct MetricsEngine {
    telemetry: SharedTelemetry,
}

impl MetricsEngine {
    pub fn new(telemetry: SharedTelemetry) -> Self {
        Self { telemetry }
    }

    /// Fill `per_10` and `value` on every row. Each match is scored as a unit:
    /// one bad row drops that match and nothing else.
    pub fn apply(&self, mut tables: Tables, report: &mut BatchReport) -> Tables {
        let match_ids: Vec<MatchId> = tables.matches.keys().cloned().collect();

        for match_id in match_ids {
            let scored: Result<Vec<(usize, Per10Stats, f64)>> = tables
                .players
                .iter()
                .enumerate()
                .filter(|(_, row)| row.match_id == match_id)
                .map(|(idx, row)| {
                    let rates = per_10_stats(row)?;
                    let value = value_score(
                        row.role,
                        &ValueInputs {
                            eliminations_per_10: rates.eliminations,
                            assists_per_10: rates.assists,
                            damage_dealt: row.damage_dealt as f64,
                            healing_done: row.healing_done as f64,
                            deaths: row.deaths as f64,
                        },
                    );
                    Ok((idx, rates, value))
                })
                .collect();

            match scored {
                Ok(rows) => {
                    for (idx, rates, value) in rows {
                        tables.players[idx].per_10 = Some(rates);
                        tables.players[idx].value = Some(value);
                    }
                }
                Err(err) => {
                    let player_rows = tables.drop_match(&match_id);
                    report.record_drop(DropReason::Defect, player_rows);
                    self.telemetry.record(PipelineEvent::MatchDropped {
                        match_id,
                        reason: DropReason::Defect,
                        player_rows,
                        detail: err.to_string(),
                    });
                }
            }
        }

        self.telemetry.record(PipelineEvent::StageFinished {
            stage: Stage::Metrics,
            matches: tables.matches.len(),
            players: tables.players.len(),
        });
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{match_record, player_round};
    use crate::pipeline::telemetry::RecordingTelemetry;

    const EPS: f64 = 1e-9;

    fn inputs(e: f64, a: f64, dmg: f64, heal: f64, deaths: f64) -> ValueInputs {
        ValueInputs {
            eliminations_per_10: e,
            assists_per_10: a,
            damage_dealt: dmg,
            healing_done: heal,
            deaths,
        }
    }

    #[test]
    fn test_per_10_over_ten_minutes_is_identity() {
        assert!((per_10(5.0, 600.0) - 5.0).abs() < EPS);
        assert!((per_10(5.0, 300.0) - 10.0).abs() < EPS);
    }

    #[test]
    fn test_death_penalty_bounds() {
        assert!((death_penalty(7.0) - 15.0).abs() < EPS);
        assert!((death_penalty(1e6) - 30.0).abs() < 1e-6);
        assert!(death_penalty(-1e6).abs() < 1e-6);
        assert!(death_penalty(0.0) < death_penalty(3.0));
    }

    #[test]
    fn test_tank_worked_example() {
        let x = inputs(10.0, 4.0, 8000.0, 0.0, 3.0);
        let weighted = weighted_stats(Role::Tank, &x);
        let expected = [24.0, 2.0, 8.0, 0.0, 3.6];
        for (w, e) in weighted.iter().zip(expected) {
            assert!((w - e).abs() < 1e-9, "{w} != {e}");
        }

        let penalty = 30.0 / (1.0 + 1.7f64.exp());
        assert!((value_score(Role::Tank, &x) - (34.0 - penalty)).abs() < EPS);
        assert!((value_score(Role::Tank, &x) - 29.37).abs() < 0.01);
    }

    #[test]
    fn test_unknown_role_is_unadjusted() {
        let x = inputs(1.0, 1.0, 1000.0, 1000.0, 0.0);
        let weighted = weighted_stats(Role::Unknown, &x);
        for (w, e) in weighted.iter().zip([2.0, 0.5, 1.0, 1.0, 0.0]) {
            assert!((w - e).abs() < EPS, "{w} != {e}");
        }
    }

    #[test]
    fn test_value_monotonicity() {
        let base = inputs(5.0, 5.0, 5000.0, 5000.0, 5.0);
        for role in [Role::Tank, Role::Damage, Role::Support, Role::Unknown] {
            let v = value_score(role, &base);
            assert!(value_score(role, &inputs(6.0, 5.0, 5000.0, 5000.0, 5.0)) >= v);
            assert!(value_score(role, &inputs(5.0, 6.0, 5000.0, 5000.0, 5.0)) >= v);
            assert!(value_score(role, &inputs(5.0, 5.0, 6000.0, 5000.0, 5.0)) >= v);
            assert!(value_score(role, &inputs(5.0, 5.0, 5000.0, 6000.0, 5.0)) >= v);
            assert!(value_score(role, &inputs(5.0, 5.0, 5000.0, 5000.0, 6.0)) <= v);
        }
    }

    #[test]
    fn test_per_10_stats_requires_positive_duration() {
        let mut row = player_round("p", "m", 0, "Control");
        assert!(per_10_stats(&row).is_err());
        row.duration = Some(0.0);
        assert!(per_10_stats(&row).is_err());
        row.duration = Some(600.0);
        let rates = per_10_stats(&row).unwrap();
        assert!((rates.eliminations - 10.0).abs() < EPS);
        assert!((rates.damage_dealt - 8000.0).abs() < EPS);
    }

    #[test]
    fn test_engine_drops_unallocated_match_only() {
        let mut tables = Tables::new(vec![match_record("a"), match_record("b")], vec![]);
        let mut ok = player_round("p", "a", 0, "Control");
        ok.duration = Some(1200.0);
        tables.players.push(ok);
        tables.players.push(player_round("q", "b", 0, "Control"));
        let mut report = BatchReport::default();

        let tables = MetricsEngine::new(RecordingTelemetry::new()).apply(tables, &mut report);

        assert_eq!(report.dropped(DropReason::Defect), 1);
        assert_eq!(tables.players.len(), 1);
        let row = &tables.players[0];
        assert!((row.per_10.unwrap().eliminations - 5.0).abs() < EPS);
        assert!(row.value.is_some());
    }
}
