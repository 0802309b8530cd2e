use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::{Match, Phase, Prediction};
use crate::scoring::{EXACT_POINTS, ONE_SIDE_POINTS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    /// Competition rank: users level on points share a position.
    pub position: usize,
    pub user_id: String,
    pub total_points: u32,
    pub predictions_scored: u32,
    /// Predictions worth at least an exact-score award.
    pub exact_hits: u32,
    /// Predictions that earned something short of an exact hit.
    pub partial_hits: u32,
    /// Exact hits as a percentage of scored predictions, one decimal.
    pub hit_rate: f64,
    pub points_by_phase: BTreeMap<Phase, u32>,
}

#[derive(Default)]
struct Tally {
    total: u32,
    scored: u32,
    exact: u32,
    partial: u32,
    by_phase: BTreeMap<Phase, u32>,
}

/// Aggregates awarded points per user. Unscored predictions are ignored; a
/// prediction whose match is unknown still counts towards the total but not
/// towards any phase.
pub fn compute_leaderboard(
    predictions: &[Prediction],
    matches: &[Match],
    limit: Option<usize>,
) -> Vec<LeaderboardRow> {
    let phases: HashMap<&str, Phase> = matches.iter().map(|m| (m.id.as_str(), m.phase)).collect();

    let mut tallies: HashMap<&str, Tally> = HashMap::new();
    for p in predictions {
        let Some(points) = p.points else { continue };
        let tally = tallies.entry(p.user_id.as_str()).or_default();
        tally.total += points;
        tally.scored += 1;
        if points >= EXACT_POINTS {
            tally.exact += 1;
        } else if points >= ONE_SIDE_POINTS {
            tally.partial += 1;
        }
        if let Some(phase) = phases.get(p.match_id.as_str()) {
            *tally.by_phase.entry(*phase).or_default() += points;
        }
    }

    let mut rows: Vec<(&str, Tally)> = tallies.into_iter().collect();
    rows.sort_by(|(a_id, a), (b_id, b)| {
        b.total
            .cmp(&a.total)
            .then_with(|| b.exact.cmp(&a.exact))
            .then_with(|| a_id.cmp(b_id))
    });

    let mut out = Vec::with_capacity(rows.len());
    let mut position = 0;
    let mut last_total = None;
    for (idx, (user_id, tally)) in rows.into_iter().enumerate() {
        if last_total != Some(tally.total) {
            position = idx + 1;
            last_total = Some(tally.total);
        }
        out.push(LeaderboardRow {
            position,
            user_id: user_id.to_string(),
            total_points: tally.total,
            predictions_scored: tally.scored,
            exact_hits: tally.exact,
            partial_hits: tally.partial,
            hit_rate: hit_rate(tally.exact, tally.scored),
            points_by_phase: tally.by_phase,
        });
    }
    if let Some(limit) = limit {
        out.truncate(limit);
    }
    out
}

fn hit_rate(exact: u32, scored: u32) -> f64 {
    if scored == 0 {
        return 0.0;
    }
    (exact as f64 * 1000.0 / scored as f64).round() / 10.0
}
