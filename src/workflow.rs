//! Read, compute, write cycles over the store. Each workflow that writes runs in a
//! single `BEGIN IMMEDIATE` transaction so concurrent writers serialize.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annex_c::{AnnexCTable, ThirdPlaceSlot};
use crate::bracket::{
    BRACKET, BracketSlotMap, BracketStage, SlotAssignment, advance_bracket_round,
    apply_assignments, seed_round_of_32, slot_map, validate_graph,
};
use crate::error::{EngineError, EngineResult};
use crate::leaderboard::{LeaderboardRow, compute_leaderboard};
use crate::model::{Cards, GroupLabel, Match, Phase, Prediction, Score, Team, penalties_allowed};
use crate::predictions::{PredictionInput, accept_prediction, check_goals, prediction_deadline};
use crate::schedule::build_schedule;
use crate::scoring::{OfficialResult, PredictedResult, score_prediction};
use crate::standings::{StandingRow, compute_group_standings, pending_group_matches};
use crate::store;
use crate::third_place::{BestThirds, select_best_third_places};

/// An official result as entered by the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalResult {
    pub score: Score,
    pub penalties: Option<Score>,
    pub home_cards: Cards,
    pub away_cards: Cards,
}

impl FinalResult {
    pub fn new(score: Score, penalties: Option<Score>) -> Self {
        Self {
            score,
            penalties,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalizeSummary {
    pub match_id: String,
    pub round: String,
    pub predictions_scored: usize,
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub teams: usize,
    pub matches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub tables: BTreeMap<GroupLabel, Vec<StandingRow>>,
    pub best_thirds: BestThirds,
    pub third_place_slots: Vec<ThirdPlaceSlot>,
    pub slots: BracketSlotMap,
    pub changed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdvanceSummary {
    pub assignments: Vec<SlotAssignment>,
    pub changed: usize,
    /// Destinations already played with other teams; left as they are.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecalcSummary {
    pub matches: usize,
    pub predictions: usize,
    pub users: usize,
}

fn begin(conn: &mut Connection) -> Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .context("begin immediate transaction")
}

/// Loads teams and writes the full fixture list into an empty database.
pub fn seed_tournament(
    conn: &mut Connection,
    teams: &[Team],
    start: DateTime<Utc>,
) -> Result<SeedSummary> {
    let schedule = build_schedule(teams, start)?;
    let tx = begin(conn)?;
    let existing = store::load_matches(&tx)?.len();
    if existing > 0 {
        bail!("database already holds {existing} matches; refusing to reseed");
    }
    for team in teams {
        store::upsert_team(&tx, team)?;
    }
    for m in &schedule {
        store::upsert_match(&tx, m)?;
    }
    tx.commit().context("commit seed transaction")?;
    info!(teams = teams.len(), matches = schedule.len(), %start, "seeded tournament");
    Ok(SeedSummary {
        teams: teams.len(),
        matches: schedule.len(),
    })
}

/// Checks a result before it is stored: goals in range, and a decisive shootout
/// exactly when a knockout match is level.
pub fn validate_result(m: &Match, result: &FinalResult) -> EngineResult<()> {
    check_goals(result.score)?;
    if penalties_allowed(m.phase, result.score) {
        let Some(pens) = result.penalties else {
            return Err(EngineError::MissingKnockoutPenalties {
                round: m.round.clone(),
            });
        };
        check_goals(pens)?;
        if pens.is_draw() {
            return Err(EngineError::TiedPenalties {
                round: m.round.clone(),
            });
        }
    } else if result.penalties.is_some() {
        return Err(EngineError::PenaltiesOutsideKnockoutDraw {
            round: m.round.clone(),
        });
    }
    Ok(())
}

/// Marks a match finished and scores every prediction made for it.
pub fn finalize_result(
    conn: &mut Connection,
    match_id: &str,
    result: &FinalResult,
) -> Result<FinalizeSummary> {
    let tx = begin(conn)?;
    let m = store::find_match(&tx, match_id)?.ok_or_else(|| EngineError::UnknownMatch {
        match_id: match_id.to_string(),
    })?;
    if m.is_finished() {
        return Err(EngineError::MatchAlreadyFinished { round: m.round }.into());
    }
    if m.teams().is_none() {
        return Err(EngineError::TeamsNotAssigned { round: m.round }.into());
    }
    validate_result(&m, result)?;

    let stored = store::record_result(
        &tx,
        &m.id,
        result.score,
        result.penalties,
        result.home_cards,
        result.away_cards,
    )?;
    if !stored {
        return Err(EngineError::MatchAlreadyFinished { round: m.round }.into());
    }

    let official = OfficialResult {
        score: result.score,
        penalties: result.penalties,
    };
    let predictions = store::load_predictions_for_match(&tx, &m.id)?;
    let mut users = BTreeSet::new();
    for p in &predictions {
        let points = score_prediction(&predicted(p), &official, m.phase);
        store::set_prediction_points(&tx, &p.user_id, &p.match_id, points)?;
        debug!(user = %p.user_id, round = %m.round, points, "prediction scored");
        users.insert(p.user_id.clone());
    }
    tx.commit().context("commit finalize transaction")?;

    info!(
        round = %m.round,
        score = %result.score,
        predictions = predictions.len(),
        "result finalized"
    );
    Ok(FinalizeSummary {
        match_id: m.id,
        round: m.round,
        predictions_scored: predictions.len(),
        users: users.into_iter().collect(),
    })
}

/// Validates and stores (or replaces) a user's prediction.
pub fn submit_prediction(
    conn: &Connection,
    lock: Duration,
    user_id: &str,
    match_id: &str,
    input: PredictionInput,
    now: DateTime<Utc>,
) -> Result<Prediction> {
    let m = store::find_match(conn, match_id)?.ok_or_else(|| EngineError::UnknownMatch {
        match_id: match_id.to_string(),
    })?;
    if m.is_finished() {
        let closed_at = prediction_deadline(&m, lock);
        return Err(EngineError::PredictionClosed {
            round: m.round,
            closed_at,
        }
        .into());
    }
    let prediction = accept_prediction(&m, user_id, input, now, lock)?;
    store::upsert_prediction(conn, &prediction)?;
    debug!(user = user_id, round = %m.round, score = %prediction.score, "prediction stored");
    Ok(prediction)
}

/// Current table of one group from whatever has been played.
pub fn group_table(conn: &Connection, group: GroupLabel) -> Result<Vec<StandingRow>> {
    let teams: Vec<Team> = store::load_teams(conn)?
        .into_iter()
        .filter(|t| t.group == group)
        .collect();
    let matches = store::load_group_matches(conn, group)?;
    Ok(compute_group_standings(group, &teams, &matches)?)
}

/// Final group tables, best thirds and the Annex C placement, written into the
/// sixteen round-of-32 fixtures.
pub fn classify_group_stage(conn: &mut Connection, table: &AnnexCTable) -> Result<Classification> {
    let tx = begin(conn)?;
    let group_matches = store::load_matches_by_phase(&tx, Phase::Group)?;
    let pending = pending_group_matches(&group_matches);
    if pending > 0 {
        return Err(EngineError::GroupStageIncomplete { pending }.into());
    }

    let teams = store::load_teams(&tx)?;
    let mut tables = BTreeMap::new();
    for group in GroupLabel::ALL {
        let members: Vec<Team> = teams.iter().filter(|t| t.group == group).cloned().collect();
        let rows = compute_group_standings(group, &members, &group_matches)?;
        tables.insert(group, rows);
    }

    let best_thirds = select_best_third_places(&tables)?;
    let third_place_slots =
        table.resolve_third_place_slots(&best_thirds.groups, &best_thirds.team_by_group())?;
    let assignments = seed_round_of_32(&tables, &third_place_slots)?;

    let mut matches = store::load_matches_by_phase(&tx, Phase::RoundOf32)?;
    let summary = write_assignments(&tx, &mut matches, assignments)?;
    tx.commit().context("commit classification transaction")?;

    let thirds: String = best_thirds.groups.iter().map(|g| g.letter()).collect();
    info!(%thirds, changed = summary.changed, "group stage classified");
    Ok(Classification {
        tables,
        best_thirds,
        third_place_slots,
        slots: slot_map(&summary.assignments),
        changed: summary.changed,
    })
}

/// Moves winners (and semi-final losers) into the next round. `None` runs every
/// stage in order.
pub fn advance_knockouts(
    conn: &mut Connection,
    stage: Option<BracketStage>,
) -> Result<AdvanceSummary> {
    validate_graph(&BRACKET)?;
    let stages = match stage {
        Some(stage) => vec![stage],
        None => BracketStage::ALL.to_vec(),
    };

    let tx = begin(conn)?;
    let mut matches = store::load_matches(&tx)?;
    let mut summary = AdvanceSummary::default();
    for stage in stages {
        let assignments = advance_bracket_round(&matches, &stage.edges())?;
        let written = write_assignments(&tx, &mut matches, assignments)?;
        info!(
            %stage,
            resolved = written.assignments.len(),
            changed = written.changed,
            "bracket stage advanced"
        );
        summary.assignments.extend(written.assignments);
        summary.changed += written.changed;
        summary.skipped.extend(written.skipped);
    }
    tx.commit().context("commit advance transaction")?;
    Ok(summary)
}

// Writes each assignment unless its fixture was already played with other teams.
fn write_assignments(
    tx: &Transaction<'_>,
    matches: &mut [Match],
    assignments: Vec<SlotAssignment>,
) -> Result<AdvanceSummary> {
    let mut summary = AdvanceSummary::default();
    for a in assignments {
        let Some(dest) = matches.iter().find(|m| m.round == a.round) else {
            return Err(EngineError::BracketGraph {
                reason: format!("fixture {} does not exist", a.round),
            }
            .into());
        };
        if dest.is_finished() && dest.teams() != Some((a.home.as_str(), a.away.as_str())) {
            warn!(round = %a.round, "fixture already played with other teams; not overwriting");
            summary.skipped.push(a.round);
            continue;
        }
        if store::set_match_teams(tx, &a.round, &a.home, &a.away)? {
            debug!(round = %a.round, home = %a.home, away = %a.away, "fixture teams written");
        }
        summary.changed += apply_assignments(matches, std::slice::from_ref(&a));
        summary.assignments.push(a);
    }
    Ok(summary)
}

/// Rescores every prediction of every finished match.
pub fn recalculate_all_points(
    conn: &mut Connection,
    workers: Option<usize>,
) -> Result<RecalcSummary> {
    let tx = begin(conn)?;
    let finished = store::load_finished_matches(&tx)?;
    let predictions = store::load_predictions(&tx)?;
    let by_id: HashMap<&str, &Match> = finished.iter().map(|m| (m.id.as_str(), m)).collect();

    let pool = build_scoring_pool(workers);
    let scored: Vec<(&Prediction, u32)> = with_scoring_pool(&pool, || {
        predictions
            .par_iter()
            .filter_map(|p| {
                let m = by_id.get(p.match_id.as_str())?;
                let official = OfficialResult {
                    score: m.score?,
                    penalties: m.penalties,
                };
                Some((p, score_prediction(&predicted(p), &official, m.phase)))
            })
            .collect()
    });

    let mut users = BTreeSet::new();
    for (p, points) in &scored {
        store::set_prediction_points(&tx, &p.user_id, &p.match_id, *points)?;
        users.insert(p.user_id.as_str());
    }
    let summary = RecalcSummary {
        matches: finished.len(),
        predictions: scored.len(),
        users: users.len(),
    };
    tx.commit().context("commit recalculation transaction")?;
    info!(
        matches = summary.matches,
        predictions = summary.predictions,
        users = summary.users,
        "points recalculated"
    );
    Ok(summary)
}

pub fn leaderboard(conn: &Connection, limit: Option<usize>) -> Result<Vec<LeaderboardRow>> {
    let predictions = store::load_predictions(conn)?;
    let matches = store::load_matches(conn)?;
    Ok(compute_leaderboard(&predictions, &matches, limit))
}

fn predicted(p: &Prediction) -> PredictedResult {
    PredictedResult {
        score: p.score,
        penalties: p.penalties,
    }
}

fn build_scoring_pool(workers: Option<usize>) -> Option<rayon::ThreadPool> {
    let threads = workers?.clamp(1, 32);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_scoring_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
