use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, trace};

use crate::annex_c::ThirdPlaceSlot;
use crate::error::{EngineError, EngineResult};
use crate::model::{GroupLabel, Match, Outcome, Phase, TeamId};
use crate::standings::StandingRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BracketStage {
    RoundOf32,
    RoundOf16,
    QuarterFinals,
    SemiFinals,
}

impl BracketStage {
    pub const ALL: [BracketStage; 4] = [
        BracketStage::RoundOf32,
        BracketStage::RoundOf16,
        BracketStage::QuarterFinals,
        BracketStage::SemiFinals,
    ];

    /// Phase of the matches this stage reads results from.
    pub fn source_phase(self) -> Phase {
        match self {
            BracketStage::RoundOf32 => Phase::RoundOf32,
            BracketStage::RoundOf16 => Phase::RoundOf16,
            BracketStage::QuarterFinals => Phase::QuarterFinal,
            BracketStage::SemiFinals => Phase::SemiFinal,
        }
    }

    pub fn edges(self) -> Vec<BracketEdge> {
        BRACKET.iter().copied().filter(|e| e.stage == self).collect()
    }
}

impl fmt::Display for BracketStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BracketStage::RoundOf32 => "r32",
            BracketStage::RoundOf16 => "r16",
            BracketStage::QuarterFinals => "qf",
            BracketStage::SemiFinals => "sf",
        };
        f.write_str(label)
    }
}

impl FromStr for BracketStage {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "r32" | "round-of-32" => Ok(BracketStage::RoundOf32),
            "r16" | "round-of-16" => Ok(BracketStage::RoundOf16),
            "qf" | "quarterfinals" => Ok(BracketStage::QuarterFinals),
            "sf" | "semifinals" => Ok(BracketStage::SemiFinals),
            _ => Err(EngineError::UnknownPhase {
                raw: raw.to_string(),
            }),
        }
    }
}

/// Which team of a finished source match moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Advance {
    Winner,
    Loser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BracketEdge {
    pub stage: BracketStage,
    pub destination: &'static str,
    pub home_source: &'static str,
    pub away_source: &'static str,
    pub advance: Advance,
}

const fn edge(
    stage: BracketStage,
    destination: &'static str,
    home_source: &'static str,
    away_source: &'static str,
    advance: Advance,
) -> BracketEdge {
    BracketEdge {
        stage,
        destination,
        home_source,
        away_source,
        advance,
    }
}

/// Knockout tree from the round of 32 to the final and the third-place match.
pub static BRACKET: [BracketEdge; 16] = [
    edge(BracketStage::RoundOf32, "M89", "M73", "M75", Advance::Winner),
    edge(BracketStage::RoundOf32, "M90", "M74", "M77", Advance::Winner),
    edge(BracketStage::RoundOf32, "M91", "M76", "M78", Advance::Winner),
    edge(BracketStage::RoundOf32, "M92", "M79", "M80", Advance::Winner),
    edge(BracketStage::RoundOf32, "M93", "M81", "M82", Advance::Winner),
    edge(BracketStage::RoundOf32, "M94", "M83", "M84", Advance::Winner),
    edge(BracketStage::RoundOf32, "M95", "M85", "M86", Advance::Winner),
    edge(BracketStage::RoundOf32, "M96", "M87", "M88", Advance::Winner),
    edge(BracketStage::RoundOf16, "M97", "M89", "M90", Advance::Winner),
    edge(BracketStage::RoundOf16, "M98", "M91", "M92", Advance::Winner),
    edge(BracketStage::RoundOf16, "M99", "M93", "M94", Advance::Winner),
    edge(BracketStage::RoundOf16, "M100", "M95", "M96", Advance::Winner),
    edge(BracketStage::QuarterFinals, "M101", "M97", "M98", Advance::Winner),
    edge(BracketStage::QuarterFinals, "M102", "M99", "M100", Advance::Winner),
    edge(BracketStage::SemiFinals, "M104", "M101", "M102", Advance::Winner),
    edge(BracketStage::SemiFinals, "M103", "M101", "M102", Advance::Loser),
];

/// Where a round-of-32 slot comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Seed {
    GroupWinner(char),
    RunnerUp(char),
    /// Filled from the Annex C assignment for this fixture.
    ThirdPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundOf32Fixture {
    pub round: &'static str,
    pub home: Seed,
    pub away: Seed,
}

const fn fixture(round: &'static str, home: Seed, away: Seed) -> RoundOf32Fixture {
    RoundOf32Fixture { round, home, away }
}

pub static ROUND_OF_32: [RoundOf32Fixture; 16] = [
    fixture("M73", Seed::RunnerUp('A'), Seed::RunnerUp('B')),
    fixture("M74", Seed::GroupWinner('E'), Seed::ThirdPlace),
    fixture("M75", Seed::GroupWinner('F'), Seed::RunnerUp('C')),
    fixture("M76", Seed::GroupWinner('C'), Seed::RunnerUp('F')),
    fixture("M77", Seed::GroupWinner('I'), Seed::ThirdPlace),
    fixture("M78", Seed::RunnerUp('E'), Seed::RunnerUp('I')),
    fixture("M79", Seed::GroupWinner('A'), Seed::ThirdPlace),
    fixture("M80", Seed::GroupWinner('L'), Seed::ThirdPlace),
    fixture("M81", Seed::GroupWinner('D'), Seed::ThirdPlace),
    fixture("M82", Seed::GroupWinner('G'), Seed::ThirdPlace),
    fixture("M83", Seed::RunnerUp('K'), Seed::RunnerUp('L')),
    fixture("M84", Seed::GroupWinner('H'), Seed::RunnerUp('J')),
    fixture("M85", Seed::GroupWinner('B'), Seed::ThirdPlace),
    fixture("M86", Seed::GroupWinner('J'), Seed::RunnerUp('H')),
    fixture("M87", Seed::GroupWinner('K'), Seed::ThirdPlace),
    fixture("M88", Seed::RunnerUp('D'), Seed::RunnerUp('G')),
];

/// Teams to write into one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAssignment {
    pub round: String,
    pub home: TeamId,
    pub away: TeamId,
}

/// Round label -> (home team id, away team id).
pub type BracketSlotMap = BTreeMap<String, (TeamId, TeamId)>;

pub fn slot_map(assignments: &[SlotAssignment]) -> BracketSlotMap {
    assignments
        .iter()
        .map(|a| (a.round.clone(), (a.home.clone(), a.away.clone())))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Home,
    Away,
}

/// Which side of a finished knockout match went through.
///
/// `Ok(None)` while the match has no result or no teams. A level score needs a
/// decisive shootout; anything else is corrupt data.
fn decide(m: &Match) -> EngineResult<Option<Side>> {
    let (Some(score), Some(_)) = (m.result(), m.teams()) else {
        return Ok(None);
    };
    match score.outcome() {
        Outcome::HomeWin => Ok(Some(Side::Home)),
        Outcome::AwayWin => Ok(Some(Side::Away)),
        Outcome::Draw => match m.penalties.map(|p| p.outcome()) {
            Some(Outcome::HomeWin) => Ok(Some(Side::Home)),
            Some(Outcome::AwayWin) => Ok(Some(Side::Away)),
            _ => Err(EngineError::UnresolvedKnockoutTie {
                round: m.round.clone(),
            }),
        },
    }
}

fn team_on(m: &Match, side: Side) -> Option<TeamId> {
    match side {
        Side::Home => m.home_team.clone(),
        Side::Away => m.away_team.clone(),
    }
}

pub fn match_winner(m: &Match) -> EngineResult<Option<TeamId>> {
    Ok(decide(m)?.and_then(|side| team_on(m, side)))
}

pub fn match_loser(m: &Match) -> EngineResult<Option<TeamId>> {
    Ok(decide(m)?.and_then(|side| {
        let other = match side {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        };
        team_on(m, other)
    }))
}

fn resolve(m: &Match, advance: Advance) -> EngineResult<Option<TeamId>> {
    match advance {
        Advance::Winner => match_winner(m),
        Advance::Loser => match_loser(m),
    }
}

/// Resolves every edge whose two source matches are decided.
///
/// Edges still waiting on a result are left out, so the caller leaves those
/// destinations untouched. Running it again on the same results returns the same
/// assignments.
pub fn advance_bracket_round(
    matches: &[Match],
    edges: &[BracketEdge],
) -> EngineResult<Vec<SlotAssignment>> {
    let by_round: HashMap<&str, &Match> = matches.iter().map(|m| (m.round.as_str(), m)).collect();
    let source = |label: &str, dest: &str| {
        by_round
            .get(label)
            .copied()
            .ok_or_else(|| EngineError::BracketGraph {
                reason: format!("source {label} of {dest} is missing"),
            })
    };

    let mut out = Vec::new();
    for edge in edges {
        let home_src = source(edge.home_source, edge.destination)?;
        let away_src = source(edge.away_source, edge.destination)?;
        let home = resolve(home_src, edge.advance)?;
        let away = resolve(away_src, edge.advance)?;
        match (home, away) {
            (Some(home), Some(away)) => {
                debug!(destination = edge.destination, %home, %away, "bracket slot resolved");
                out.push(SlotAssignment {
                    round: edge.destination.to_string(),
                    home,
                    away,
                });
            }
            _ => trace!(destination = edge.destination, "waiting on source results"),
        }
    }
    Ok(out)
}

/// Writes assignments into the matching fixtures; returns how many changed.
pub fn apply_assignments(matches: &mut [Match], assignments: &[SlotAssignment]) -> usize {
    let mut changed = 0;
    for a in assignments {
        let Some(m) = matches.iter_mut().find(|m| m.round == a.round) else {
            continue;
        };
        let home = Some(a.home.clone());
        let away = Some(a.away.clone());
        if m.home_team != home || m.away_team != away {
            m.home_team = home;
            m.away_team = away;
            changed += 1;
        }
    }
    changed
}

/// Fills the sixteen round-of-32 fixtures from the final group tables and the
/// Annex C placement of the qualifying thirds.
pub fn seed_round_of_32(
    tables: &BTreeMap<GroupLabel, Vec<StandingRow>>,
    thirds: &[ThirdPlaceSlot],
) -> EngineResult<Vec<SlotAssignment>> {
    let mut out = Vec::with_capacity(ROUND_OF_32.len());
    for fixture in &ROUND_OF_32 {
        let home = seeded_team(tables, thirds, fixture.round, fixture.home)?;
        let away = seeded_team(tables, thirds, fixture.round, fixture.away)?;
        out.push(SlotAssignment {
            round: fixture.round.to_string(),
            home,
            away,
        });
    }
    Ok(out)
}

fn seeded_team(
    tables: &BTreeMap<GroupLabel, Vec<StandingRow>>,
    thirds: &[ThirdPlaceSlot],
    round: &str,
    seed: Seed,
) -> EngineResult<TeamId> {
    let (letter, position) = match seed {
        Seed::GroupWinner(letter) => (letter, 0),
        Seed::RunnerUp(letter) => (letter, 1),
        Seed::ThirdPlace => {
            return thirds
                .iter()
                .find(|slot| slot.round == round)
                .map(|slot| slot.team_id.clone())
                .ok_or_else(|| EngineError::BracketGraph {
                    reason: format!("no third-place team assigned to {round}"),
                });
        }
    };
    let group = GroupLabel::from_letter(letter)?;
    let table = tables.get(&group).map(Vec::as_slice).unwrap_or_default();
    table
        .get(position)
        .map(|row| row.team.id.clone())
        .ok_or(EngineError::GroupTooSmall {
            group,
            teams: table.len(),
        })
}

/// Checks the edge list is a tree: one edge per destination, every source feeds
/// at most one winner edge and one loser edge, and no destination reaches itself.
pub fn validate_graph(edges: &[BracketEdge]) -> EngineResult<()> {
    let broken = |reason: String| Err(EngineError::BracketGraph { reason });

    let mut destinations = HashSet::new();
    let mut fed: HashSet<(&str, Advance)> = HashSet::new();
    for e in edges {
        if !destinations.insert(e.destination) {
            return broken(format!("{} has more than one edge", e.destination));
        }
        if e.home_source == e.away_source {
            return broken(format!("{} draws both sides from {}", e.destination, e.home_source));
        }
        for src in [e.home_source, e.away_source] {
            if src == e.destination {
                return broken(format!("{} feeds itself", e.destination));
            }
            if !fed.insert((src, e.advance)) {
                return broken(format!("{src} feeds more than one {:?} edge", e.advance));
            }
        }
    }

    let sources: HashMap<&str, [&str; 2]> = edges
        .iter()
        .map(|e| (e.destination, [e.home_source, e.away_source]))
        .collect();
    for e in edges {
        let mut stack = vec![e.home_source, e.away_source];
        let mut seen = HashSet::new();
        while let Some(label) = stack.pop() {
            if label == e.destination {
                return broken(format!("{} depends on itself", e.destination));
            }
            if seen.insert(label)
                && let Some(next) = sources.get(label)
            {
                stack.extend(next.iter().copied());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_bracket_is_a_valid_tree() {
        validate_graph(&BRACKET).expect("bracket graph valid");
    }

    #[test]
    fn every_stage_has_edges() {
        let counts: Vec<usize> = BracketStage::ALL.iter().map(|s| s.edges().len()).collect();
        assert_eq!(counts, vec![8, 4, 2, 2]);
    }

    #[test]
    fn round_of_32_uses_every_winner_and_runner_up_once() {
        let mut winners = Vec::new();
        let mut runners_up = Vec::new();
        let mut thirds = 0;
        for f in &ROUND_OF_32 {
            for seed in [f.home, f.away] {
                match seed {
                    Seed::GroupWinner(g) => winners.push(g),
                    Seed::RunnerUp(g) => runners_up.push(g),
                    Seed::ThirdPlace => thirds += 1,
                }
            }
        }
        winners.sort_unstable();
        runners_up.sort_unstable();
        let all: Vec<char> = ('A'..='L').collect();
        assert_eq!(winners, all);
        assert_eq!(runners_up, all);
        assert_eq!(thirds, 8);
    }

    #[test]
    fn cycle_is_rejected() {
        let edges = [
            edge(BracketStage::RoundOf16, "X1", "X2", "Y1", Advance::Winner),
            edge(BracketStage::RoundOf16, "X2", "X1", "Y2", Advance::Loser),
        ];
        assert!(validate_graph(&edges).is_err());
    }
}
