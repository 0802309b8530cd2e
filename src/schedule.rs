//! Fixture list for the whole tournament: 72 group matches (`A1`..`L6`) and the
//! 32 knockout matches (`M73`..`M104`) with their teams left open.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::error::{EngineError, EngineResult};
use crate::model::{Cards, GroupLabel, Match, MatchStatus, Phase, Team};

pub const TEAMS_PER_GROUP: usize = 4;
pub const GROUP_MATCHES: usize = 72;
pub const KNOCKOUT_MATCHES: usize = 32;
pub const FIRST_KNOCKOUT: u32 = 73;
pub const LAST_KNOCKOUT: u32 = 104;

/// Pairings by position inside the group, three matchdays of two games.
const ROUND_ROBIN: [(usize, usize); 6] = [(0, 1), (2, 3), (0, 2), (1, 3), (0, 3), (1, 2)];

const GROUP_GAMES_PER_DAY: i64 = 4;
const KICKOFF_STAGGER_HOURS: i64 = 3;

pub fn match_id(round: &str) -> String {
    format!("wc26-{round}")
}

pub fn knockout_phase(number: u32) -> Option<Phase> {
    match number {
        73..=88 => Some(Phase::RoundOf32),
        89..=96 => Some(Phase::RoundOf16),
        97..=100 => Some(Phase::QuarterFinal),
        101..=102 => Some(Phase::SemiFinal),
        103 => Some(Phase::ThirdPlace),
        104 => Some(Phase::Final),
        _ => None,
    }
}

/// Builds all 104 fixtures. Teams keep the order they were given within their
/// group; every group must hold exactly four teams.
pub fn build_schedule(teams: &[Team], start: DateTime<Utc>) -> EngineResult<Vec<Match>> {
    let mut groups: BTreeMap<GroupLabel, Vec<&Team>> = BTreeMap::new();
    for team in teams {
        groups.entry(team.group).or_default().push(team);
    }
    for group in GroupLabel::ALL {
        let found = groups.get(&group).map_or(0, Vec::len);
        if found != TEAMS_PER_GROUP {
            return Err(EngineError::GroupSizeMismatch {
                group,
                teams: found,
                expected: TEAMS_PER_GROUP,
            });
        }
    }

    let mut out = Vec::with_capacity(GROUP_MATCHES + KNOCKOUT_MATCHES);
    let mut index: i64 = 0;
    for (group, members) in &groups {
        for (game, (home, away)) in ROUND_ROBIN.iter().enumerate() {
            let round = format!("{group}{}", game + 1);
            let kickoff = start
                + Duration::days(index / GROUP_GAMES_PER_DAY)
                + Duration::hours((index % 3) * KICKOFF_STAGGER_HOURS);
            let mut m = fixture(&round, Phase::Group, kickoff);
            m.group = Some(*group);
            m.home_team = Some(members[*home].id.clone());
            m.away_team = Some(members[*away].id.clone());
            out.push(m);
            index += 1;
        }
    }

    for number in FIRST_KNOCKOUT..=LAST_KNOCKOUT {
        let Some(phase) = knockout_phase(number) else {
            continue;
        };
        let round = format!("M{number}");
        out.push(fixture(&round, phase, start + knockout_offset(number)));
    }
    Ok(out)
}

fn fixture(round: &str, phase: Phase, kickoff: DateTime<Utc>) -> Match {
    Match {
        id: match_id(round),
        phase,
        group: None,
        round: round.to_string(),
        kickoff,
        home_team: None,
        away_team: None,
        score: None,
        penalties: None,
        status: MatchStatus::Pending,
        home_cards: Cards::default(),
        away_cards: Cards::default(),
    }
}

// Day offsets from the opening match: the group stage fills eighteen days.
fn knockout_offset(number: u32) -> Duration {
    let (first_day, first_match, per_day) = match number {
        73..=88 => (18, 73, 4),
        89..=96 => (23, 89, 2),
        97..=100 => (28, 97, 2),
        101..=102 => (32, 101, 1),
        103 => (35, 103, 1),
        _ => (36, 104, 1),
    };
    let slot = (number - first_match) as i64;
    Duration::days(first_day + slot / per_day)
        + Duration::hours((slot % per_day) * KICKOFF_STAGGER_HOURS)
}
