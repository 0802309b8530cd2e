use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::trace;

use crate::error::{EngineError, EngineResult};
use crate::model::{Cards, GroupLabel, Match, Phase, Team};

pub const POINTS_WIN: u32 = 3;
pub const POINTS_DRAW: u32 = 1;

/// One line of a group table. Derived from finished matches, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub team: Team,
    pub points: u32,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub cards: Cards,
    pub fair_play: i32,
}

impl StandingRow {
    fn empty(team: &Team) -> Self {
        Self {
            team: team.clone(),
            points: 0,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            goal_difference: 0,
            cards: Cards::default(),
            fair_play: 0,
        }
    }

    fn record(&mut self, scored: u8, conceded: u8, cards: Cards) {
        self.played += 1;
        self.goals_for += scored as u32;
        self.goals_against += conceded as u32;
        match scored.cmp(&conceded) {
            Ordering::Greater => {
                self.won += 1;
                self.points += POINTS_WIN;
            }
            Ordering::Equal => {
                self.drawn += 1;
                self.points += POINTS_DRAW;
            }
            Ordering::Less => self.lost += 1,
        }
        self.goal_difference = self.goals_for as i32 - self.goals_against as i32;
        self.cards.add(cards);
        self.fair_play = self.cards.fair_play();
    }
}

/// Compares two rows on the criteria that apply across the whole group (or across
/// groups): goal difference, goals scored, fair play, FIFA ranking, then name.
/// Points are compared by the caller.
pub fn compare_group_wide(a: &StandingRow, b: &StandingRow) -> Ordering {
    b.goal_difference
        .cmp(&a.goal_difference)
        .then_with(|| b.goals_for.cmp(&a.goals_for))
        .then_with(|| b.fair_play.cmp(&a.fair_play))
        .then_with(|| a.team.fifa_ranking.cmp(&b.team.fifa_ranking))
        .then_with(|| a.team.name.cmp(&b.team.name))
        .then_with(|| a.team.id.cmp(&b.team.id))
}

/// Builds the ordered table for `group`.
///
/// Only finished group-stage matches between two members of the group count, so a
/// partially played group yields a snapshot of what is known so far. Teams level on
/// points are separated by their results against each other first; whatever that
/// cannot separate falls back to [`compare_group_wide`].
pub fn compute_group_standings(
    group: GroupLabel,
    teams: &[Team],
    matches: &[Match],
) -> EngineResult<Vec<StandingRow>> {
    let mut rows = Vec::with_capacity(teams.len());
    let mut index: HashMap<&str, usize> = HashMap::new();
    for team in teams {
        if team.group != group {
            return Err(EngineError::TeamOutsideGroup {
                team_id: team.id.clone(),
                expected: group,
                actual: team.group,
            });
        }
        if index.insert(team.id.as_str(), rows.len()).is_none() {
            rows.push(StandingRow::empty(team));
        }
    }

    let counted = counted_matches(group, &index, matches);
    for m in &counted {
        let (Some(score), Some((home, away))) = (m.result(), m.teams()) else {
            continue;
        };
        rows[index[home]].record(score.home, score.away, m.home_cards);
        rows[index[away]].record(score.away, score.home, m.away_cards);
    }

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| rows[b].points.cmp(&rows[a].points));

    let mut ranked = Vec::with_capacity(rows.len());
    for block in runs(&order, |&a, &b| rows[a].points == rows[b].points) {
        if block.len() == 1 {
            ranked.extend(block);
        } else {
            ranked.extend(head_to_head(&rows, &counted, &block));
        }
    }

    trace!(%group, teams = rows.len(), matches = counted.len(), "group table computed");
    Ok(ranked.into_iter().map(|i| rows[i].clone()).collect())
}

/// True when every group-stage match of `group` has a final result.
pub fn group_is_complete(group: GroupLabel, matches: &[Match]) -> bool {
    matches
        .iter()
        .filter(|m| m.phase == Phase::Group && m.group == Some(group))
        .all(|m| m.result().is_some())
}

/// Number of group-stage matches across all groups still waiting for a result.
pub fn pending_group_matches(matches: &[Match]) -> usize {
    matches
        .iter()
        .filter(|m| m.phase == Phase::Group && m.result().is_none())
        .count()
}

fn counted_matches<'a>(
    group: GroupLabel,
    index: &HashMap<&str, usize>,
    matches: &'a [Match],
) -> Vec<&'a Match> {
    matches
        .iter()
        .filter(|m| m.phase == Phase::Group && m.group == Some(group))
        .filter(|m| m.result().is_some())
        .filter(|m| {
            m.teams()
                .is_some_and(|(home, away)| index.contains_key(home) && index.contains_key(away))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MiniTally {
    points: u32,
    goal_difference: i32,
    goals_for: u32,
}

impl MiniTally {
    fn cmp_desc(&self, other: &Self) -> Ordering {
        other
            .points
            .cmp(&self.points)
            .then_with(|| other.goal_difference.cmp(&self.goal_difference))
            .then_with(|| other.goals_for.cmp(&self.goals_for))
    }
}

/// Orders a block of teams level on points by the mini-league among exactly those
/// teams. A strictly smaller sub-block that is still level gets its own mini-league;
/// a block the mini-league cannot split at all drops to the group-wide criteria.
fn head_to_head(rows: &[StandingRow], matches: &[&Match], block: &[usize]) -> Vec<usize> {
    let members: HashSet<&str> = block.iter().map(|&i| rows[i].team.id.as_str()).collect();
    let mut tally: HashMap<&str, MiniTally> =
        members.iter().map(|id| (*id, MiniTally::default())).collect();

    for m in matches {
        let (Some(score), Some((home, away))) = (m.result(), m.teams()) else {
            continue;
        };
        if !members.contains(home) || !members.contains(away) {
            continue;
        }
        if let Some(t) = tally.get_mut(home) {
            apply_mini(t, score.home, score.away);
        }
        if let Some(t) = tally.get_mut(away) {
            apply_mini(t, score.away, score.home);
        }
    }

    let key = |i: usize| tally[rows[i].team.id.as_str()];
    let mut sorted = block.to_vec();
    sorted.sort_by(|&a, &b| key(a).cmp_desc(&key(b)));

    let mut out = Vec::with_capacity(block.len());
    for sub in runs(&sorted, |&a, &b| key(a) == key(b)) {
        if sub.len() == 1 {
            out.extend(sub);
        } else if sub.len() < block.len() {
            out.extend(head_to_head(rows, matches, &sub));
        } else {
            let mut rest = sub;
            rest.sort_by(|&a, &b| compare_group_wide(&rows[a], &rows[b]));
            out.extend(rest);
        }
    }
    out
}

fn apply_mini(t: &mut MiniTally, scored: u8, conceded: u8) {
    t.goal_difference += scored as i32 - conceded as i32;
    t.goals_for += scored as u32;
    t.points += match scored.cmp(&conceded) {
        Ordering::Greater => POINTS_WIN,
        Ordering::Equal => POINTS_DRAW,
        Ordering::Less => 0,
    };
}

/// Splits an already sorted slice into maximal runs of equal elements.
fn runs<T: Copy>(sorted: &[T], same: impl Fn(&T, &T) -> bool) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = Vec::new();
    for item in sorted {
        match out.last_mut() {
            Some(run) if run.last().is_some_and(|last| same(last, item)) => run.push(*item),
            _ => out.push(vec![*item]),
        }
    }
    out
}
