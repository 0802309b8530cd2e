use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub type TeamId = String;

/// One of the twelve group letters `A` through `L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupLabel(u8);

impl GroupLabel {
    pub const COUNT: usize = 12;

    pub const ALL: [GroupLabel; Self::COUNT] = [
        GroupLabel(0),
        GroupLabel(1),
        GroupLabel(2),
        GroupLabel(3),
        GroupLabel(4),
        GroupLabel(5),
        GroupLabel(6),
        GroupLabel(7),
        GroupLabel(8),
        GroupLabel(9),
        GroupLabel(10),
        GroupLabel(11),
    ];

    pub fn from_letter(letter: char) -> Result<Self, EngineError> {
        let upper = letter.to_ascii_uppercase();
        if ('A'..='L').contains(&upper) {
            Ok(GroupLabel(upper as u8 - b'A'))
        } else {
            Err(EngineError::UnknownGroup {
                label: letter.to_string(),
            })
        }
    }

    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for GroupLabel {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => GroupLabel::from_letter(letter),
            _ => Err(EngineError::UnknownGroup {
                label: raw.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for GroupLabel {
    type Error = EngineError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<GroupLabel> for String {
    fn from(label: GroupLabel) -> Self {
        label.letter().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Group,
    RoundOf32,
    RoundOf16,
    QuarterFinal,
    SemiFinal,
    ThirdPlace,
    Final,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Group,
        Phase::RoundOf32,
        Phase::RoundOf16,
        Phase::QuarterFinal,
        Phase::SemiFinal,
        Phase::ThirdPlace,
        Phase::Final,
    ];

    pub fn is_knockout(self) -> bool {
        self != Phase::Group
    }

    /// Points multiplier expressed in quarter points (group = 4 -> x1).
    pub fn multiplier_quarters(self) -> u32 {
        match self {
            Phase::Group => 4,
            Phase::RoundOf32 => 5,
            Phase::RoundOf16 => 6,
            Phase::QuarterFinal => 8,
            Phase::SemiFinal => 10,
            Phase::ThirdPlace => 8,
            Phase::Final => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Group => "GROUP",
            Phase::RoundOf32 => "ROUND_OF_32",
            Phase::RoundOf16 => "ROUND_OF_16",
            Phase::QuarterFinal => "QUARTER_FINAL",
            Phase::SemiFinal => "SEMI_FINAL",
            Phase::ThirdPlace => "THIRD_PLACE",
            Phase::Final => "FINAL",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| EngineError::UnknownPhase {
                raw: raw.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Finished,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "PENDING",
            MatchStatus::Finished => "FINISHED",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(MatchStatus::Pending),
            "FINISHED" => Ok(MatchStatus::Finished),
            _ => Err(EngineError::UnknownStatus {
                raw: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

/// A home/away goal pair, used for regulation time and for shootouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}

impl Score {
    pub fn new(home: u8, away: u8) -> Self {
        Self { home, away }
    }

    pub fn outcome(self) -> Outcome {
        match self.home.cmp(&self.away) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Less => Outcome::AwayWin,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    pub fn is_draw(self) -> bool {
        self.home == self.away
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

impl FromStr for Score {
    type Err = EngineError;

    // Accepts "2-1", "2:1" or "2 1".
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        trimmed
            .split_once(['-', ':'])
            .or_else(|| trimmed.split_once(' '))
            .and_then(|(home, away)| {
                Some(Score {
                    home: goal_count(home)?,
                    away: goal_count(away)?,
                })
            })
            .ok_or_else(|| EngineError::InvalidScore {
                raw: raw.to_string(),
            })
    }
}

fn goal_count(side: &str) -> Option<u8> {
    let side = side.trim();
    if side.is_empty() || !side.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    side.parse().ok()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cards {
    pub yellow: u8,
    pub second_yellow: u8,
    pub red: u8,
}

impl Cards {
    pub fn add(&mut self, other: Cards) {
        self.yellow = self.yellow.saturating_add(other.yellow);
        self.second_yellow = self.second_yellow.saturating_add(other.second_yellow);
        self.red = self.red.saturating_add(other.red);
    }

    /// Disciplinary score; zero is clean, more negative is worse.
    pub fn fair_play(self) -> i32 {
        -(self.yellow as i32) - 3 * self.second_yellow as i32 - 4 * self.red as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub code: String,
    pub group: GroupLabel,
    pub fifa_ranking: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub phase: Phase,
    pub group: Option<GroupLabel>,
    pub round: String,
    pub kickoff: DateTime<Utc>,
    pub home_team: Option<TeamId>,
    pub away_team: Option<TeamId>,
    pub score: Option<Score>,
    pub penalties: Option<Score>,
    pub status: MatchStatus,
    #[serde(default)]
    pub home_cards: Cards,
    #[serde(default)]
    pub away_cards: Cards,
}

impl Match {
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Regulation score of a finished match.
    pub fn result(&self) -> Option<Score> {
        if self.is_finished() { self.score } else { None }
    }

    pub fn teams(&self) -> Option<(&str, &str)> {
        match (self.home_team.as_deref(), self.away_team.as_deref()) {
            (Some(home), Some(away)) => Some((home, away)),
            _ => None,
        }
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.home_team.as_deref() == Some(team_id) || self.away_team.as_deref() == Some(team_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub user_id: String,
    pub match_id: String,
    pub score: Score,
    pub penalties: Option<Score>,
    pub points: Option<u32>,
}

/// Penalties belong to a result only when a knockout match is level after regulation.
pub fn penalties_allowed(phase: Phase, score: Score) -> bool {
    phase.is_knockout() && score.is_draw()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_labels_round_trip_through_letters() {
        let label: GroupLabel = "k".parse().unwrap();
        assert_eq!(label.letter(), 'K');
        assert_eq!(label.index(), 10);
        assert!("M".parse::<GroupLabel>().is_err());
        assert!("AB".parse::<GroupLabel>().is_err());
    }

    #[test]
    fn score_parses_common_separators() {
        assert_eq!("2-1".parse::<Score>().unwrap(), Score::new(2, 1));
        assert_eq!("0:0".parse::<Score>().unwrap(), Score::new(0, 0));
        assert!("2".parse::<Score>().is_err());
        assert!("1-2-3".parse::<Score>().is_err());
        assert_eq!("3 0".parse::<Score>().unwrap(), Score::new(3, 0));
        assert_eq!(" 2 - 1 ".parse::<Score>().unwrap(), Score::new(2, 1));
    }

    #[test]
    fn score_rejects_stray_signs_and_separators() {
        for raw in ["-1-2", "2x1", "2-", ":1", "+1-2", "1--2", "2-1x", "300-1"] {
            assert!(raw.parse::<Score>().is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn fair_play_weights_cards() {
        let cards = Cards {
            yellow: 3,
            second_yellow: 1,
            red: 1,
        };
        assert_eq!(cards.fair_play(), -10);
        assert_eq!(Cards::default().fair_play(), 0);
    }
}
