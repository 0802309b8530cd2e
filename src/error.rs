//! Error taxonomy for the progression and scoring engine.
//!
//! Configuration errors mean the setup data is incomplete or malformed and must reach
//! the operator. Invariant violations mean a record is corrupt. Intake rejections are
//! ordinary "no" answers to a submitted result or prediction.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{GroupLabel, Phase};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    // -- parsing
    #[error("unknown group label `{label}` (expected A-L)")]
    UnknownGroup { label: String },
    #[error("unknown phase `{raw}`")]
    UnknownPhase { raw: String },
    #[error("unknown match status `{raw}`")]
    UnknownStatus { raw: String },
    #[error("invalid score `{raw}` (expected e.g. 2-1)")]
    InvalidScore { raw: String },

    // -- configuration
    #[error("team {team_id} is listed in group {expected} but belongs to group {actual}")]
    TeamOutsideGroup {
        team_id: String,
        expected: GroupLabel,
        actual: GroupLabel,
    },
    #[error("group {group} has {teams} teams, cannot take a third-place finisher")]
    GroupTooSmall { group: GroupLabel, teams: usize },
    #[error("group {group} has {teams} teams, expected {expected}")]
    GroupSizeMismatch {
        group: GroupLabel,
        teams: usize,
        expected: usize,
    },
    #[error("{found} group tables supplied, expected {expected}")]
    WrongGroupCount { found: usize, expected: usize },
    #[error("exactly 8 third-place groups are required, got {found}")]
    ThirdPlaceGroupCount { found: usize },
    #[error("group {group} appears more than once")]
    DuplicateGroup { group: GroupLabel },
    #[error("no Annex C combination for third-place groups {key}")]
    AnnexCombinationMissing { key: String },
    #[error("no third-place team found for group {group}")]
    ThirdPlaceTeamMissing { group: GroupLabel },
    #[error("Annex C table line {line}: {reason}")]
    AnnexTableRow { line: usize, reason: String },
    #[error("bracket graph: {reason}")]
    BracketGraph { reason: String },

    // -- invariant violations
    #[error("knockout match {round} ended level with no penalty shootout winner")]
    UnresolvedKnockoutTie { round: String },
    #[error("penalties recorded for {round} but it is not a knockout draw")]
    PenaltiesOutsideKnockoutDraw { round: String },
    #[error("knockout match {round} ended level, penalties are required")]
    MissingKnockoutPenalties { round: String },
    #[error("penalty shootout for {round} cannot end level")]
    TiedPenalties { round: String },
    #[error("match {round} is already finished")]
    MatchAlreadyFinished { round: String },

    // -- intake rejections
    #[error("unknown match {match_id}")]
    UnknownMatch { match_id: String },
    #[error("match {round} has no teams assigned yet")]
    TeamsNotAssigned { round: String },
    #[error("goals must be between 0 and {max}, got {value}")]
    GoalsOutOfRange { value: u8, max: u8 },
    #[error("predictions for {round} closed at {closed_at}")]
    PredictionClosed {
        round: String,
        closed_at: DateTime<Utc>,
    },
    #[error("a {phase} draw prediction must include a penalty shootout")]
    MissingPredictedPenalties { phase: Phase },
    #[error("group stage is incomplete: {pending} matches still pending")]
    GroupStageIncomplete { pending: usize },
}

impl EngineError {
    /// Incomplete or malformed setup data. Never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::TeamOutsideGroup { .. }
                | EngineError::GroupTooSmall { .. }
                | EngineError::GroupSizeMismatch { .. }
                | EngineError::WrongGroupCount { .. }
                | EngineError::ThirdPlaceGroupCount { .. }
                | EngineError::DuplicateGroup { .. }
                | EngineError::AnnexCombinationMissing { .. }
                | EngineError::ThirdPlaceTeamMissing { .. }
                | EngineError::AnnexTableRow { .. }
                | EngineError::BracketGraph { .. }
        )
    }

    /// Corrupt match data the engine refuses to paper over.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            EngineError::UnresolvedKnockoutTie { .. }
                | EngineError::PenaltiesOutsideKnockoutDraw { .. }
                | EngineError::MissingKnockoutPenalties { .. }
                | EngineError::TiedPenalties { .. }
                | EngineError::MatchAlreadyFinished { .. }
        )
    }
}
