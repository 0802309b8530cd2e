use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::{Match, Prediction, Score, penalties_allowed};

/// Highest goal count accepted for either side, in results and predictions.
pub const MAX_GOALS: u8 = 20;

/// A prediction as submitted, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub score: Score,
    #[serde(default)]
    pub penalties: Option<Score>,
}

/// Moment after which the match no longer takes predictions.
pub fn prediction_deadline(m: &Match, lock: Duration) -> DateTime<Utc> {
    m.kickoff - lock
}

pub fn check_goals(score: Score) -> EngineResult<()> {
    for value in [score.home, score.away] {
        if value > MAX_GOALS {
            return Err(EngineError::GoalsOutOfRange {
                value,
                max: MAX_GOALS,
            });
        }
    }
    Ok(())
}

/// Validates a submission and normalises it into the stored prediction.
///
/// A knockout draw must name a shootout result; everywhere else a shootout entry
/// is dropped. Points start unset.
pub fn accept_prediction(
    m: &Match,
    user_id: &str,
    input: PredictionInput,
    now: DateTime<Utc>,
    lock: Duration,
) -> EngineResult<Prediction> {
    check_goals(input.score)?;

    let closed_at = prediction_deadline(m, lock);
    if now >= closed_at {
        return Err(EngineError::PredictionClosed {
            round: m.round.clone(),
            closed_at,
        });
    }

    let penalties = if penalties_allowed(m.phase, input.score) {
        let Some(pens) = input.penalties else {
            return Err(EngineError::MissingPredictedPenalties { phase: m.phase });
        };
        check_goals(pens)?;
        Some(pens)
    } else {
        None
    };

    Ok(Prediction {
        user_id: user_id.to_string(),
        match_id: m.id.clone(),
        score: input.score,
        penalties,
        points: None,
    })
}
