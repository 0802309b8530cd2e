use crate::model::{Outcome, Phase, Score};

pub const EXACT_POINTS: u32 = 5;
pub const ONE_SIDE_POINTS: u32 = 2;
pub const OUTCOME_POINTS: u32 = 1;

/// What the user entered for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictedResult {
    pub score: Score,
    pub penalties: Option<Score>,
}

/// The official result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfficialResult {
    pub score: Score,
    pub penalties: Option<Score>,
}

/// Points for one prediction: regulation points plus, for a knockout match settled
/// on penalties, shootout points; the sum is scaled by the phase multiplier and
/// rounded half up.
pub fn score_prediction(
    prediction: &PredictedResult,
    official: &OfficialResult,
    phase: Phase,
) -> u32 {
    let mut raw = regulation_points(prediction.score, official.score);

    if phase.is_knockout()
        && official.score.is_draw()
        && let (Some(actual), Some(predicted)) = (official.penalties, prediction.penalties)
    {
        raw += shootout_points(predicted, actual);
    }

    apply_multiplier(raw, phase)
}

pub fn regulation_points(predicted: Score, actual: Score) -> u32 {
    if predicted == actual {
        EXACT_POINTS
    } else if predicted.home == actual.home || predicted.away == actual.away {
        ONE_SIDE_POINTS
    } else if predicted.outcome() == actual.outcome() {
        OUTCOME_POINTS
    } else {
        0
    }
}

pub fn shootout_points(predicted: Score, actual: Score) -> u32 {
    if predicted == actual {
        EXACT_POINTS
    } else if predicted.home == actual.home || predicted.away == actual.away {
        ONE_SIDE_POINTS
    } else if shootout_winner(predicted) == shootout_winner(actual) {
        OUTCOME_POINTS
    } else {
        0
    }
}

// A shootout has no draw; a level entry counts as the away side going through.
fn shootout_winner(score: Score) -> Outcome {
    if score.home > score.away {
        Outcome::HomeWin
    } else {
        Outcome::AwayWin
    }
}

/// `raw * multiplier`, rounded to the nearest integer with halves going up.
pub fn apply_multiplier(raw: u32, phase: Phase) -> u32 {
    (raw * phase.multiplier_quarters() + 2) / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_rounds_half_up() {
        assert_eq!(apply_multiplier(1, Phase::RoundOf32), 1);
        assert_eq!(apply_multiplier(2, Phase::RoundOf32), 3);
        assert_eq!(apply_multiplier(1, Phase::RoundOf16), 2);
        assert_eq!(apply_multiplier(1, Phase::SemiFinal), 3);
        assert_eq!(apply_multiplier(5, Phase::Final), 15);
        assert_eq!(apply_multiplier(0, Phase::Final), 0);
    }
}
