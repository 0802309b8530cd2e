use wc26_pool::model::{Phase, Score};
use wc26_pool::scoring::{OfficialResult, PredictedResult, score_prediction};

fn predicted(h: u8, a: u8, pens: Option<(u8, u8)>) -> PredictedResult {
    PredictedResult {
        score: Score::new(h, a),
        penalties: pens.map(|(h, a)| Score::new(h, a)),
    }
}

fn official(h: u8, a: u8, pens: Option<(u8, u8)>) -> OfficialResult {
    OfficialResult {
        score: Score::new(h, a),
        penalties: pens.map(|(h, a)| Score::new(h, a)),
    }
}

#[test]
fn regulation_tiers_in_the_group_stage() {
    let guess = predicted(2, 1, None);
    assert_eq!(score_prediction(&guess, &official(2, 1, None), Phase::Group), 5);
    assert_eq!(score_prediction(&guess, &official(2, 0, None), Phase::Group), 2);
    assert_eq!(score_prediction(&guess, &official(1, 1, None), Phase::Group), 2);
    assert_eq!(score_prediction(&guess, &official(1, 0, None), Phase::Group), 1);
    assert_eq!(score_prediction(&guess, &official(0, 2, None), Phase::Group), 0);
}

#[test]
fn draw_outcome_earns_a_point() {
    let guess = predicted(0, 0, None);
    assert_eq!(score_prediction(&guess, &official(2, 2, None), Phase::Group), 1);
}

#[test]
fn exact_score_in_the_final_is_tripled() {
    let guess = predicted(2, 1, None);
    assert_eq!(score_prediction(&guess, &official(2, 1, None), Phase::Final), 15);
}

#[test]
fn phase_multipliers_round_half_up() {
    let guess = predicted(2, 1, None);
    let one_side = official(2, 0, None);
    assert_eq!(score_prediction(&guess, &one_side, Phase::RoundOf32), 3);
    assert_eq!(score_prediction(&guess, &one_side, Phase::RoundOf16), 3);
    assert_eq!(score_prediction(&guess, &one_side, Phase::QuarterFinal), 4);
    assert_eq!(score_prediction(&guess, &one_side, Phase::SemiFinal), 5);
    assert_eq!(score_prediction(&guess, &one_side, Phase::ThirdPlace), 4);
    assert_eq!(score_prediction(&guess, &one_side, Phase::Final), 6);

    let outcome = official(1, 0, None);
    assert_eq!(score_prediction(&guess, &outcome, Phase::RoundOf32), 1);
    assert_eq!(score_prediction(&guess, &outcome, Phase::RoundOf16), 2);
    assert_eq!(score_prediction(&guess, &outcome, Phase::SemiFinal), 3);
}

#[test]
fn shootout_component_adds_before_the_multiplier() {
    // Regulation: predicted 2-2 against 1-1 is a matching draw (1). Shootout:
    // 4-2 against 4-3 matches the home count (2).
    let guess = predicted(2, 2, Some((4, 2)));
    let actual = official(1, 1, Some((4, 3)));
    assert_eq!(score_prediction(&guess, &actual, Phase::QuarterFinal), 6);
    assert_eq!(score_prediction(&guess, &actual, Phase::RoundOf16), 5);
    assert_eq!(score_prediction(&guess, &actual, Phase::Final), 9);
}

#[test]
fn exact_draw_and_exact_shootout() {
    let guess = predicted(1, 1, Some((3, 4)));
    let actual = official(1, 1, Some((3, 4)));
    assert_eq!(score_prediction(&guess, &actual, Phase::RoundOf32), 13);
}

#[test]
fn shootout_winner_alone_earns_a_point() {
    let guess = predicted(0, 0, Some((5, 4)));
    let actual = official(1, 1, Some((3, 2)));
    // 1 for the draw, 1 for the shootout winner.
    assert_eq!(score_prediction(&guess, &actual, Phase::QuarterFinal), 4);

    let wrong_side = predicted(0, 0, Some((2, 3)));
    assert_eq!(score_prediction(&wrong_side, &actual, Phase::QuarterFinal), 2);
}

#[test]
fn level_predicted_shootout_reads_as_away_win() {
    let guess = predicted(0, 0, Some((5, 5)));
    let away = official(1, 1, Some((3, 4)));
    let home = official(1, 1, Some((4, 3)));
    assert_eq!(score_prediction(&guess, &away, Phase::QuarterFinal), 4);
    assert_eq!(score_prediction(&guess, &home, Phase::QuarterFinal), 2);
}

#[test]
fn shootout_is_ignored_when_not_applicable() {
    // Official result decided in regulation.
    let guess = predicted(1, 1, Some((4, 3)));
    assert_eq!(score_prediction(&guess, &official(2, 1, None), Phase::SemiFinal), 5);

    // Prediction without a shootout entry.
    let bare = predicted(1, 1, None);
    assert_eq!(
        score_prediction(&bare, &official(1, 1, Some((4, 3))), Phase::RoundOf32),
        6
    );

    // Group matches never look at penalties.
    assert_eq!(
        score_prediction(&guess, &official(1, 1, Some((4, 3))), Phase::Group),
        5
    );
}
