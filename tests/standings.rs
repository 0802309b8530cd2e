use chrono::{TimeZone, Utc};

use wc26_pool::error::EngineError;
use wc26_pool::model::{Cards, GroupLabel, Match, MatchStatus, Phase, Score, Team};
use wc26_pool::standings::{compute_group_standings, group_is_complete};

fn group(letter: char) -> GroupLabel {
    GroupLabel::from_letter(letter).expect("valid group")
}

fn team(id: &str, ranking: u32) -> Team {
    Team {
        id: id.to_string(),
        name: id.to_uppercase(),
        code: id.to_uppercase(),
        group: group('A'),
        fifa_ranking: ranking,
    }
}

fn four_teams() -> Vec<Team> {
    vec![team("a", 1), team("b", 2), team("c", 3), team("d", 4)]
}

fn played(round: &str, home: &str, away: &str, h: u8, a: u8) -> Match {
    Match {
        id: format!("t-{round}"),
        phase: Phase::Group,
        group: Some(group('A')),
        round: round.to_string(),
        kickoff: Utc.with_ymd_and_hms(2026, 6, 11, 17, 0, 0).unwrap(),
        home_team: Some(home.to_string()),
        away_team: Some(away.to_string()),
        score: Some(Score::new(h, a)),
        penalties: None,
        status: MatchStatus::Finished,
        home_cards: Cards::default(),
        away_cards: Cards::default(),
    }
}

fn pending(round: &str, home: &str, away: &str) -> Match {
    Match {
        score: None,
        status: MatchStatus::Pending,
        ..played(round, home, away, 0, 0)
    }
}

fn order(rows: &[wc26_pool::standings::StandingRow]) -> Vec<&str> {
    rows.iter().map(|r| r.team.id.as_str()).collect()
}

#[test]
fn counts_only_finished_matches() {
    let matches = vec![
        played("A1", "a", "b", 2, 0),
        played("A2", "c", "d", 1, 1),
        pending("A3", "a", "c"),
    ];
    let rows = compute_group_standings(group('A'), &four_teams(), &matches).unwrap();

    assert_eq!(order(&rows), vec!["a", "c", "d", "b"]);
    let a = &rows[0];
    assert_eq!((a.points, a.played, a.won, a.goals_for, a.goals_against), (3, 1, 1, 2, 0));
    assert_eq!(a.goal_difference, 2);
    assert_eq!(rows[3].lost, 1);
    assert!(!group_is_complete(group('A'), &matches));
}

#[test]
fn head_to_head_outranks_overall_goal_difference() {
    let matches = vec![
        played("A1", "a", "b", 1, 0),
        played("A2", "c", "a", 1, 0),
        played("A3", "a", "d", 1, 0),
        played("A4", "b", "c", 5, 0),
        played("A5", "b", "d", 5, 0),
        played("A6", "c", "d", 0, 0),
    ];
    let rows = compute_group_standings(group('A'), &four_teams(), &matches).unwrap();

    assert_eq!(rows[0].points, 6);
    assert_eq!(rows[1].points, 6);
    assert!(rows[1].goal_difference > rows[0].goal_difference);
    assert_eq!(order(&rows), vec!["a", "b", "c", "d"]);
    assert!(group_is_complete(group('A'), &matches));
}

#[test]
fn three_way_cycle_falls_back_to_goal_difference() {
    let matches = vec![
        played("A1", "a", "b", 1, 0),
        played("A2", "b", "c", 1, 0),
        played("A3", "c", "a", 1, 0),
        played("A4", "c", "d", 1, 0),
        played("A5", "b", "d", 2, 0),
        played("A6", "a", "d", 3, 0),
    ];
    // Listed worst-ranked first so only the cascade can put them in order.
    let teams = vec![team("c", 1), team("b", 2), team("a", 3), team("d", 4)];
    let rows = compute_group_standings(group('A'), &teams, &matches).unwrap();

    assert!(rows[..3].iter().all(|r| r.points == 6));
    assert_eq!(order(&rows), vec!["a", "b", "c", "d"]);
}

#[test]
fn head_to_head_subgroup_is_reexamined() {
    // a, b and c finish on 6 points. In their mini-league a leads on goals scored
    // while b and c stay level, so b and c are compared again on their own match.
    let matches = vec![
        played("A1", "a", "b", 2, 1),
        played("A2", "b", "c", 1, 0),
        played("A3", "c", "a", 2, 1),
        played("A4", "a", "d", 1, 0),
        played("A5", "b", "d", 1, 0),
        played("A6", "c", "d", 5, 0),
    ];
    let rows = compute_group_standings(group('A'), &four_teams(), &matches).unwrap();

    assert!(rows[..3].iter().all(|r| r.points == 6));
    assert!(rows[2].goal_difference > rows[1].goal_difference);
    assert_eq!(order(&rows), vec!["a", "b", "c", "d"]);
}

#[test]
fn fair_play_breaks_a_full_tie() {
    let mut level = played("A1", "a", "b", 1, 1);
    level.home_cards = Cards {
        yellow: 2,
        second_yellow: 0,
        red: 0,
    };
    let matches = vec![
        level,
        played("A2", "a", "c", 1, 0),
        played("A3", "b", "c", 1, 0),
        played("A4", "a", "d", 1, 0),
        played("A5", "b", "d", 1, 0),
        played("A6", "c", "d", 0, 0),
    ];
    let rows = compute_group_standings(group('A'), &four_teams(), &matches).unwrap();

    assert_eq!(order(&rows)[..2], ["b", "a"]);
    assert_eq!(rows[1].fair_play, -2);
}

#[test]
fn fifa_ranking_then_name_close_the_cascade() {
    let matches = vec![played("A1", "a", "b", 0, 0), played("A2", "c", "d", 0, 0)];
    let teams = vec![team("a", 30), team("b", 10), team("c", 20), team("d", 20)];
    let rows = compute_group_standings(group('A'), &teams, &matches).unwrap();

    // All on one point with identical goals; ranking decides, names split c/d.
    assert_eq!(order(&rows), vec!["b", "c", "d", "a"]);
}

#[test]
fn order_does_not_depend_on_input_order() {
    let matches = vec![
        played("A1", "a", "b", 2, 2),
        played("A2", "c", "d", 1, 0),
        played("A3", "a", "c", 0, 1),
        played("A4", "b", "d", 3, 3),
        played("A5", "a", "d", 1, 1),
        played("A6", "b", "c", 2, 0),
    ];
    let first = compute_group_standings(group('A'), &four_teams(), &matches).unwrap();

    let mut teams = four_teams();
    teams.reverse();
    let mut shuffled = matches.clone();
    shuffled.rotate_left(4);
    let second = compute_group_standings(group('A'), &teams, &shuffled).unwrap();
    let third = compute_group_standings(group('A'), &four_teams(), &matches).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, third);
    let ids: std::collections::HashSet<_> = first.iter().map(|r| r.team.id.clone()).collect();
    assert_eq!(ids.len(), 4);
}

#[test]
fn recomputing_reproduces_identical_rows() {
    let matches = vec![
        played("A1", "a", "b", 3, 1),
        played("A2", "c", "d", 2, 2),
        played("A3", "d", "a", 0, 4),
    ];
    let rows = compute_group_standings(group('A'), &four_teams(), &matches).unwrap();
    let again = compute_group_standings(group('A'), &four_teams(), &matches).unwrap();
    for (x, y) in rows.iter().zip(&again) {
        assert_eq!(
            (x.played, x.won, x.drawn, x.lost, x.goals_for, x.goals_against),
            (y.played, y.won, y.drawn, y.lost, y.goals_for, y.goals_against)
        );
    }
    let a = rows.iter().find(|r| r.team.id == "a").unwrap();
    assert_eq!((a.played, a.won, a.goals_for, a.goals_against), (2, 2, 7, 1));
}

#[test]
fn team_from_another_group_is_a_configuration_error() {
    let mut teams = four_teams();
    teams[3].group = group('B');
    let err = compute_group_standings(group('A'), &teams, &[]).unwrap_err();
    assert!(matches!(err, EngineError::TeamOutsideGroup { .. }));
    assert!(err.is_configuration());
}

#[test]
fn matches_of_other_groups_are_ignored() {
    let mut foreign = played("B1", "a", "b", 5, 0);
    foreign.group = Some(group('B'));
    let rows = compute_group_standings(group('A'), &four_teams(), &[foreign]).unwrap();
    assert!(rows.iter().all(|r| r.played == 0));
}
