use std::collections::BTreeMap;

use wc26_pool::error::EngineError;
use wc26_pool::model::{Cards, GroupLabel, Team};
use wc26_pool::standings::StandingRow;
use wc26_pool::third_place::select_best_third_places;

fn row(
    group: GroupLabel,
    slot: usize,
    points: u32,
    goal_difference: i32,
    goals_for: u32,
) -> StandingRow {
    let id = format!("{}{}", group.letter().to_ascii_lowercase(), slot);
    StandingRow {
        team: Team {
            id: id.clone(),
            name: id.to_uppercase(),
            code: id.to_uppercase(),
            group,
            fifa_ranking: 50,
        },
        points,
        played: 3,
        won: points / 3,
        drawn: points % 3,
        lost: 3 - points / 3 - points % 3,
        goals_for,
        goals_against: (goals_for as i32 - goal_difference) as u32,
        goal_difference,
        cards: Cards::default(),
        fair_play: 0,
    }
}

/// Twelve tables whose third-placed rows are given by `thirds` (points, GD, GF).
fn tables(thirds: &[(u32, i32, u32)]) -> BTreeMap<GroupLabel, Vec<StandingRow>> {
    GroupLabel::ALL
        .iter()
        .zip(thirds)
        .map(|(group, &(points, gd, gf))| {
            let table = vec![
                row(*group, 1, 9, 6, 7),
                row(*group, 2, 6, 2, 4),
                row(*group, 3, points, gd, gf),
                row(*group, 4, 0, -8, 1),
            ];
            (*group, table)
        })
        .collect()
}

#[test]
fn keeps_best_eight_by_points_then_goal_difference() {
    let thirds = [
        (3, 0, 3),  // A
        (4, 1, 3),  // B
        (3, -1, 2), // C
        (1, -3, 1), // D
        (4, 0, 2),  // E
        (3, 2, 4),  // F
        (3, 0, 4),  // G
        (2, -2, 2), // H
        (6, 3, 5),  // I
        (3, 0, 2),  // J
        (0, -5, 0), // K
        (3, 1, 3),  // L
    ];
    let best = select_best_third_places(&tables(&thirds)).unwrap();

    let letters: String = best.groups.iter().map(|g| g.letter()).collect();
    assert_eq!(letters, "IBEFLGAJ");
    assert_eq!(best.qualified.len(), 8);
    assert_eq!(best.eliminated.len(), 4);
    let out: Vec<&str> = best.eliminated.iter().map(|r| r.team.id.as_str()).collect();
    assert_eq!(out, vec!["c3", "h3", "d3", "k3"]);

    let by_group = best.team_by_group();
    assert_eq!(by_group.len(), 8);
    assert_eq!(by_group[&GroupLabel::from_letter('I').unwrap()], "i3");
}

#[test]
fn identical_records_fall_back_to_ranking_and_name() {
    let thirds = [(3, 0, 3); 12];
    let mut all = tables(&thirds);
    all.get_mut(&GroupLabel::from_letter('L').unwrap()).unwrap()[2]
        .team
        .fifa_ranking = 1;

    let best = select_best_third_places(&all).unwrap();
    let letters: String = best.groups.iter().map(|g| g.letter()).collect();
    assert_eq!(letters, "LABCDEFG");
}

#[test]
fn short_table_is_a_configuration_error() {
    let mut all = tables(&[(3, 0, 3); 12]);
    let d = GroupLabel::from_letter('D').unwrap();
    all.get_mut(&d).unwrap().truncate(2);

    let err = select_best_third_places(&all).unwrap_err();
    assert_eq!(err, EngineError::GroupTooSmall { group: d, teams: 2 });
    assert!(err.is_configuration());
}

#[test]
fn every_group_table_is_required() {
    for kept in [7, 8, 11] {
        let mut all = tables(&[(3, 0, 3); 12]);
        all.retain(|g, _| g.index() < kept);

        let err = select_best_third_places(&all).unwrap_err();
        assert_eq!(
            err,
            EngineError::WrongGroupCount {
                found: kept,
                expected: 12
            }
        );
        assert!(err.is_configuration());
    }
}
