use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use wc26_pool::annex_c::AnnexCTable;
use wc26_pool::bracket::{BRACKET, advance_bracket_round};
use wc26_pool::model::{GroupLabel, Match, MatchStatus, Phase, Score, Team};
use wc26_pool::schedule::build_schedule;
use wc26_pool::scoring::{OfficialResult, PredictedResult, score_prediction};
use wc26_pool::standings::{StandingRow, compute_group_standings};
use wc26_pool::third_place::select_best_third_places;

fn teams() -> Vec<Team> {
    serde_json::from_str(TEAMS_JSON).expect("valid fixture json")
}

/// Full schedule with every match played; scores cycle through a small pattern so
/// the tables exercise head-to-head and goal-difference steps.
fn played_schedule(teams: &[Team]) -> Vec<Match> {
    let start = Utc.with_ymd_and_hms(2026, 6, 11, 17, 0, 0).unwrap();
    let mut matches = build_schedule(teams, start).expect("valid schedule");
    for (idx, m) in matches.iter_mut().enumerate() {
        if m.home_team.is_none() {
            m.home_team = Some(format!("h{idx}"));
            m.away_team = Some(format!("a{idx}"));
        }
        let home = (idx % 4) as u8;
        let away = ((idx / 3) % 3) as u8;
        m.score = Some(Score::new(home, away));
        if m.phase.is_knockout() && home == away {
            m.penalties = Some(Score::new(4, 3));
        }
        m.status = MatchStatus::Finished;
    }
    matches
}

fn group_tables(teams: &[Team], matches: &[Match]) -> BTreeMap<GroupLabel, Vec<StandingRow>> {
    GroupLabel::ALL
        .iter()
        .map(|group| {
            let members: Vec<Team> = teams.iter().filter(|t| t.group == *group).cloned().collect();
            let rows = compute_group_standings(*group, &members, matches).unwrap();
            (*group, rows)
        })
        .collect()
}

fn bench_group_standings(c: &mut Criterion) {
    let teams = teams();
    let matches = played_schedule(&teams);
    c.bench_function("group_standings_all", |b| {
        b.iter(|| {
            let tables = group_tables(black_box(&teams), black_box(&matches));
            black_box(tables.len());
        })
    });
}

fn bench_third_place_resolution(c: &mut Criterion) {
    let teams = teams();
    let matches = played_schedule(&teams);
    let tables = group_tables(&teams, &matches);
    let table = AnnexCTable::embedded().expect("embedded table");
    c.bench_function("best_thirds_and_annex_lookup", |b| {
        b.iter(|| {
            let best = select_best_third_places(black_box(&tables)).unwrap();
            let slots = table.resolve_third_place_slots(&best.groups, &best.team_by_group());
            black_box(slots.is_ok());
        })
    });
}

fn bench_bracket_advance(c: &mut Criterion) {
    let teams = teams();
    let matches = played_schedule(&teams);
    c.bench_function("bracket_advance_all_edges", |b| {
        b.iter(|| {
            let out = advance_bracket_round(black_box(&matches), &BRACKET).unwrap();
            black_box(out.len());
        })
    });
}

fn bench_scoring(c: &mut Criterion) {
    let official = OfficialResult {
        score: Score::new(1, 1),
        penalties: Some(Score::new(4, 3)),
    };
    let predictions: Vec<PredictedResult> = (0..10_000u32)
        .map(|i| PredictedResult {
            score: Score::new((i % 4) as u8, (i / 4 % 4) as u8),
            penalties: Some(Score::new((i % 6) as u8, (i / 6 % 6) as u8)),
        })
        .collect();
    c.bench_function("score_10k_predictions", |b| {
        b.iter(|| {
            let total: u32 = predictions
                .iter()
                .map(|p| score_prediction(black_box(p), &official, Phase::QuarterFinal))
                .sum();
            black_box(total);
        })
    });
}

criterion_group!(
    perf,
    bench_group_standings,
    bench_third_place_resolution,
    bench_bracket_advance,
    bench_scoring
);
criterion_main!(perf);

static TEAMS_JSON: &str = include_str!("../tests/fixtures/teams.json");
