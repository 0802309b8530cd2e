use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use wc26_pool::config::Config;
use wc26_pool::model::{Score, penalties_allowed};
use wc26_pool::workflow::{self, FinalResult};
use wc26_pool::{logging, store};

const DEFAULT_COUNT: usize = 5;

/// Finishes the next few playable matches with random scores. Test data only.
fn main() -> Result<()> {
    logging::init_tracing("info")?;
    let mut cfg = Config::from_env();
    if let Some(path) = parse_value_arg("db") {
        cfg.db_path = PathBuf::from(path);
    }
    let count = parse_value_arg("count")
        .map(|raw| raw.parse::<usize>().with_context(|| format!("invalid --count `{raw}`")))
        .transpose()?
        .unwrap_or(DEFAULT_COUNT);
    let mut rng = match parse_value_arg("seed") {
        Some(raw) => StdRng::seed_from_u64(
            raw.parse::<u64>()
                .with_context(|| format!("invalid --seed `{raw}`"))?,
        ),
        None => StdRng::from_entropy(),
    };

    let mut conn = store::open_db(&cfg.db_path)?;
    let pending: Vec<_> = store::load_matches(&conn)?
        .into_iter()
        .filter(|m| !m.is_finished())
        .collect();

    let mut finished = 0;
    let mut scored = 0;
    for m in pending {
        if finished == count {
            break;
        }
        if m.teams().is_none() {
            println!("{} has no teams yet, skipping", m.round);
            continue;
        }
        let score = Score::new(rng.gen_range(0..5), rng.gen_range(0..5));
        let penalties = penalties_allowed(m.phase, score).then(|| random_shootout(&mut rng));
        let result = FinalResult::new(score, penalties);
        let summary = workflow::finalize_result(&mut conn, &m.id, &result)?;
        match penalties {
            Some(pens) => println!("{}: {score} ({pens} pens)", m.round),
            None => println!("{}: {score}", m.round),
        }
        finished += 1;
        scored += summary.predictions_scored;
    }

    info!(finished, scored, "simulation complete");
    println!("Matches finished: {finished}");
    println!("Predictions scored: {scored}");
    Ok(())
}

fn random_shootout(rng: &mut impl Rng) -> Score {
    let home = rng.gen_range(2..=6);
    let mut away = rng.gen_range(2..=6);
    if away == home {
        away = if rng.gen_bool(0.5) { home + 1 } else { home - 1 };
    }
    Score::new(home, away)
}

fn parse_value_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("--{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == &format!("--{name}") {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
