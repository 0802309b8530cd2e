use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use wc26_pool::bracket::BracketStage;
use wc26_pool::config::Config;
use wc26_pool::model::{GroupLabel, Score, Team};
use wc26_pool::predictions::PredictionInput;
use wc26_pool::{logging, store, workflow};

const DEFAULT_START: &str = "2026-06-11T17:00:00Z";

const USAGE: &str = "usage: wc26_pool [--db <path>] [--json] <command>

commands:
  init
  seed --teams <teams.json> [--start <rfc3339>]
  standings <GROUP>
  classify
  advance [r32|r16|qf|sf]
  result <ROUND> <H-A> [<PH-PA>]
  predict <USER> <ROUND> <H-A> [<PH-PA>]
  recalc
  leaderboard [limit]
  annex-audit";

/// Options that take a value, as `--name value` or `--name=value`.
const VALUE_FLAGS: &[&str] = &["db", "teams", "start"];

#[derive(Debug)]
struct Args {
    positional: Vec<String>,
    options: HashMap<String, String>,
    json: bool,
}

impl Args {
    fn parse(raw: Vec<String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut options = HashMap::new();
        let mut json = false;
        let mut iter = raw.into_iter();
        while let Some(arg) = iter.next() {
            let Some(flag) = arg.strip_prefix("--") else {
                positional.push(arg);
                continue;
            };
            if flag == "json" {
                json = true;
                continue;
            }
            let (name, inline) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (flag, None),
            };
            if !VALUE_FLAGS.contains(&name) {
                bail!("unknown option --{name}\n\n{USAGE}");
            }
            let value = match inline {
                Some(value) => value,
                None => iter
                    .next()
                    .ok_or_else(|| anyhow!("--{name} needs a value"))?,
            };
            options.insert(name.to_string(), value.trim().to_string());
        }
        Ok(Self {
            positional,
            options,
            json,
        })
    }

    fn arg(&self, idx: usize, name: &str) -> Result<&str> {
        self.positional
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing <{name}>\n\n{USAGE}"))
    }

    fn opt_arg(&self, idx: usize) -> Option<&str> {
        self.positional.get(idx).map(String::as_str)
    }
}

fn main() -> Result<()> {
    logging::init_tracing("info")?;
    let args = Args::parse(std::env::args().skip(1).collect())?;

    let mut cfg = Config::from_env();
    if let Some(path) = args.options.get("db").filter(|p| !p.is_empty()) {
        cfg.db_path = PathBuf::from(path);
    }

    let Some(command) = args.positional.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };

    match command {
        "init" => {
            store::open_db(&cfg.db_path)?;
            println!("DB ready: {}", cfg.db_path.display());
        }
        "seed" => cmd_seed(&cfg, &args)?,
        "standings" => cmd_standings(&cfg, &args)?,
        "classify" => cmd_classify(&cfg, &args)?,
        "advance" => cmd_advance(&cfg, &args)?,
        "result" => cmd_result(&cfg, &args)?,
        "predict" => cmd_predict(&cfg, &args)?,
        "recalc" => {
            let mut conn = store::open_db(&cfg.db_path)?;
            let summary = workflow::recalculate_all_points(&mut conn, cfg.workers)?;
            emit(&args, &summary, || {
                println!(
                    "Rescored {} predictions over {} finished matches ({} users)",
                    summary.predictions, summary.matches, summary.users
                );
            })?;
        }
        "leaderboard" => cmd_leaderboard(&cfg, &args)?,
        "annex-audit" => cmd_annex_audit(&cfg, &args)?,
        "help" | "-h" => println!("{USAGE}"),
        other => bail!("unknown command `{other}`\n\n{USAGE}"),
    }
    Ok(())
}

fn emit<T: Serialize>(args: &Args, value: &T, text: impl FnOnce()) -> Result<()> {
    if args.json {
        let out = serde_json::to_string_pretty(value).context("serialize output")?;
        println!("{out}");
    } else {
        text();
    }
    Ok(())
}

fn cmd_seed(cfg: &Config, args: &Args) -> Result<()> {
    let teams_path = args
        .options
        .get("teams")
        .ok_or_else(|| anyhow!("seed needs --teams <teams.json>"))?;
    let raw = std::fs::read_to_string(teams_path)
        .with_context(|| format!("read teams file {teams_path}"))?;
    let teams: Vec<Team> =
        serde_json::from_str(&raw).with_context(|| format!("parse teams file {teams_path}"))?;
    let start_raw = args
        .options
        .get("start")
        .map(String::as_str)
        .unwrap_or(DEFAULT_START);
    let start = DateTime::parse_from_rfc3339(start_raw)
        .with_context(|| format!("invalid --start `{start_raw}`"))?
        .with_timezone(&Utc);

    let mut conn = store::open_db(&cfg.db_path)?;
    let summary = workflow::seed_tournament(&mut conn, &teams, start)?;
    emit(args, &summary, || {
        println!("Seeded {} teams and {} matches", summary.teams, summary.matches);
    })
}

fn cmd_standings(cfg: &Config, args: &Args) -> Result<()> {
    let group: GroupLabel = args.arg(1, "GROUP")?.parse()?;
    let conn = store::open_db(&cfg.db_path)?;
    let rows = workflow::group_table(&conn, group)?;
    emit(args, &rows, || {
        println!("Group {group}");
        println!(
            "{:<3}{:<24}{:>3}{:>3}{:>3}{:>3}{:>4}{:>4}{:>5}{:>5}{:>5}",
            "#", "team", "P", "W", "D", "L", "GF", "GA", "GD", "FP", "Pts"
        );
        for (idx, row) in rows.iter().enumerate() {
            println!(
                "{:<3}{:<24}{:>3}{:>3}{:>3}{:>3}{:>4}{:>4}{:>5}{:>5}{:>5}",
                idx + 1,
                row.team.name,
                row.played,
                row.won,
                row.drawn,
                row.lost,
                row.goals_for,
                row.goals_against,
                row.goal_difference,
                row.fair_play,
                row.points
            );
        }
    })
}

fn cmd_classify(cfg: &Config, args: &Args) -> Result<()> {
    let table = cfg.annex_c_table()?;
    let mut conn = store::open_db(&cfg.db_path)?;
    let result = workflow::classify_group_stage(&mut conn, &table)?;
    emit(args, &result, || {
        let thirds: String = result.best_thirds.groups.iter().map(|g| g.letter()).collect();
        println!("Qualified thirds: {thirds}");
        for (round, (home, away)) in &result.slots {
            println!("  {round}: {home} vs {away}");
        }
        println!("Fixtures updated: {}", result.changed);
    })
}

fn cmd_advance(cfg: &Config, args: &Args) -> Result<()> {
    let stage = args.opt_arg(1).map(str::parse::<BracketStage>).transpose()?;
    let mut conn = store::open_db(&cfg.db_path)?;
    let summary = workflow::advance_knockouts(&mut conn, stage)?;
    emit(args, &summary, || {
        for a in &summary.assignments {
            println!("  {}: {} vs {}", a.round, a.home, a.away);
        }
        for round in &summary.skipped {
            println!("  {round}: already played, left unchanged");
        }
        println!("Fixtures updated: {}", summary.changed);
    })
}

fn cmd_result(cfg: &Config, args: &Args) -> Result<()> {
    let round = args.arg(1, "ROUND")?;
    let score: Score = args.arg(2, "H-A")?.parse()?;
    let penalties = args.opt_arg(3).map(str::parse::<Score>).transpose()?;

    let mut conn = store::open_db(&cfg.db_path)?;
    let m = store::find_match_by_round(&conn, round)?
        .ok_or_else(|| anyhow!("no match with round label {round}"))?;
    let result = workflow::FinalResult::new(score, penalties);
    let summary = workflow::finalize_result(&mut conn, &m.id, &result)?;
    emit(args, &summary, || {
        println!(
            "{} finalized {}; scored {} predictions",
            summary.round, score, summary.predictions_scored
        );
    })
}

fn cmd_predict(cfg: &Config, args: &Args) -> Result<()> {
    let user = args.arg(1, "USER")?;
    let round = args.arg(2, "ROUND")?;
    let score: Score = args.arg(3, "H-A")?.parse()?;
    let penalties = args.opt_arg(4).map(str::parse::<Score>).transpose()?;

    let conn = store::open_db(&cfg.db_path)?;
    let m = store::find_match_by_round(&conn, round)?
        .ok_or_else(|| anyhow!("no match with round label {round}"))?;
    let input = PredictionInput { score, penalties };
    let prediction =
        workflow::submit_prediction(&conn, cfg.prediction_lock, user, &m.id, input, Utc::now())?;
    emit(args, &prediction, || {
        match prediction.penalties {
            Some(pens) => println!("{user}: {round} {} ({pens} on penalties)", prediction.score),
            None => println!("{user}: {round} {}", prediction.score),
        }
    })
}

fn cmd_leaderboard(cfg: &Config, args: &Args) -> Result<()> {
    let limit = args
        .opt_arg(1)
        .map(|raw| raw.parse::<usize>().with_context(|| format!("invalid limit `{raw}`")))
        .transpose()?;
    let conn = store::open_db(&cfg.db_path)?;
    let rows = workflow::leaderboard(&conn, limit)?;
    emit(args, &rows, || {
        for row in &rows {
            println!(
                "{:>3}. {:<20} {:>4} pts  exact={} partial={} rate={:.1}%",
                row.position,
                row.user_id,
                row.total_points,
                row.exact_hits,
                row.partial_hits,
                row.hit_rate
            );
        }
    })
}

#[derive(Serialize)]
struct AnnexAudit {
    rows: usize,
    complete: bool,
    missing: Vec<String>,
}

fn cmd_annex_audit(cfg: &Config, args: &Args) -> Result<()> {
    let table = cfg.annex_c_table()?;
    let missing: Vec<String> = table
        .missing_combinations()
        .iter()
        .map(ToString::to_string)
        .collect();
    let audit = AnnexAudit {
        rows: table.len(),
        complete: table.is_complete(),
        missing,
    };
    info!(rows = audit.rows, missing = audit.missing.len(), "annex C audit");
    emit(args, &audit, || {
        println!("Annex C rows: {}", audit.rows);
        println!("Missing combinations: {}", audit.missing.len());
        for key in audit.missing.iter().take(10) {
            println!("  {key}");
        }
        if audit.missing.len() > 10 {
            println!("  ... {} more", audit.missing.len() - 10);
        }
    })
}
