//! SQLite persistence for teams, matches and predictions.
//!
//! Functions take a `&Connection` so they run the same inside or outside a
//! transaction (a `Transaction` derefs to `Connection`).

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::model::{Cards, GroupLabel, Match, MatchStatus, Phase, Prediction, Score, Team};

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .context("enable WAL journal")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS teams (
            team_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL,
            group_label TEXT NOT NULL,
            fifa_ranking INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_teams_group ON teams(group_label);

        CREATE TABLE IF NOT EXISTS matches (
            match_id TEXT PRIMARY KEY,
            phase TEXT NOT NULL,
            group_label TEXT NULL,
            round TEXT NOT NULL UNIQUE,
            kickoff TEXT NOT NULL,
            home_team_id TEXT NULL REFERENCES teams(team_id),
            away_team_id TEXT NULL REFERENCES teams(team_id),
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            home_penalties INTEGER NULL,
            away_penalties INTEGER NULL,
            status TEXT NOT NULL,
            home_yellow INTEGER NOT NULL DEFAULT 0,
            home_second_yellow INTEGER NOT NULL DEFAULT 0,
            home_red INTEGER NOT NULL DEFAULT 0,
            away_yellow INTEGER NOT NULL DEFAULT 0,
            away_second_yellow INTEGER NOT NULL DEFAULT 0,
            away_red INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_phase ON matches(phase);
        CREATE INDEX IF NOT EXISTS idx_matches_group ON matches(group_label);

        CREATE TABLE IF NOT EXISTS predictions (
            user_id TEXT NOT NULL,
            match_id TEXT NOT NULL REFERENCES matches(match_id),
            home_goals INTEGER NOT NULL,
            away_goals INTEGER NOT NULL,
            home_penalties INTEGER NULL,
            away_penalties INTEGER NULL,
            points INTEGER NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, match_id)
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_match ON predictions(match_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

// -- teams

pub fn upsert_team(conn: &Connection, team: &Team) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO teams (team_id, name, code, group_label, fifa_ranking)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(team_id) DO UPDATE SET
            name = excluded.name,
            code = excluded.code,
            group_label = excluded.group_label,
            fifa_ranking = excluded.fifa_ranking
        "#,
        params![team.id, team.name, team.code, team.group, team.fifa_ranking],
    )
    .with_context(|| format!("upsert team {}", team.id))?;
    Ok(())
}

pub fn load_teams(conn: &Connection) -> Result<Vec<Team>> {
    let mut stmt = conn
        .prepare(
            "SELECT team_id, name, code, group_label, fifa_ranking
             FROM teams ORDER BY group_label ASC, team_id ASC",
        )
        .context("prepare load teams query")?;
    let rows = stmt
        .query_map([], team_from_row)
        .context("query load teams")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode team row")?);
    }
    Ok(out)
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        group: row.get(3)?,
        fifa_ranking: row.get(4)?,
    })
}

// -- matches

const MATCH_COLUMNS: &str = r#"
    match_id, phase, group_label, round, kickoff,
    home_team_id, away_team_id, home_goals, away_goals, home_penalties, away_penalties,
    status, home_yellow, home_second_yellow, home_red, away_yellow, away_second_yellow, away_red
"#;

pub fn upsert_match(conn: &Connection, m: &Match) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO matches (
            match_id, phase, group_label, round, kickoff,
            home_team_id, away_team_id, home_goals, away_goals, home_penalties, away_penalties,
            status, home_yellow, home_second_yellow, home_red,
            away_yellow, away_second_yellow, away_red, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19
        )
        ON CONFLICT(match_id) DO UPDATE SET
            phase = excluded.phase,
            group_label = excluded.group_label,
            round = excluded.round,
            kickoff = excluded.kickoff,
            home_team_id = excluded.home_team_id,
            away_team_id = excluded.away_team_id,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            home_penalties = excluded.home_penalties,
            away_penalties = excluded.away_penalties,
            status = excluded.status,
            home_yellow = excluded.home_yellow,
            home_second_yellow = excluded.home_second_yellow,
            home_red = excluded.home_red,
            away_yellow = excluded.away_yellow,
            away_second_yellow = excluded.away_second_yellow,
            away_red = excluded.away_red,
            updated_at = excluded.updated_at
        "#,
        params![
            m.id,
            m.phase,
            m.group,
            m.round,
            m.kickoff.to_rfc3339(),
            m.home_team,
            m.away_team,
            m.score.map(|s| s.home),
            m.score.map(|s| s.away),
            m.penalties.map(|s| s.home),
            m.penalties.map(|s| s.away),
            m.status,
            m.home_cards.yellow,
            m.home_cards.second_yellow,
            m.home_cards.red,
            m.away_cards.yellow,
            m.away_cards.second_yellow,
            m.away_cards.red,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert match {}", m.round))?;
    Ok(())
}

pub fn load_matches(conn: &Connection) -> Result<Vec<Match>> {
    query_matches(conn, "1 = 1", &[])
}

pub fn load_matches_by_phase(conn: &Connection, phase: Phase) -> Result<Vec<Match>> {
    query_matches(conn, "phase = ?1", &[&phase])
}

pub fn load_finished_matches(conn: &Connection) -> Result<Vec<Match>> {
    query_matches(conn, "status = 'FINISHED'", &[])
}

pub fn load_group_matches(conn: &Connection, group: GroupLabel) -> Result<Vec<Match>> {
    query_matches(conn, "phase = 'GROUP' AND group_label = ?1", &[&group])
}

pub fn find_match(conn: &Connection, match_id: &str) -> Result<Option<Match>> {
    Ok(query_matches(conn, "match_id = ?1", &[&match_id])?.pop())
}

pub fn find_match_by_round(conn: &Connection, round: &str) -> Result<Option<Match>> {
    Ok(query_matches(conn, "round = ?1", &[&round])?.pop())
}

fn query_matches(conn: &Connection, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<Match>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE {filter} ORDER BY kickoff ASC, round ASC"
    );
    let mut stmt = conn.prepare(&sql).context("prepare load matches query")?;
    let rows = stmt
        .query_map(args, match_from_row)
        .context("query load matches")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode match row")?);
    }
    Ok(out)
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<Match> {
    let kickoff: String = row.get(4)?;
    Ok(Match {
        id: row.get(0)?,
        phase: row.get(1)?,
        group: row.get(2)?,
        round: row.get(3)?,
        kickoff: parse_time(4, &kickoff)?,
        home_team: row.get(5)?,
        away_team: row.get(6)?,
        score: score_pair(row.get(7)?, row.get(8)?),
        penalties: score_pair(row.get(9)?, row.get(10)?),
        status: row.get(11)?,
        home_cards: Cards {
            yellow: row.get(12)?,
            second_yellow: row.get(13)?,
            red: row.get(14)?,
        },
        away_cards: Cards {
            yellow: row.get(15)?,
            second_yellow: row.get(16)?,
            red: row.get(17)?,
        },
    })
}

/// Writes both teams into a fixture; returns whether anything changed.
pub fn set_match_teams(conn: &Connection, round: &str, home: &str, away: &str) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE matches
             SET home_team_id = ?2, away_team_id = ?3, updated_at = ?4
             WHERE round = ?1
               AND (home_team_id IS NOT ?2 OR away_team_id IS NOT ?3)",
            params![round, home, away, Utc::now().to_rfc3339()],
        )
        .with_context(|| format!("assign teams to {round}"))?;
    Ok(changed > 0)
}

/// Stores a final result. Only a pending match moves to finished; returns false if
/// the match was already finished (or does not exist).
pub fn record_result(
    conn: &Connection,
    match_id: &str,
    score: Score,
    penalties: Option<Score>,
    home_cards: Cards,
    away_cards: Cards,
) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE matches
             SET home_goals = ?2, away_goals = ?3, home_penalties = ?4, away_penalties = ?5,
                 home_yellow = ?6, home_second_yellow = ?7, home_red = ?8,
                 away_yellow = ?9, away_second_yellow = ?10, away_red = ?11,
                 status = 'FINISHED', updated_at = ?12
             WHERE match_id = ?1 AND status = 'PENDING'",
            params![
                match_id,
                score.home,
                score.away,
                penalties.map(|p| p.home),
                penalties.map(|p| p.away),
                home_cards.yellow,
                home_cards.second_yellow,
                home_cards.red,
                away_cards.yellow,
                away_cards.second_yellow,
                away_cards.red,
                Utc::now().to_rfc3339(),
            ],
        )
        .with_context(|| format!("record result for {match_id}"))?;
    Ok(changed > 0)
}

// -- predictions

/// One prediction per (user, match); a resubmission replaces the previous one.
pub fn upsert_prediction(conn: &Connection, p: &Prediction) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO predictions (
            user_id, match_id, home_goals, away_goals, home_penalties, away_penalties,
            points, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        ON CONFLICT(user_id, match_id) DO UPDATE SET
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            home_penalties = excluded.home_penalties,
            away_penalties = excluded.away_penalties,
            points = excluded.points,
            updated_at = excluded.updated_at
        "#,
        params![
            p.user_id,
            p.match_id,
            p.score.home,
            p.score.away,
            p.penalties.map(|s| s.home),
            p.penalties.map(|s| s.away),
            p.points,
            now,
        ],
    )
    .with_context(|| format!("upsert prediction {}/{}", p.user_id, p.match_id))?;
    Ok(())
}

pub fn find_prediction(
    conn: &Connection,
    user_id: &str,
    match_id: &str,
) -> Result<Option<Prediction>> {
    conn.query_row(
        &format!("{PREDICTION_SELECT} WHERE user_id = ?1 AND match_id = ?2"),
        params![user_id, match_id],
        prediction_from_row,
    )
    .optional()
    .context("query prediction")
}

pub fn load_predictions_for_match(conn: &Connection, match_id: &str) -> Result<Vec<Prediction>> {
    query_predictions(conn, "WHERE match_id = ?1 ORDER BY user_id ASC", &[&match_id])
}

pub fn load_predictions(conn: &Connection) -> Result<Vec<Prediction>> {
    query_predictions(conn, "ORDER BY match_id ASC, user_id ASC", &[])
}

pub fn set_prediction_points(
    conn: &Connection,
    user_id: &str,
    match_id: &str,
    points: u32,
) -> Result<()> {
    conn.execute(
        "UPDATE predictions SET points = ?3, updated_at = ?4 WHERE user_id = ?1 AND match_id = ?2",
        params![user_id, match_id, points, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("store points for {user_id}/{match_id}"))?;
    Ok(())
}

const PREDICTION_SELECT: &str = "SELECT user_id, match_id, home_goals, away_goals, \
     home_penalties, away_penalties, points FROM predictions";

fn query_predictions(
    conn: &Connection,
    tail: &str,
    args: &[&dyn ToSql],
) -> Result<Vec<Prediction>> {
    let sql = format!("{PREDICTION_SELECT} {tail}");
    let mut stmt = conn.prepare(&sql).context("prepare load predictions query")?;
    let rows = stmt
        .query_map(args, prediction_from_row)
        .context("query load predictions")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode prediction row")?);
    }
    Ok(out)
}

fn prediction_from_row(row: &Row<'_>) -> rusqlite::Result<Prediction> {
    Ok(Prediction {
        user_id: row.get(0)?,
        match_id: row.get(1)?,
        score: Score::new(row.get(2)?, row.get(3)?),
        penalties: score_pair(row.get(4)?, row.get(5)?),
        points: row.get(6)?,
    })
}

// -- helpers

fn score_pair(home: Option<u8>, away: Option<u8>) -> Option<Score> {
    match (home, away) {
        (Some(home), Some(away)) => Some(Score { home, away }),
        _ => None,
    }
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn text_column<T>(value: ValueRef<'_>) -> FromSqlResult<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .as_str()?
        .parse::<T>()
        .map_err(|err| FromSqlError::Other(Box::new(err)))
}

impl ToSql for GroupLabel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.letter().to_string()))
    }
}

impl FromSql for GroupLabel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value)
    }
}

impl ToSql for Phase {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Phase {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value)
    }
}

impl ToSql for MatchStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MatchStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_column(value)
    }
}
