use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;

use crate::annex_c::AnnexCTable;

const APP_DIR: &str = "wc26_pool";
const DB_FILE: &str = "pool.sqlite";
const DEFAULT_LOCK_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// How long before kickoff predictions close.
    pub prediction_lock: Duration,
    /// Full Annex C table; the embedded rows are used when unset.
    pub annex_c_path: Option<PathBuf>,
    pub workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path().unwrap_or_else(|| PathBuf::from(DB_FILE)),
            prediction_lock: Duration::minutes(DEFAULT_LOCK_MINUTES),
            annex_c_path: None,
            workers: None,
        }
    }
}

impl Config {
    /// Reads `.env.local` / `.env` if present, then the `WC26_*` variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let mut cfg = Config::default();
        if let Some(path) = env_nonempty("WC26_DB_PATH") {
            cfg.db_path = PathBuf::from(path);
        }
        if let Some(minutes) = env_nonempty("WC26_PREDICTION_LOCK_MINUTES")
            .and_then(|val| val.parse::<i64>().ok())
        {
            cfg.prediction_lock = Duration::minutes(minutes.max(0));
        }
        cfg.annex_c_path = env_nonempty("WC26_ANNEX_C_PATH").map(PathBuf::from);
        cfg.workers = env_nonempty("WC26_WORKERS")
            .and_then(|val| val.parse::<usize>().ok())
            .filter(|n| *n > 0);
        cfg
    }

    pub fn annex_c_table(&self) -> Result<AnnexCTable> {
        match self.annex_c_path.as_deref() {
            Some(path) => AnnexCTable::load(path),
            None => AnnexCTable::embedded()
                .cloned()
                .context("embedded Annex C table is invalid"),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn default_db_path() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Some(base) = env_nonempty("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR).join(DB_FILE));
    }
    let home = env_nonempty("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(APP_DIR).join(DB_FILE))
}
