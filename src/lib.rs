pub mod annex_c;
pub mod bracket;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod logging;
pub mod model;
pub mod predictions;
pub mod schedule;
pub mod scoring;
pub mod standings;
pub mod store;
pub mod third_place;
pub mod workflow;
