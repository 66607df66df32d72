//! Idle clicker game backend
//!
//! Serves a themed single-page clicker game and the JSON API behind it:
//! player saves in SQLite, a periodically rebuilt leaderboard snapshot and
//! server-priced purchases, daily rewards, ascension and artifacts.

pub mod api;
pub mod config;
pub mod economy;
pub mod leaderboard;
pub mod metrics;
pub mod scheduler;
pub mod storage;
