//! Database Migrations - SQLite schema for the clicker backend
//!
//! Timestamps are unix seconds (INTEGER). Defaults mirror the default
//! player object in [`crate::economy`].

/// SQL migration for creating all tables
pub const MIGRATION_V1: &str = r#"
-- ============================================================================
-- 1. Players
-- ============================================================================

CREATE TABLE IF NOT EXISTS players (
    player_id        TEXT PRIMARY KEY NOT NULL,
    username         TEXT NOT NULL DEFAULT 'Player',

    -- Counters reported by the game page
    coins            INTEGER NOT NULL DEFAULT 100,
    power            INTEGER NOT NULL DEFAULT 1,
    autos            INTEGER NOT NULL DEFAULT 0,
    multiplier       INTEGER NOT NULL DEFAULT 1,
    total_clicks     INTEGER NOT NULL DEFAULT 0,
    experience       INTEGER NOT NULL DEFAULT 0,
    level            INTEGER NOT NULL DEFAULT 1,
    prestige         INTEGER NOT NULL DEFAULT 0,

    last_daily_claim INTEGER,
    last_active      INTEGER NOT NULL,
    created_at       INTEGER NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_players_coins ON players(coins DESC);
CREATE INDEX IF NOT EXISTS idx_players_clicks ON players(total_clicks DESC);

-- ============================================================================
-- 2. Owned shop items (reset on ascension)
-- ============================================================================

CREATE TABLE IF NOT EXISTS player_upgrades (
    player_id   TEXT NOT NULL REFERENCES players(player_id) ON DELETE CASCADE,
    item_id     TEXT NOT NULL,
    level       INTEGER NOT NULL DEFAULT 0 CHECK (level >= 0),
    updated_at  INTEGER NOT NULL,

    PRIMARY KEY (player_id, item_id)
) WITHOUT ROWID;

-- ============================================================================
-- 3. Discovered artifacts (kept across ascension)
-- ============================================================================

CREATE TABLE IF NOT EXISTS player_artifacts (
    player_id     TEXT NOT NULL REFERENCES players(player_id) ON DELETE CASCADE,
    artifact_id   TEXT NOT NULL,
    quantity      INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
    discovered_at INTEGER NOT NULL,

    PRIMARY KEY (player_id, artifact_id)
) WITHOUT ROWID;

-- ============================================================================
-- 4. Leaderboard snapshot (rebuilt wholesale)
-- ============================================================================

CREATE TABLE IF NOT EXISTS leaderboard (
    category    TEXT NOT NULL,  -- 'coins', 'clicks', 'level', 'prestige'
    rank        INTEGER NOT NULL,
    player_id   TEXT NOT NULL,
    username    TEXT NOT NULL,
    score       INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL,

    PRIMARY KEY (category, rank)
) WITHOUT ROWID;
"#;

/// Get all migration SQL statements in order
pub fn get_migrations() -> Vec<(&'static str, &'static str)> {
    vec![
        ("v1_initial_schema", MIGRATION_V1),
    ]
}
