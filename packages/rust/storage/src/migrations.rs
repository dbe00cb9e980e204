//! SQL migration definitions for the Prospector cache database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: email_cache, website_cache, runs, contacts",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One bulk email lookup per domain
CREATE TABLE IF NOT EXISTS email_cache (
    domain      TEXT PRIMARY KEY,
    emails_json TEXT NOT NULL,
    status      TEXT NOT NULL,
    fetched_at  TEXT NOT NULL
);

-- Resolved websites keyed by a digest of (company name, keywords)
CREATE TABLE IF NOT EXISTS website_cache (
    key_hash    TEXT PRIMARY KEY,
    company     TEXT NOT NULL,
    keywords    TEXT NOT NULL,
    domain      TEXT NOT NULL,
    url         TEXT NOT NULL,
    is_homepage INTEGER NOT NULL,
    fetched_at  TEXT NOT NULL
);

-- Pipeline run history
CREATE TABLE IF NOT EXISTS runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    status      TEXT,
    stats_json  TEXT
);

-- Contacts emitted by each run
CREATE TABLE IF NOT EXISTS contacts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id      TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    company     TEXT NOT NULL,
    full_name   TEXT NOT NULL,
    title       TEXT NOT NULL,
    email       TEXT NOT NULL,
    profile_url TEXT NOT NULL,
    found_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contacts_run_id ON contacts(run_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
