//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Rows are never deleted; deactivation flips `active` to 0.
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,  -- stored lower-cased
    password_hash TEXT NOT NULL,         -- argon2 PHC string
    photo         TEXT,                  -- document filenames, never bytes
    cv            TEXT,
    licensed_id   TEXT,
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,         -- ISO 8601 UTC
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS users_active_idx ON users(active);

PRAGMA user_version = 1;
";
