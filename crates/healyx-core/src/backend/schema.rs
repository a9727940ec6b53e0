//! SQLite schema for the local backend.

/// Tables the local backend accepts rows for.
pub const KNOWN_TABLES: [&str; 2] = ["patients", "appointments"];

/// Complete schema for the local backend.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Table rows
-- ============================================================================

-- One row per remote record; the body is the JSON row including its id
CREATE TABLE IF NOT EXISTS table_rows (
    table_name TEXT NOT NULL,
    id INTEGER NOT NULL,
    body TEXT NOT NULL,                           -- JSON object
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (table_name, id)
);

-- Last id issued per table; ids are never reused after a delete
CREATE TABLE IF NOT EXISTS table_sequences (
    table_name TEXT PRIMARY KEY,
    last_id INTEGER NOT NULL
);

-- ============================================================================
-- Auth
-- ============================================================================

CREATE TABLE IF NOT EXISTS auth_users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_salt TEXT NOT NULL,
    password_hash TEXT NOT NULL,                  -- hex sha256(salt || password)
    user_metadata TEXT NOT NULL DEFAULT '{}',     -- JSON object
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS auth_sessions (
    access_token TEXT PRIMARY KEY,
    refresh_token TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES auth_users(id) ON DELETE CASCADE,
    expires_at INTEGER NOT NULL,                  -- unix seconds
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON auth_sessions(user_id);

-- ============================================================================
-- Storage
-- ============================================================================

CREATE TABLE IF NOT EXISTS storage_objects (
    bucket TEXT NOT NULL,
    path TEXT NOT NULL,
    content BLOB NOT NULL,
    size INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    cache_control TEXT NOT NULL,
    sha256 TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (bucket, path)
);
"#;
