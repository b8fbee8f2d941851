//! Database schema and migrations for mailgate.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Identities table for credential storage
    r#"
CREATE TABLE identities (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_key    TEXT NOT NULL UNIQUE COLLATE NOCASE,  -- email address
    password_hash   TEXT NOT NULL,                        -- Argon2 PHC string
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
];
