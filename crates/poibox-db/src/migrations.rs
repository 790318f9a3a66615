use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| {
            r.get(0)
        })?;

    if version < 1 {
        info!("Running migration v1 (ledger + board)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE accounts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                handle      TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE listeners (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id    INTEGER NOT NULL REFERENCES accounts(id),
                name          TEXT NOT NULL,
                points        INTEGER NOT NULL DEFAULT 0,
                total_points  INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(account_id, name)
            );

            CREATE TABLE adjustments (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id   INTEGER NOT NULL REFERENCES accounts(id),
                listener_id  INTEGER NOT NULL REFERENCES listeners(id),
                amount       INTEGER NOT NULL,
                reason       TEXT NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_adjustments_account
                ON adjustments(account_id, created_at);
            CREATE INDEX idx_adjustments_listener
                ON adjustments(listener_id, created_at);

            CREATE TABLE posts (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id   INTEGER NOT NULL REFERENCES accounts(id),
                listener_id  INTEGER NOT NULL REFERENCES listeners(id),
                body         TEXT NOT NULL,
                parent_id    INTEGER REFERENCES posts(id),
                like_count   INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_posts_account
                ON posts(account_id, created_at);

            CREATE TABLE likes (
                post_id      INTEGER NOT NULL REFERENCES posts(id),
                listener_id  INTEGER NOT NULL REFERENCES listeners(id),
                created_at   TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (post_id, listener_id)
            );

            CREATE TABLE sessions (
                id           TEXT PRIMARY KEY,
                account_id   INTEGER REFERENCES accounts(id),
                listener_id  INTEGER REFERENCES listeners(id),
                expires_at   INTEGER NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK ((account_id IS NULL) != (listener_id IS NULL))
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
