use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            display_name    TEXT NOT NULL,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            invite_code     TEXT UNIQUE,
            paired_with     TEXT REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS pairs (
            id              TEXT PRIMARY KEY,
            user_a_id       TEXT NOT NULL REFERENCES users(id),
            user_b_id       TEXT NOT NULL REFERENCES users(id),
            delay_seconds   INTEGER NOT NULL,
            turn_user_id    TEXT NOT NULL REFERENCES users(id),
            last_sent_at    TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK (turn_user_id IN (user_a_id, user_b_id))
        );

        CREATE INDEX IF NOT EXISTS idx_pairs_user_a
            ON pairs(user_a_id);

        CREATE INDEX IF NOT EXISTS idx_pairs_user_b
            ON pairs(user_b_id);

        CREATE TABLE IF NOT EXISTS letters (
            id              TEXT PRIMARY KEY,
            pair_id         TEXT NOT NULL REFERENCES pairs(id),
            author_id       TEXT NOT NULL REFERENCES users(id),
            body_text       TEXT NOT NULL,
            is_favorite     INTEGER NOT NULL DEFAULT 0,
            is_draft        INTEGER NOT NULL DEFAULT 0,
            sent_at         TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_letters_pair
            ON letters(pair_id, created_at);

        -- At most one working draft per author per pair
        CREATE UNIQUE INDEX IF NOT EXISTS idx_letters_single_draft
            ON letters(pair_id, author_id) WHERE is_draft = 1;
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
