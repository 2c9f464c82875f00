use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);",
    )?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                is_active   INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE topics (
                id          TEXT PRIMARY KEY,
                topic       TEXT NOT NULL UNIQUE
            );

            CREATE TABLE feeds (
                id          TEXT PRIMARY KEY,
                host_id     TEXT REFERENCES users(id) ON DELETE SET NULL,
                topic_id    TEXT REFERENCES topics(id) ON DELETE SET NULL,
                title       TEXT NOT NULL,
                description TEXT,
                file_path   TEXT NOT NULL,
                file_name   TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_feeds_host ON feeds(host_id);

            -- Comments survive author deletion with attribution cleared;
            -- they die with their feed.
            CREATE TABLE comments (
                id              TEXT PRIMARY KEY,
                user_id         TEXT REFERENCES users(id) ON DELETE SET NULL,
                feed_id         TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                comment_body    TEXT NOT NULL,
                commenter_name  TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_comments_feed ON comments(feed_id, updated_at);

            CREATE TABLE file_shares (
                id          TEXT PRIMARY KEY,
                feed_id     TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                share_token TEXT NOT NULL UNIQUE,
                created_by  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                expires_at  TEXT,
                is_active   INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE user_shares (
                id              TEXT PRIMARY KEY,
                feed_id         TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                shared_by_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                shared_with_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX idx_user_shares_feed ON user_shares(feed_id);
            CREATE INDEX idx_user_shares_recipient ON user_shares(shared_with_id);

            -- At most one ACTIVE share per (feed, recipient); inactive
            -- rows from revoke/re-share cycles may accumulate freely.
            CREATE UNIQUE INDEX idx_user_shares_one_active
                ON user_shares(feed_id, shared_with_id) WHERE is_active = 1;
            ",
        )?;
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    }

    info!("Database migrations complete");
    Ok(())
}
