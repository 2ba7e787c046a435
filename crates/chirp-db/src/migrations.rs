use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        let tx = conn.transaction()?;
        tx.execute_batch(
            "
            CREATE TABLE users (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                username          TEXT UNIQUE,
                password          TEXT NOT NULL,
                is_admin          INTEGER NOT NULL DEFAULT 0,
                is_muted          INTEGER NOT NULL DEFAULT 0,
                is_deleted        INTEGER NOT NULL DEFAULT 0,
                deleted_username  TEXT,
                created_at        TEXT NOT NULL
            );

            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL DEFAULT '',
                kind        TEXT NOT NULL CHECK (kind IN ('text', 'poll')),
                is_public   INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_posts_created ON posts(created_at);
            CREATE INDEX idx_posts_user ON posts(user_id);

            CREATE TABLE polls (
                post_id   INTEGER PRIMARY KEY REFERENCES posts(id),
                question  TEXT NOT NULL
            );

            CREATE TABLE poll_options (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id      INTEGER NOT NULL REFERENCES polls(post_id),
                option_text  TEXT NOT NULL
            );

            CREATE INDEX idx_poll_options_post ON poll_options(post_id);

            CREATE TABLE poll_votes (
                user_id     INTEGER NOT NULL REFERENCES users(id),
                option_id   INTEGER NOT NULL REFERENCES poll_options(id),
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, option_id)
            );

            CREATE INDEX idx_poll_votes_option ON poll_votes(option_id);

            CREATE TABLE likes (
                user_id     INTEGER NOT NULL REFERENCES users(id),
                post_id     INTEGER NOT NULL REFERENCES posts(id),
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, post_id)
            );

            CREATE INDEX idx_likes_post ON likes(post_id);

            CREATE TABLE messages (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id    INTEGER NOT NULL REFERENCES users(id),
                receiver_id  INTEGER NOT NULL REFERENCES users(id),
                content      TEXT NOT NULL,
                created_at   TEXT NOT NULL
            );

            CREATE INDEX idx_messages_receiver ON messages(receiver_id, id);
            CREATE INDEX idx_messages_sender ON messages(sender_id, id);

            CREATE TABLE censored_words (
                word  TEXT PRIMARY KEY
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}
