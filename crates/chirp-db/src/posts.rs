use anyhow::{Result, anyhow};
use chirp_types::models::PostKind;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::{FeedRow, Mutation};

/// Which posts a feed projection covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Everything the viewer may see: public posts plus their own.
    Visible,
    /// One author's posts, filtered by the same visibility rule.
    Author(i64),
    /// Every private post regardless of owner. Admin listing only.
    PrivateOnly,
}

const FEED_SELECT: &str = "
    SELECT
        p.id,
        p.user_id,
        p.content,
        p.kind,
        u.username,
        u.is_deleted,
        u.is_admin,
        p.created_at,
        p.is_public,
        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id),
        EXISTS (SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?1)
    FROM posts p
    JOIN users u ON u.id = p.user_id";

// Newest first; identical timestamps fall back to the later insert first.
const FEED_ORDER: &str = "ORDER BY p.created_at DESC, p.id DESC";

fn feed_row(row: &Row<'_>) -> rusqlite::Result<FeedRow> {
    let kind: String = row.get(3)?;
    Ok(FeedRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        kind: PostKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown post kind '{}'", kind).into(),
            )
        })?,
        username: row.get(4)?,
        author_deleted: row.get(5)?,
        author_is_admin: row.get(6)?,
        created_at: row.get(7)?,
        is_public: row.get(8)?,
        like_count: row.get(9)?,
        liked_by_me: row.get(10)?,
    })
}

pub fn query_feed_rows(conn: &Connection, viewer_id: i64, scope: FeedScope) -> Result<Vec<FeedRow>> {
    let (filter, author) = match scope {
        FeedScope::Visible => ("WHERE p.is_public = 1 OR p.user_id = ?1", None),
        FeedScope::Author(author) => (
            "WHERE p.user_id = ?2 AND (p.is_public = 1 OR p.user_id = ?1)",
            Some(author),
        ),
        FeedScope::PrivateOnly => ("WHERE p.is_public = 0", None),
    };
    let sql = format!("{} {} {}", FEED_SELECT, filter, FEED_ORDER);
    let mut stmt = conn.prepare(&sql)?;

    let rows = match author {
        Some(author) => stmt.query_map((viewer_id, author), feed_row)?,
        None => stmt.query_map([viewer_id], feed_row)?,
    }
    .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn query_feed_row(conn: &Connection, viewer_id: i64, post_id: i64) -> Result<Option<FeedRow>> {
    let sql = format!("{} WHERE p.id = ?2", FEED_SELECT);
    Ok(conn.query_row(&sql, (viewer_id, post_id), feed_row).optional()?)
}

pub fn query_poll_question(conn: &Connection, post_id: i64) -> Result<String> {
    conn.query_row("SELECT question FROM polls WHERE post_id = ?1", [post_id], |r| r.get(0))
        .optional()?
        .ok_or_else(|| anyhow!("poll row missing for post {}", post_id))
}

/// Owner and admin may both act; anyone else is refused.
fn check_owner(conn: &Connection, actor: i64, is_admin: bool, post_id: i64) -> Result<Result<PostKind, Mutation>> {
    let row: Option<(i64, String)> = conn
        .query_row("SELECT user_id, kind FROM posts WHERE id = ?1", [post_id], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .optional()?;

    let Some((owner, kind)) = row else {
        return Ok(Err(Mutation::NotFound));
    };
    if owner != actor && !is_admin {
        return Ok(Err(Mutation::Forbidden));
    }
    PostKind::parse(&kind)
        .map(Ok)
        .ok_or_else(|| anyhow!("unknown post kind '{}' on post {}", kind, post_id))
}

impl Database {
    pub fn create_text_post(
        &self,
        user_id: i64,
        content: &str,
        is_public: bool,
        created_at: &str,
    ) -> Result<i64> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO posts (user_id, content, kind, is_public, created_at)
                 VALUES (?1, ?2, 'text', ?3, ?4)",
                (user_id, content, is_public, created_at),
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// Post, poll and options land together or not at all.
    pub fn create_poll(
        &self,
        user_id: i64,
        question: &str,
        options: &[String],
        is_public: bool,
        created_at: &str,
    ) -> Result<i64> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO posts (user_id, content, kind, is_public, created_at)
                 VALUES (?1, '', 'poll', ?2, ?3)",
                (user_id, is_public, created_at),
            )?;
            let post_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO polls (post_id, question) VALUES (?1, ?2)",
                (post_id, question),
            )?;

            let mut stmt =
                tx.prepare("INSERT INTO poll_options (post_id, option_text) VALUES (?1, ?2)")?;
            for option in options {
                stmt.execute((post_id, option))?;
            }

            Ok(post_id)
        })
    }

    /// Edits body and/or visibility. Poll bodies are always empty, so a new
    /// `content` only applies to text posts.
    pub fn update_post(
        &self,
        actor: i64,
        is_admin: bool,
        post_id: i64,
        content: Option<&str>,
        is_public: Option<bool>,
    ) -> Result<Mutation> {
        self.with_tx(|tx| {
            let kind = match check_owner(tx, actor, is_admin, post_id)? {
                Ok(kind) => kind,
                Err(refused) => return Ok(refused),
            };

            if let (Some(content), PostKind::Text) = (content, kind) {
                tx.execute("UPDATE posts SET content = ?1 WHERE id = ?2", (content, post_id))?;
            }
            if let Some(is_public) = is_public {
                tx.execute("UPDATE posts SET is_public = ?1 WHERE id = ?2", (is_public, post_id))?;
            }
            Ok(Mutation::Applied)
        })
    }

    /// Removes a post with everything hanging off it: likes, and for polls
    /// the votes, options and poll row. All-or-nothing.
    pub fn delete_post(&self, actor: i64, is_admin: bool, post_id: i64) -> Result<Mutation> {
        self.with_tx(|tx| {
            let kind = match check_owner(tx, actor, is_admin, post_id)? {
                Ok(kind) => kind,
                Err(refused) => return Ok(refused),
            };

            tx.execute("DELETE FROM likes WHERE post_id = ?1", [post_id])?;

            if kind == PostKind::Poll {
                tx.execute(
                    "DELETE FROM poll_votes
                     WHERE option_id IN (SELECT id FROM poll_options WHERE post_id = ?1)",
                    [post_id],
                )?;
                tx.execute("DELETE FROM poll_options WHERE post_id = ?1", [post_id])?;
                tx.execute("DELETE FROM polls WHERE post_id = ?1", [post_id])?;
            }

            tx.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
            Ok(Mutation::Applied)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{temp_db, user};

    const T0: &str = "2024-01-01T10:00:00.000000+00:00";
    const T1: &str = "2024-01-01T11:00:00.000000+00:00";

    fn ids(rows: &[FeedRow]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn private_posts_only_visible_to_owner() {
        let db = temp_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let public = db.create_text_post(alice, "hello", true, T0).unwrap();
        let private = db.create_text_post(alice, "secret", false, T1).unwrap();

        let as_alice = db.with_conn(|c| query_feed_rows(c, alice, FeedScope::Visible)).unwrap();
        assert_eq!(ids(&as_alice), vec![private, public]);

        let as_bob = db.with_conn(|c| query_feed_rows(c, bob, FeedScope::Visible)).unwrap();
        assert_eq!(ids(&as_bob), vec![public]);

        let bob_on_profile =
            db.with_conn(|c| query_feed_rows(c, bob, FeedScope::Author(alice))).unwrap();
        assert_eq!(ids(&bob_on_profile), vec![public]);

        let admin_listing =
            db.with_conn(|c| query_feed_rows(c, bob, FeedScope::PrivateOnly)).unwrap();
        assert_eq!(ids(&admin_listing), vec![private]);
    }

    #[test]
    fn identical_timestamps_order_by_insertion() {
        let db = temp_db();
        let alice = user(&db, "alice");
        let first = db.create_text_post(alice, "a", true, T0).unwrap();
        let second = db.create_text_post(alice, "b", true, T0).unwrap();
        let newest = db.create_text_post(alice, "c", true, T1).unwrap();

        let rows = db.with_conn(|c| query_feed_rows(c, alice, FeedScope::Visible)).unwrap();
        assert_eq!(ids(&rows), vec![newest, second, first]);
    }

    #[test]
    fn delete_is_owner_or_admin_only() {
        let db = temp_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let post = db.create_text_post(alice, "hi", true, T0).unwrap();

        assert_eq!(db.delete_post(bob, false, post).unwrap(), Mutation::Forbidden);
        assert_eq!(db.delete_post(bob, true, post).unwrap(), Mutation::Applied);
        assert_eq!(db.delete_post(alice, false, post).unwrap(), Mutation::NotFound);
    }

    #[test]
    fn deleting_a_poll_cascades() {
        let db = temp_db();
        let alice = user(&db, "alice");
        let options = vec!["red".to_string(), "blue".to_string()];
        let post = db.create_poll(alice, "colour?", &options, true, T0).unwrap();
        let tally = db.with_conn(|c| crate::ledger::query_poll_tally(c, post, alice)).unwrap();
        db.cast_vote(alice, tally[0].option_id).unwrap().unwrap();
        db.toggle_like(alice, post).unwrap().unwrap();

        assert_eq!(db.delete_post(alice, false, post).unwrap(), Mutation::Applied);

        let leftovers: i64 = db
            .with_conn(|c| {
                Ok(c.query_row(
                    "SELECT (SELECT COUNT(*) FROM polls) + (SELECT COUNT(*) FROM poll_options)
                          + (SELECT COUNT(*) FROM poll_votes) + (SELECT COUNT(*) FROM likes)
                          + (SELECT COUNT(*) FROM posts)",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn update_changes_visibility_and_text_only_for_text_posts() {
        let db = temp_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let post = db.create_text_post(alice, "draft", true, T0).unwrap();

        assert_eq!(
            db.update_post(bob, false, post, Some("hijack"), None).unwrap(),
            Mutation::Forbidden
        );
        assert_eq!(
            db.update_post(alice, false, post, Some("final"), Some(false)).unwrap(),
            Mutation::Applied
        );
        let row = db.with_conn(|c| query_feed_row(c, alice, post)).unwrap().unwrap();
        assert_eq!(row.content, "final");
        assert!(!row.is_public);

        let options = vec!["a".to_string(), "b".to_string()];
        let poll = db.create_poll(alice, "q", &options, true, T1).unwrap();
        db.update_post(alice, false, poll, Some("ignored"), None).unwrap();
        let row = db.with_conn(|c| query_feed_row(c, alice, poll)).unwrap().unwrap();
        assert_eq!(row.content, "");
    }
}
