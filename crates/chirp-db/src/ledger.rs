//! Vote and like bookkeeping.
//!
//! Both are toggles. Each call is one `IMMEDIATE` transaction spanning the
//! existence check, the delete/insert and the recount, so two connections
//! racing on the same poll or post serialize on SQLite's write lock and the
//! later commit sees the earlier one's rows.

use anyhow::Result;
use chirp_types::models::{LikeAction, VoteAction};
use chirp_types::time::now_for_storage;
use rusqlite::{Connection, OptionalExtension};

use crate::Database;
use crate::models::{TallyRow, VoteOutcome};

/// Per-option vote counts for one poll, in option order, with whether
/// `viewer_id` holds the vote on each option.
pub fn query_poll_tally(conn: &Connection, post_id: i64, viewer_id: i64) -> Result<Vec<TallyRow>> {
    let mut stmt = conn.prepare(
        "SELECT
             po.id,
             po.option_text,
             COUNT(pv.user_id),
             COALESCE(MAX(pv.user_id = ?2), 0)
         FROM poll_options po
         LEFT JOIN poll_votes pv ON pv.option_id = po.id
         WHERE po.post_id = ?1
         GROUP BY po.id
         ORDER BY po.id",
    )?;

    let rows = stmt
        .query_map((post_id, viewer_id), |row| {
            Ok(TallyRow {
                option_id: row.get(0)?,
                option_text: row.get(1)?,
                votes: row.get(2)?,
                voted_by_me: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// The poll an option belongs to, provided the voter may see that poll.
fn visible_poll_for_option(conn: &Connection, option_id: i64, user_id: i64) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT po.post_id
             FROM poll_options po
             JOIN posts p ON p.id = po.post_id
             WHERE po.id = ?1 AND (p.is_public = 1 OR p.user_id = ?2)",
            (option_id, user_id),
            |r| r.get(0),
        )
        .optional()?)
}

fn post_is_visible(conn: &Connection, post_id: i64, user_id: i64) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM posts WHERE id = ?1 AND (is_public = 1 OR user_id = ?2)",
            (post_id, user_id),
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

impl Database {
    /// Toggle `user_id`'s vote onto `option_id`.
    ///
    /// Voting the option already held removes the vote. Voting any other
    /// option first clears every vote the user holds anywhere in the same
    /// poll, then records the new one, so at most one vote per user per poll
    /// survives even if older rows were inconsistent.
    ///
    /// Returns `None` when the option does not resolve to a poll the user can
    /// see. The returned tally always covers the whole poll.
    pub fn cast_vote(&self, user_id: i64, option_id: i64) -> Result<Option<VoteOutcome>> {
        self.with_tx(|tx| {
            let Some(post_id) = visible_poll_for_option(tx, option_id, user_id)? else {
                return Ok(None);
            };

            let already_voted = tx
                .query_row(
                    "SELECT 1 FROM poll_votes WHERE user_id = ?1 AND option_id = ?2",
                    (user_id, option_id),
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            let action = if already_voted {
                tx.execute(
                    "DELETE FROM poll_votes WHERE user_id = ?1 AND option_id = ?2",
                    (user_id, option_id),
                )?;
                VoteAction::Removed
            } else {
                tx.execute(
                    "DELETE FROM poll_votes
                     WHERE user_id = ?1
                       AND option_id IN (SELECT id FROM poll_options WHERE post_id = ?2)",
                    (user_id, post_id),
                )?;
                tx.execute(
                    "INSERT INTO poll_votes (user_id, option_id, created_at) VALUES (?1, ?2, ?3)",
                    (user_id, option_id, now_for_storage()),
                )?;
                VoteAction::Voted
            };

            let tally = query_poll_tally(tx, post_id, user_id)?;
            Ok(Some(VoteOutcome {
                post_id,
                action,
                tally,
            }))
        })
    }

    /// Toggle a like. Returns the branch taken and the post's like count
    /// after the change, or `None` if the post is missing or not visible.
    pub fn toggle_like(&self, user_id: i64, post_id: i64) -> Result<Option<(LikeAction, i64)>> {
        self.with_tx(|tx| {
            if !post_is_visible(tx, post_id, user_id)? {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                (user_id, post_id),
            )?;

            let action = if removed > 0 {
                LikeAction::Unliked
            } else {
                tx.execute(
                    "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
                    (user_id, post_id, now_for_storage()),
                )?;
                LikeAction::Liked
            };

            let like_count: i64 =
                tx.query_row("SELECT COUNT(*) FROM likes WHERE post_id = ?1", [post_id], |r| {
                    r.get(0)
                })?;
            Ok(Some((action, like_count)))
        })
    }
}
