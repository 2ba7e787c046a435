use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{DmCounterpartRow, InboundRow, MessageRow};

impl Database {
    pub fn insert_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
        created_at: &str,
    ) -> Result<i64> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO messages (sender_id, receiver_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (sender_id, receiver_id, content, created_at),
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// Highest message id addressed to `recipient`, or 0 if there is none.
    pub fn max_inbound_id(&self, recipient: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COALESCE(MAX(id), 0) FROM messages WHERE receiver_id = ?1",
                [recipient],
                |r| r.get(0),
            )?)
        })
    }

    /// Messages for `recipient` with id strictly above `cursor`, ascending.
    pub fn inbound_since(&self, recipient: i64, cursor: i64) -> Result<Vec<InboundRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, u.username, u.is_deleted
                 FROM messages m
                 JOIN users u ON u.id = m.sender_id
                 WHERE m.receiver_id = ?1 AND m.id > ?2
                 ORDER BY m.id ASC",
            )?;
            let rows = stmt
                .query_map((recipient, cursor), |row| {
                    Ok(InboundRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        sender_username: row.get(2)?,
                        sender_deleted: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Both directions of the conversation between `a` and `b`, oldest first.
    pub fn conversation(&self, a: i64, b: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_conversation(conn, a, b))
    }

    /// Everyone `user_id` has exchanged messages with, each with the latest
    /// message body as a preview. Most recent conversation first.
    pub fn dm_counterparts(&self, user_id: i64) -> Result<Vec<DmCounterpartRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.is_deleted, last.content
                 FROM (
                     SELECT CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END AS other,
                            MAX(id) AS last_id
                     FROM messages
                     WHERE sender_id = ?1 OR receiver_id = ?1
                     GROUP BY other
                 ) c
                 JOIN users u ON u.id = c.other
                 JOIN messages last ON last.id = c.last_id
                 WHERE c.other != ?1
                 ORDER BY c.last_id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(DmCounterpartRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        is_deleted: row.get(2)?,
                        last_message: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_conversation(conn: &Connection, a: i64, b: i64) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, receiver_id, content, created_at
         FROM messages
         WHERE (sender_id = ?1 AND receiver_id = ?2)
            OR (sender_id = ?2 AND receiver_id = ?1)
         ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map((a, b), |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                receiver_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
