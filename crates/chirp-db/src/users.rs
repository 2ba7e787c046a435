use anyhow::Result;
use chirp_types::time::now_for_storage;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str =
    "id, username, password, is_admin, is_muted, is_deleted, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        is_admin: row.get(3)?,
        is_muted: row.get(4)?,
        is_deleted: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn username_taken(conn: &Connection, username: &str) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM users WHERE username = ?1", [username], |_| Ok(()))
        .optional()?
        .is_some())
}

pub fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

pub fn query_post_count(conn: &Connection, user_id: i64) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM posts WHERE user_id = ?1", [user_id], |r| r.get(0))?)
}

impl Database {
    /// Returns `None` when the username is already taken.
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<Option<i64>> {
        self.with_tx(|tx| {
            if username_taken(tx, username)? {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO users (username, password, is_admin, created_at) VALUES (?1, ?2, ?3, ?4)",
                (username, password_hash, is_admin, now_for_storage()),
            )?;
            Ok(Some(tx.last_insert_rowid()))
        })
    }

    /// Soft-deleted accounts have no username, so they never match here.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
            Ok(conn.query_row(&sql, [username], user_from_row).optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Grants administrator privilege to the named account, if it exists.
    pub fn promote_admin(&self, username: &str) -> Result<bool> {
        self.with_tx(|tx| {
            let n = tx.execute("UPDATE users SET is_admin = 1 WHERE username = ?1", [username])?;
            Ok(n > 0)
        })
    }

    /// Returns `false` when another account already holds `new_username`,
    /// or when `id` is not a live account.
    pub fn rename_user(&self, id: i64, new_username: &str) -> Result<bool> {
        self.with_tx(|tx| {
            if username_taken(tx, new_username)? {
                return Ok(false);
            }
            let n = tx.execute(
                "UPDATE users SET username = ?1 WHERE id = ?2 AND is_deleted = 0",
                (new_username, id),
            )?;
            Ok(n > 0)
        })
    }

    pub fn set_password(&self, id: i64, password_hash: &str) -> Result<()> {
        self.with_tx(|tx| {
            tx.execute("UPDATE users SET password = ?1 WHERE id = ?2", (password_hash, id))?;
            Ok(())
        })
    }

    /// Soft delete: the row stays so posts and messages keep attributing to
    /// it, but the display name is moved out of `username`.
    pub fn soft_delete_user(&self, id: i64) -> Result<bool> {
        self.with_tx(|tx| {
            let n = tx.execute(
                "UPDATE users
                 SET is_deleted = 1,
                     deleted_username = username,
                     username = NULL
                 WHERE id = ?1 AND is_deleted = 0",
                [id],
            )?;
            Ok(n > 0)
        })
    }

    /// Flips the mute flag. Returns the new state, or `None` for an unknown id.
    pub fn toggle_mute(&self, id: i64) -> Result<Option<bool>> {
        self.with_tx(|tx| {
            let current: Option<bool> = tx
                .query_row("SELECT is_muted FROM users WHERE id = ?1", [id], |r| r.get(0))
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };
            tx.execute("UPDATE users SET is_muted = ?1 WHERE id = ?2", (!current, id))?;
            Ok(Some(!current))
        })
    }

    pub fn post_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| query_post_count(conn, user_id))
    }

    /// Case-insensitive substring search over live accounts.
    pub fn search_users(&self, needle: &str, exclude: i64, limit: u32) -> Result<Vec<(i64, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username FROM users
                 WHERE is_deleted = 0
                   AND id != ?1
                   AND instr(lower(username), lower(?2)) > 0
                 ORDER BY username
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map((exclude, needle, limit), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Live accounts ordered by name, with their mute flag.
    pub fn list_active_users(&self) -> Result<Vec<(i64, String, bool)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, is_muted FROM users WHERE is_deleted = 0 ORDER BY username",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{temp_db, user};

    #[test]
    fn duplicate_username_is_rejected() {
        let db = temp_db();
        assert!(db.create_user("alice", "h", false).unwrap().is_some());
        assert!(db.create_user("alice", "h", false).unwrap().is_none());
    }

    #[test]
    fn soft_delete_frees_username_but_keeps_row() {
        let db = temp_db();
        let alice = user(&db, "alice");
        assert!(db.soft_delete_user(alice).unwrap());
        assert!(!db.soft_delete_user(alice).unwrap());

        let row = db.get_user_by_id(alice).unwrap().unwrap();
        assert!(row.is_deleted);
        assert_eq!(row.username, None);
        assert!(db.get_user_by_username("alice").unwrap().is_none());

        // the old name can be claimed again
        assert!(db.create_user("alice", "h", false).unwrap().is_some());
    }

    #[test]
    fn rename_respects_uniqueness() {
        let db = temp_db();
        let alice = user(&db, "alice");
        user(&db, "bob");
        assert!(!db.rename_user(alice, "bob").unwrap());
        assert!(db.rename_user(alice, "carol").unwrap());
        assert_eq!(db.get_user_by_id(alice).unwrap().unwrap().username.as_deref(), Some("carol"));
    }

    #[test]
    fn rename_of_deleted_or_unknown_account_reports_nothing_changed() {
        let db = temp_db();
        let alice = user(&db, "alice");
        db.soft_delete_user(alice).unwrap();

        assert!(!db.rename_user(alice, "alice2").unwrap());
        assert!(!db.rename_user(9999, "ghost").unwrap());
        assert_eq!(db.get_user_by_id(alice).unwrap().unwrap().username, None);
    }

    #[test]
    fn toggle_mute_flips_and_reports_unknown() {
        let db = temp_db();
        let alice = user(&db, "alice");
        assert_eq!(db.toggle_mute(alice).unwrap(), Some(true));
        assert_eq!(db.toggle_mute(alice).unwrap(), Some(false));
        assert_eq!(db.toggle_mute(9999).unwrap(), None);
    }

    #[test]
    fn search_is_case_insensitive_and_skips_self_and_deleted() {
        let db = temp_db();
        let me = user(&db, "Alicia");
        user(&db, "ALICE");
        let gone = user(&db, "alina");
        user(&db, "bob");
        db.soft_delete_user(gone).unwrap();

        let found: Vec<String> = db
            .search_users("ali", me, 10)
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        assert_eq!(found, vec!["ALICE".to_string()]);
    }

    #[test]
    fn promote_admin_sets_flag() {
        let db = temp_db();
        let alice = user(&db, "alice");
        assert!(db.promote_admin("alice").unwrap());
        assert!(!db.promote_admin("nobody").unwrap());
        assert!(db.get_user_by_id(alice).unwrap().unwrap().is_admin);
    }
}
