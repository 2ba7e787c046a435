use anyhow::Result;
use rusqlite::Connection;

use crate::Database;

/// Current censorship terms, sorted.
pub fn query_censored_words(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT word FROM censored_words ORDER BY word")?;
    let words = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(words)
}

impl Database {
    /// Appends a term. The caller normalizes it; re-adding an existing term
    /// is a no-op. Returns whether a row was inserted.
    pub fn add_censored_word(&self, word: &str) -> Result<bool> {
        self.with_tx(|tx| {
            let n = tx.execute("INSERT OR IGNORE INTO censored_words (word) VALUES (?1)", [word])?;
            Ok(n > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::query_censored_words;
    use crate::testutil::temp_db;

    #[test]
    fn duplicate_terms_are_ignored() {
        let db = temp_db();
        assert!(db.add_censored_word("cat").unwrap());
        assert!(!db.add_censored_word("cat").unwrap());
        assert!(db.add_censored_word("badger").unwrap());
        assert_eq!(db.with_conn(query_censored_words).unwrap(), vec!["badger", "cat"]);
    }
}
