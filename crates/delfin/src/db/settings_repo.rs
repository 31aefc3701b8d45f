//! Key/value settings stored next to the orders.

use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// Reads a setting.
pub fn get(db: &Database, key: &str) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value)
    })
}

/// Inserts or overwrites a setting.
pub fn set(db: &Database, key: &str, value: &str) -> Result<(), DatabaseError> {
    let now = chrono::Utc::now().to_rfc3339();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, now],
        )?;
        Ok(())
    })
}

/// Removes a setting. Returns whether it existed.
pub fn delete(db: &Database, key: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing() {
        let db = Database::open_in_memory().unwrap();
        assert!(get(&db, "nope").unwrap().is_none());
    }

    #[test]
    fn test_set_then_overwrite() {
        let db = Database::open_in_memory().unwrap();
        set(&db, "gemini_api_key", "first").unwrap();
        set(&db, "gemini_api_key", "second").unwrap();
        assert_eq!(get(&db, "gemini_api_key").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_delete() {
        let db = Database::open_in_memory().unwrap();
        set(&db, "k", "v").unwrap();
        assert!(delete(&db, "k").unwrap());
        assert!(!delete(&db, "k").unwrap());
        assert!(get(&db, "k").unwrap().is_none());
    }
}
