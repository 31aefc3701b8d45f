//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order, each inside its own transaction.

use rusqlite::Connection;

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_orders_table",
        sql: include_str!("sql/001_create_orders.sql"),
    },
    Migration {
        version: 2,
        description: "create_settings_table",
        sql: include_str!("sql/002_create_settings.sql"),
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        let batch = format!(
            "BEGIN;\n{}\nINSERT INTO _migrations (version, description) VALUES ({}, '{}');\nCOMMIT;",
            migration.sql, migration.version, migration.description
        );
        if let Err(e) = conn.execute_batch(&batch) {
            // Leave the connection usable for the caller.
            let _ = conn.execute_batch("ROLLBACK;");
            return Err(DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            });
        }
    }

    Ok(())
}

/// Checks whether a table exists in the schema.
#[cfg(test)]
fn table_exists(conn: &Connection, table: &str) -> Result<bool, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
        assert!(table_exists(&conn, "orders").unwrap());
        assert!(table_exists(&conn, "settings").unwrap());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();
        // Running again should be a no-op.
        run_all(&conn).unwrap();

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_orders_indexes_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'orders'")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for column in [
            "order_number",
            "client_name",
            "client_number",
            "date",
            "status",
            "timestamp",
        ] {
            let expected = format!("idx_orders_{}", column);
            assert!(names.contains(&expected), "missing index {}", expected);
        }
    }

    #[test]
    fn test_orders_ids_use_autoincrement() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        // AUTOINCREMENT tables are tracked in sqlite_sequence.
        assert!(table_exists(&conn, "sqlite_sequence").unwrap());
    }
}
