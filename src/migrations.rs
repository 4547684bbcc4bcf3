use log::info;
use rusqlite::{Connection, Result};

/// Migration: repair the full-text shadow table.
///
/// Databases written before finalize/update ran inside a single transaction
/// could crash between the walk write and its shadow write, leaving walks
/// invisible to search. Re-inserts any missing shadow rows from the walks
/// table. Idempotent.
pub fn repair_search_shadow(conn: &Connection) -> Result<()> {
    let missing: i64 = conn
        .prepare(
            "SELECT COUNT(*) FROM walks
             WHERE id != 0 AND id NOT IN (SELECT walk_id FROM walk_search)",
        )?
        .query_row([], |row| row.get(0))?;

    if missing == 0 {
        return Ok(());
    }

    info!("Running migration: repair_search_shadow ({} rows missing)", missing);

    conn.execute(
        "INSERT INTO walk_search (walk_id, name, description, tags)
         SELECT id, name, description, tags FROM walks
         WHERE id != 0 AND id NOT IN (SELECT walk_id FROM walk_search)",
        [],
    )?;

    info!("Migration repair_search_shadow completed successfully");

    Ok(())
}

/// Check whether the shadow table is missing rows for any saved walk.
pub fn needs_search_shadow_repair(conn: &Connection) -> Result<bool> {
    let missing: i64 = conn
        .prepare(
            "SELECT COUNT(*) FROM walks
             WHERE id != 0 AND id NOT IN (SELECT walk_id FROM walk_search)",
        )?
        .query_row([], |row| row.get(0))?;

    Ok(missing > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_schema() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE walks (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 name TEXT NOT NULL,
                 description TEXT NOT NULL,
                 tags TEXT NOT NULL,
                 date INTEGER NOT NULL
             );
             CREATE VIRTUAL TABLE walk_search USING fts5(
                 name, description, tags, walk_id UNINDEXED
             );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_repair_inserts_missing_shadow_rows() {
        let conn = bare_schema();
        conn.execute(
            "INSERT INTO walks (id, name, description, tags, date)
             VALUES (1, 'Orphan', 'no shadow', 'hill , ', 0)",
            [],
        )
        .unwrap();
        assert!(needs_search_shadow_repair(&conn).unwrap());

        repair_search_shadow(&conn).unwrap();
        assert!(!needs_search_shadow_repair(&conn).unwrap());

        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM walk_search WHERE walk_search MATCH 'orphan'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_repair_ignores_walk_in_progress() {
        let conn = bare_schema();
        conn.execute(
            "INSERT INTO walks (id, name, description, tags, date)
             VALUES (0, 'In progress', '', '', 0)",
            [],
        )
        .unwrap();
        assert!(!needs_search_shadow_repair(&conn).unwrap());
        repair_search_shadow(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM walk_search", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }
}
