//! Database migrations

use rusqlite::Connection;

use crate::error::StoreResult;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> StoreResult<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> StoreResult<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Apply one migration inside a transaction
fn apply(conn: &Connection, version: i32, sql: &str) -> StoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: product table
fn migrate_v1(conn: &Connection) -> StoreResult<()> {
    apply(
        conn,
        1,
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS products (
            key TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            category TEXT NOT NULL DEFAULT '',
            sub_category TEXT NOT NULL DEFAULT '',
            link TEXT,
            likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
            comments INTEGER NOT NULL DEFAULT 0 CHECK (comments >= 0),
            supplier_orders INTEGER NOT NULL DEFAULT 0 CHECK (supplier_orders >= 0),
            rating REAL NOT NULL DEFAULT 0 CHECK (rating >= 0 AND rating <= 5),
            supplier_price REAL NOT NULL DEFAULT 0 CHECK (supplier_price >= 0),
            store_price REAL NOT NULL DEFAULT 0 CHECK (store_price >= 0),
            updated_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_products_updated ON products(updated_at DESC);
        CREATE INDEX IF NOT EXISTS idx_products_name ON products(name COLLATE NOCASE);",
    )
}

/// Migration to version 2: sync run journal and LWW conflict log
fn migrate_v2(conn: &Connection) -> StoreResult<()> {
    apply(
        conn,
        2,
        "CREATE TABLE IF NOT EXISTS sync_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            direction TEXT NOT NULL,
            signal TEXT NOT NULL,
            inserted INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            cancelled INTEGER NOT NULL DEFAULT 0,
            failures TEXT NOT NULL DEFAULT '[]',
            started_at INTEGER NOT NULL,
            finished_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_sync_runs_started ON sync_runs(started_at DESC);
        CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES sync_runs(id) ON DELETE CASCADE,
            product_key TEXT NOT NULL,
            direction TEXT NOT NULL,
            source_updated_at INTEGER,
            target_updated_at INTEGER,
            resolved_at INTEGER NOT NULL,
            strategy TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sync_conflicts_key ON sync_conflicts(product_key);
        CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved ON sync_conflicts(resolved_at DESC);",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_migrations() {
        let conn = setup();
        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = setup();
        run(&conn).unwrap();
        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_migration_v2_creates_journal_tables() {
        let conn = setup();
        run(&conn).unwrap();

        assert!(table_exists(&conn, "products"));
        assert!(table_exists(&conn, "sync_runs"));
        assert!(table_exists(&conn, "sync_conflicts"));
    }

    #[test]
    fn test_products_reject_out_of_range_rating() {
        let conn = setup();
        run(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO products (key, name, rating) VALUES ('mug', 'Mug', 7.5)",
            [],
        );
        assert!(result.is_err());
    }
}
