//! Product repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    from_unix_millis, Product, ProductKey, SyncConflict, SyncFailure, SyncOutcome, SyncRun,
};
use crate::state::SyncSignal;

const PRODUCT_COLUMNS: &str = "key, name, category, sub_category, link, likes, comments, \
     supplier_orders, rating, supplier_price, store_price, updated_at";

/// `SQLite` access to products and the sync journal
pub struct SqliteProductRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteProductRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Every product, in no particular order
    pub fn list_all(&self) -> StoreResult<Vec<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products"))?;

        let products = stmt
            .query_map([], Self::parse_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(products)
    }

    /// Products, most recently updated first
    pub fn list(&self, limit: usize, offset: usize) -> StoreResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM products
             ORDER BY updated_at DESC, name COLLATE NOCASE ASC
             LIMIT ? OFFSET ?"
        ))?;

        let products = stmt
            .query_map(params![limit as i64, offset as i64], Self::parse_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(products)
    }

    /// Get a product by key
    pub fn get(&self, key: &ProductKey) -> StoreResult<Option<Product>> {
        let product = self
            .conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE key = ?"),
                params![key.as_str()],
                Self::parse_product,
            )
            .optional()?;

        Ok(product)
    }

    /// Insert or fully replace a product, keeping its timestamp as given
    pub fn upsert(&self, product: &Product) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO products (key, name, category, sub_category, link, likes, comments,
                                   supplier_orders, rating, supplier_price, store_price, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                sub_category = excluded.sub_category,
                link = excluded.link,
                likes = excluded.likes,
                comments = excluded.comments,
                supplier_orders = excluded.supplier_orders,
                rating = excluded.rating,
                supplier_price = excluded.supplier_price,
                store_price = excluded.store_price,
                updated_at = excluded.updated_at",
            params![
                product.key.as_str(),
                product.name,
                product.category,
                product.sub_category,
                product.link,
                to_sql_count("likes", product.likes)?,
                to_sql_count("comments", product.comments)?,
                to_sql_count("supplier_orders", product.supplier_orders)?,
                product.rating,
                product.supplier_price,
                product.store_price,
                product.updated_at.map(|instant| instant.timestamp_millis()),
            ],
        )?;

        Ok(())
    }

    /// Number of stored products
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Persist a finished run and its conflicts; returns the run id
    pub fn record_run(&self, outcome: &SyncOutcome) -> StoreResult<i64> {
        let failures = serde_json::to_string(&outcome.failures)
            .map_err(|error| StoreError::malformed(error.to_string()))?;
        let signal = SyncSignal::from_outcome(outcome);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO sync_runs (direction, signal, inserted, updated, skipped, failed,
                                    cancelled, failures, started_at, finished_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                outcome.direction.as_str(),
                signal.as_str(),
                outcome.inserted as i64,
                outcome.updated as i64,
                outcome.skipped as i64,
                outcome.failed as i64,
                i32::from(outcome.cancelled),
                failures,
                outcome.started_at.timestamp_millis(),
                outcome.finished_at.map(|instant| instant.timestamp_millis()),
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        for conflict in &outcome.conflicts {
            tx.execute(
                "INSERT INTO sync_conflicts (run_id, product_key, direction, source_updated_at,
                                             target_updated_at, resolved_at, strategy)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    run_id,
                    conflict.key.as_str(),
                    conflict.direction.as_str(),
                    conflict.source_updated_at.map(|instant| instant.timestamp_millis()),
                    conflict.target_updated_at.map(|instant| instant.timestamp_millis()),
                    conflict.resolved_at.timestamp_millis(),
                    conflict.strategy,
                ],
            )?;
        }
        tx.commit()?;

        Ok(run_id)
    }

    /// Most recent sync runs first
    pub fn list_runs(&self, limit: usize) -> StoreResult<Vec<SyncRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, direction, signal, inserted, updated, skipped, failed, cancelled,
                    failures, started_at, finished_at
             FROM sync_runs
             ORDER BY started_at DESC, id DESC
             LIMIT ?",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], Self::parse_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(runs)
    }

    /// Most recently resolved conflicts first
    pub fn list_conflicts(&self, limit: usize) -> StoreResult<Vec<SyncConflict>> {
        let mut stmt = self.conn.prepare(
            "SELECT product_key, direction, source_updated_at, target_updated_at,
                    resolved_at, strategy
             FROM sync_conflicts
             ORDER BY resolved_at DESC, id DESC
             LIMIT ?",
        )?;

        let conflicts = stmt
            .query_map(params![limit as i64], Self::parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conflicts)
    }

    /// Parse a product from a database row
    fn parse_product(row: &Row<'_>) -> rusqlite::Result<Product> {
        let key: String = row.get(0)?;
        Ok(Product {
            key: parse_text(0, &key)?,
            name: row.get(1)?,
            category: row.get(2)?,
            sub_category: row.get(3)?,
            link: row.get(4)?,
            likes: get_count(row, 5)?,
            comments: get_count(row, 6)?,
            supplier_orders: get_count(row, 7)?,
            rating: row.get(8)?,
            supplier_price: row.get(9)?,
            store_price: row.get(10)?,
            updated_at: get_instant(row, 11)?,
        })
    }

    fn parse_run(row: &Row<'_>) -> rusqlite::Result<SyncRun> {
        let direction: String = row.get(1)?;
        let signal: String = row.get(2)?;
        let failures: String = row.get(8)?;
        let failures: Vec<SyncFailure> = serde_json::from_str(&failures).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, error.into())
        })?;

        Ok(SyncRun {
            id: row.get(0)?,
            direction: parse_text(1, &direction)?,
            signal: parse_text(2, &signal)?,
            inserted: get_usize(row, 3)?,
            updated: get_usize(row, 4)?,
            skipped: get_usize(row, 5)?,
            failed: get_usize(row, 6)?,
            cancelled: row.get::<_, i32>(7)? != 0,
            failures,
            started_at: get_instant(row, 9)?.unwrap_or_default(),
            finished_at: get_instant(row, 10)?,
        })
    }

    fn parse_conflict(row: &Row<'_>) -> rusqlite::Result<SyncConflict> {
        let key: String = row.get(0)?;
        let direction: String = row.get(1)?;
        Ok(SyncConflict {
            key: parse_text(0, &key)?,
            direction: parse_text(1, &direction)?,
            source_updated_at: get_instant(row, 2)?,
            target_updated_at: get_instant(row, 3)?,
            resolved_at: get_instant(row, 4)?.unwrap_or_default(),
            strategy: row.get(5)?,
        })
    }
}

fn to_sql_count(field: &str, value: u64) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::validation(format!("{field} value {value} is too large")))
}

fn get_count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

fn get_usize(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    let value: i64 = row.get(idx)?;
    usize::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

fn get_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let Some(millis) = row.get::<_, Option<i64>>(idx)? else {
        return Ok(None);
    };
    from_unix_millis(millis)
        .map(Some)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn parse_text<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = crate::Error>,
{
    value.parse().map_err(|error: crate::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, error.into())
    })
}
