//! Order repository: CRUD operations for the `orders` table.
//!
//! `id` and `timestamp` are always assigned here, never by the caller.
//! There is no in-place update; a changed order is a delete plus an insert.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::order::{NewOrder, OrderRecord};

const SELECT_COLUMNS: &str = "SELECT id, order_number, client_name, client_number,
    reference_number, denomination, notes, date, quantity_meters, status, image_data, timestamp
    FROM orders";

/// Result of [`insert_unique`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The candidate was stored under this id.
    Inserted(i64),
    /// A record with the same non-empty order number already exists.
    Conflict(OrderRecord),
}

/// Result of [`replace_order`].
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    /// Id of the newly inserted record.
    pub id: i64,
    /// Ids of the records that were removed.
    pub removed: Vec<i64>,
}

fn from_row(row: &Row<'_>) -> Result<OrderRecord, rusqlite::Error> {
    let raw_timestamp: String = row.get("timestamp")?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_timestamp)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(OrderRecord {
        id: row.get("id")?,
        order: NewOrder {
            order_number: row.get("order_number")?,
            client_name: row.get("client_name")?,
            client_number: row.get("client_number")?,
            reference_number: row.get("reference_number")?,
            denomination: row.get("denomination")?,
            notes: row.get("notes")?,
            date: row.get("date")?,
            quantity_meters: row.get("quantity_meters")?,
            status: row.get("status")?,
            image_data: row.get("image_data")?,
        },
        timestamp,
    })
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn insert_on(conn: &Connection, order: &NewOrder) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO orders (order_number, client_name, client_number, reference_number,
         denomination, notes, date, quantity_meters, status, image_data, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            order.order_number,
            order.client_name,
            order.client_number,
            order.reference_number,
            order.denomination,
            order.notes,
            order.date,
            order.quantity_meters,
            order.status,
            order.image_data,
            now_timestamp(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn find_by_order_number_on(
    conn: &Connection,
    order_number: &str,
) -> Result<Vec<OrderRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE order_number = ?1 ORDER BY id",
        SELECT_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![order_number], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Inserts a new order, returning the assigned id.
pub fn insert(db: &Database, order: &NewOrder) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| insert_on(conn, order))
}

/// Inserts a new order unless another record already carries the same
/// non-empty order number. The check and the write share one transaction.
pub fn insert_unique(db: &Database, order: &NewOrder) -> Result<InsertOutcome, DatabaseError> {
    db.with_transaction(|tx| {
        if !order.order_number.is_empty() {
            if let Some(existing) = find_by_order_number_on(tx, &order.order_number)?
                .into_iter()
                .next()
            {
                return Ok(InsertOutcome::Conflict(existing));
            }
        }
        insert_on(tx, order).map(InsertOutcome::Inserted)
    })
}

/// Atomically removes `old_id` (and any other record sharing the
/// candidate's non-empty order number) and inserts the candidate.
pub fn replace_order(
    db: &Database,
    old_id: i64,
    order: &NewOrder,
) -> Result<Replacement, DatabaseError> {
    db.with_transaction(|tx| {
        let mut removed = Vec::new();
        if tx.execute("DELETE FROM orders WHERE id = ?1", params![old_id])? > 0 {
            removed.push(old_id);
        }
        if !order.order_number.is_empty() {
            for record in find_by_order_number_on(tx, &order.order_number)? {
                tx.execute("DELETE FROM orders WHERE id = ?1", params![record.id])?;
                removed.push(record.id);
            }
        }
        let id = insert_on(tx, order)?;
        Ok(Replacement { id, removed })
    })
}

/// Returns every stored order, in no particular order.
pub fn get_all(db: &Database) -> Result<Vec<OrderRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(SELECT_COLUMNS)?;
        let rows = stmt
            .query_map([], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds an order by its id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<OrderRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let record = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                from_row,
            )
            .optional()?;
        Ok(record)
    })
}

/// Finds all orders carrying exactly this order number.
pub fn find_by_order_number(
    db: &Database,
    order_number: &str,
) -> Result<Vec<OrderRecord>, DatabaseError> {
    db.with_conn(|conn| find_by_order_number_on(conn, order_number))
}

/// Deletes an order. Returns whether a row was removed; a missing id is not an error.
pub fn delete_by_id(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM orders WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}

/// Deletes every order. Ids are not reset.
pub fn clear(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM orders", [])?;
        Ok(affected as u64)
    })
}

/// Counts stored orders.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |r| r.get(0))?;
        Ok(count)
    })
}
