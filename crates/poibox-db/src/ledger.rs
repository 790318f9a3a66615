use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::accounts::account_id;
use crate::error::on_unique;
use crate::models::{AdjustmentRow, ListenerRow};
use crate::{Database, Error, Result};

/// Passbook reason written for a listener's opening balance.
pub const INITIAL_BALANCE_REASON: &str = "initial balance";

impl Database {
    // -- Listeners --

    /// Adds a listener to `owner`'s ledger with `points = total_points = initial_points`.
    pub fn create_listener(&self, owner: &str, name: &str, initial_points: i64) -> Result<ListenerRow> {
        if initial_points < 0 {
            return Err(Error::Invalid("initial points must not be negative"));
        }

        self.with_tx(|tx| {
            let owner_id = account_id(tx, owner)?;
            let listener = insert_listener(tx, owner_id, name, initial_points)?;

            if initial_points > 0 {
                insert_adjustment(tx, owner_id, listener.id, initial_points, INITIAL_BALANCE_REASON)?;
            }

            debug!(owner, name, initial_points, "listener created");
            Ok(listener)
        })
    }

    /// Returns the listener, creating it at zero points on first contact.
    pub fn register_listener(&self, owner: &str, name: &str) -> Result<ListenerRow> {
        self.with_tx(|tx| {
            let owner_id = account_id(tx, owner)?;
            if let Some(existing) = query_listener(tx, owner_id, name)? {
                return Ok(existing);
            }
            debug!(owner, name, "listener registered on first visit");
            insert_listener(tx, owner_id, name, 0)
        })
    }

    pub fn get_listener(&self, owner: &str, name: &str) -> Result<Option<ListenerRow>> {
        self.with_conn(|conn| {
            let owner_id = account_id(conn, owner)?;
            query_listener(conn, owner_id, name)
        })
    }

    /// Listeners of `owner`, highest lifetime total first. `search` filters by
    /// case-insensitive substring of the name.
    pub fn list_listeners(&self, owner: &str, search: Option<&str>) -> Result<Vec<ListenerRow>> {
        self.with_conn(|conn| {
            let owner_id = account_id(conn, owner)?;
            let search = search.map(str::trim).filter(|s| !s.is_empty());

            let mut stmt = conn.prepare(
                "SELECT id, name, points, total_points, created_at FROM listeners
                 WHERE account_id = ?1
                   AND (?2 IS NULL OR instr(lower(name), lower(?2)) > 0)
                 ORDER BY total_points DESC, name ASC",
            )?;
            let rows = stmt
                .query_map(params![owner_id, search], listener_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Points --

    /// Applies a signed adjustment and appends it to the passbook in one
    /// transaction. Debits may not take `points` below zero.
    pub fn adjust_points(&self, owner: &str, name: &str, delta: i64, reason: &str) -> Result<ListenerRow> {
        if delta == 0 {
            return Err(Error::Invalid("adjustment must not be zero"));
        }

        self.with_tx(|tx| {
            let owner_id = account_id(tx, owner)?;
            let listener = query_listener(tx, owner_id, name)?.ok_or(Error::NotFound("listener"))?;
            let updated = apply_delta(tx, owner_id, &listener, delta, reason)?;

            debug!(owner, name, delta, points = updated.points, "points adjusted");
            Ok(updated)
        })
    }

    /// Most recent `limit` adjustments across all of `owner`'s listeners.
    pub fn history(&self, owner: &str, limit: u32) -> Result<Vec<AdjustmentRow>> {
        self.with_conn(|conn| {
            let owner_id = account_id(conn, owner)?;
            let mut stmt = conn.prepare(
                "SELECT a.id, l.name, a.amount, a.reason, a.created_at
                 FROM adjustments a
                 JOIN listeners l ON a.listener_id = l.id
                 WHERE a.account_id = ?1
                 ORDER BY a.created_at DESC, a.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![owner_id, limit], adjustment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every adjustment made to one listener, newest first.
    pub fn passbook(&self, owner: &str, name: &str) -> Result<Vec<AdjustmentRow>> {
        self.with_conn(|conn| {
            let owner_id = account_id(conn, owner)?;
            let listener = query_listener(conn, owner_id, name)?.ok_or(Error::NotFound("listener"))?;
            let mut stmt = conn.prepare(
                "SELECT a.id, l.name, a.amount, a.reason, a.created_at
                 FROM adjustments a
                 JOIN listeners l ON a.listener_id = l.id
                 WHERE a.listener_id = ?1
                 ORDER BY a.created_at DESC, a.id DESC",
            )?;
            let rows = stmt
                .query_map([listener.id], adjustment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Balance update plus passbook entry. Callers must already be inside a
/// transaction so the two writes land together.
pub(crate) fn apply_delta(
    conn: &Connection,
    owner_id: i64,
    listener: &ListenerRow,
    delta: i64,
    reason: &str,
) -> Result<ListenerRow> {
    if delta < 0 && listener.points + delta < 0 {
        return Err(Error::InsufficientBalance {
            balance: listener.points,
            requested: delta.saturating_neg(),
        });
    }

    let points = listener
        .points
        .checked_add(delta)
        .ok_or(Error::Invalid("balance out of range"))?;
    let total_points = listener
        .total_points
        .checked_add(delta.max(0))
        .ok_or(Error::Invalid("balance out of range"))?;

    conn.execute(
        "UPDATE listeners SET points = ?1, total_points = ?2 WHERE id = ?3",
        params![points, total_points, listener.id],
    )?;
    insert_adjustment(conn, owner_id, listener.id, delta, reason)?;

    Ok(ListenerRow {
        points,
        total_points,
        ..listener.clone()
    })
}

fn insert_listener(conn: &Connection, owner_id: i64, name: &str, points: i64) -> Result<ListenerRow> {
    conn.execute(
        "INSERT INTO listeners (account_id, name, points, total_points) VALUES (?1, ?2, ?3, ?3)",
        params![owner_id, name, points],
    )
    .map_err(|e| on_unique(e, Error::Duplicate("listener")))?;

    query_listener(conn, owner_id, name)?.ok_or(Error::NotFound("listener"))
}

fn insert_adjustment(conn: &Connection, owner_id: i64, listener_id: i64, amount: i64, reason: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO adjustments (account_id, listener_id, amount, reason) VALUES (?1, ?2, ?3, ?4)",
        params![owner_id, listener_id, amount, reason],
    )?;
    Ok(())
}

pub(crate) fn query_listener(conn: &Connection, owner_id: i64, name: &str) -> Result<Option<ListenerRow>> {
    let row = conn
        .query_row(
            "SELECT id, name, points, total_points, created_at FROM listeners
             WHERE account_id = ?1 AND name = ?2",
            params![owner_id, name],
            listener_from_row,
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn listener_from_row(row: &Row<'_>) -> rusqlite::Result<ListenerRow> {
    Ok(ListenerRow {
        id: row.get(0)?,
        name: row.get(1)?,
        points: row.get(2)?,
        total_points: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn adjustment_from_row(row: &Row<'_>) -> rusqlite::Result<AdjustmentRow> {
    Ok(AdjustmentRow {
        id: row.get(0)?,
        listener: row.get(1)?,
        amount: row.get(2)?,
        reason: row.get(3)?,
        created_at: row.get(4)?,
    })
}
