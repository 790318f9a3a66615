use rusqlite::{Connection, OptionalExtension};

use crate::error::on_unique;
use crate::models::AccountRow;
use crate::{Database, Error, Result};

impl Database {
    pub fn create_account(&self, handle: &str, password_hash: &str) -> Result<AccountRow> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO accounts (handle, password) VALUES (?1, ?2)",
                (handle, password_hash),
            )
            .map_err(|e| on_unique(e, Error::Duplicate("handle")))?;

            query_account_by_handle(tx, handle)?.ok_or(Error::NotFound("account"))
        })
    }

    pub fn get_account_by_handle(&self, handle: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account_by_handle(conn, handle))
    }

    /// Liver handles containing `q`, case-insensitively, alphabetical.
    pub fn search_accounts(&self, q: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT handle FROM accounts
                 WHERE instr(lower(handle), lower(?1)) > 0
                 ORDER BY handle ASC",
            )?;
            let handles = stmt
                .query_map([q], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(handles)
        })
    }
}

pub(crate) fn query_account_by_handle(conn: &Connection, handle: &str) -> Result<Option<AccountRow>> {
    let row = conn
        .query_row(
            "SELECT id, handle, password, created_at FROM accounts WHERE handle = ?1",
            [handle],
            |row| {
                Ok(AccountRow {
                    id: row.get(0)?,
                    handle: row.get(1)?,
                    password: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(row)
}

/// Resolves a liver handle to its account id.
pub(crate) fn account_id(conn: &Connection, handle: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM accounts WHERE handle = ?1", [handle], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or(Error::NotFound("liver"))
}
