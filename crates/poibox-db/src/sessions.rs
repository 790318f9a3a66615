use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::error::on_unique;
use crate::models::{SessionRow, SessionSubject};
use crate::{Database, Error, Result};

impl Database {
    /// Stores a session row. `expires_at` is a unix timestamp in seconds.
    /// Rows that expired before `now` are swept in the same transaction.
    pub fn create_session(&self, id: &str, subject: &SessionSubject, expires_at: i64, now: i64) -> Result<()> {
        let (account_id, listener_id) = match subject {
            SessionSubject::Account { id, .. } => (Some(*id), None),
            SessionSubject::Listener { id, .. } => (None, Some(*id)),
        };

        self.with_tx(|tx| {
            let purged = tx.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?;
            if purged > 0 {
                debug!(purged, "expired sessions removed");
            }

            tx.execute(
                "INSERT INTO sessions (id, account_id, listener_id, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, account_id, listener_id, expires_at],
            )
            .map_err(|e| on_unique(e, Error::Duplicate("session")))?;
            Ok(())
        })
    }

    /// Looks up a live session, resolving its subject to current names.
    pub fn get_session(&self, id: &str, now: i64) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT s.id, s.expires_at, a.id, a.handle, l.id, l.name, la.handle
                     FROM sessions s
                     LEFT JOIN accounts a ON s.account_id = a.id
                     LEFT JOIN listeners l ON s.listener_id = l.id
                     LEFT JOIN accounts la ON l.account_id = la.id
                     WHERE s.id = ?1 AND s.expires_at > ?2",
                    params![id, now],
                    |row| {
                        let account: Option<(i64, String)> = match row.get::<_, Option<i64>>(2)? {
                            Some(id) => Some((id, row.get(3)?)),
                            None => None,
                        };
                        let listener: Option<(i64, String, String)> = match row.get::<_, Option<i64>>(4)? {
                            Some(id) => Some((id, row.get(5)?, row.get(6)?)),
                            None => None,
                        };
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, account, listener))
                    },
                )
                .optional()?;

            let Some((id, expires_at, account, listener)) = row else {
                return Ok(None);
            };
            let subject = match (account, listener) {
                (Some((id, handle)), None) => SessionSubject::Account { id, handle },
                (None, Some((id, name, scope))) => SessionSubject::Listener { id, name, scope },
                _ => return Ok(None),
            };
            Ok(Some(SessionRow {
                id,
                subject,
                expires_at,
            }))
        })
    }

    /// Returns whether a row was removed.
    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_tx(|tx| {
            let removed = tx.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn account_session_lifecycle() {
        let db = testing::open();
        let alice = db.create_account("alice_liver", "hash").unwrap();
        let subject = SessionSubject::Account {
            id: alice.id,
            handle: alice.handle.clone(),
        };

        db.create_session("s1", &subject, 2_000, 1_000).unwrap();
        let session = db.get_session("s1", 1_500).unwrap().unwrap();
        assert_eq!(session.subject, subject);

        // expired
        assert!(db.get_session("s1", 2_000).unwrap().is_none());

        assert!(db.delete_session("s1").unwrap());
        assert!(!db.delete_session("s1").unwrap());
        assert!(db.get_session("s1", 1_500).unwrap().is_none());
    }

    #[test]
    fn listener_session_carries_scope() {
        let db = testing::open();
        db.create_account("alice_liver", "hash").unwrap();
        let bob = db.register_listener("alice_liver", "bob").unwrap();
        let subject = SessionSubject::Listener {
            id: bob.id,
            name: "bob".into(),
            scope: "alice_liver".into(),
        };

        db.create_session("s2", &subject, 100, 0).unwrap();
        assert_eq!(db.get_session("s2", 50).unwrap().unwrap().subject, subject);
    }

    #[test]
    fn creating_a_session_sweeps_expired_ones() {
        let db = testing::open();
        let alice = db.create_account("alice_liver", "hash").unwrap();
        let subject = SessionSubject::Account {
            id: alice.id,
            handle: alice.handle,
        };

        db.create_session("old", &subject, 10, 0).unwrap();
        db.create_session("new", &subject, 100, 20).unwrap();
        assert!(!db.delete_session("old").unwrap());
        assert!(db.delete_session("new").unwrap());
    }
}
