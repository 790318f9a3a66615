use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::accounts::account_id;
use crate::error::on_unique;
use crate::ledger::{apply_delta, listener_from_row, query_listener};
use crate::models::{ListenerRow, PostRow};
use crate::{Database, Error, Result};

/// Passbook reason written when a like rewards the post's author.
pub const LIKE_REASON: &str = "like";

/// A board split into threads: top-level posts newest first, and replies
/// grouped under their parent, oldest first.
#[derive(Debug, Default)]
pub struct PostListing {
    pub top_level: Vec<PostRow>,
    pub replies: HashMap<i64, Vec<PostRow>>,
}

impl PostListing {
    /// Splits rows on `parent_id`. Expects `rows` in creation order.
    pub fn partition(rows: Vec<PostRow>) -> Self {
        let mut listing = Self::default();
        for post in rows {
            match post.parent_id {
                Some(parent) => listing.replies.entry(parent).or_default().push(post),
                None => listing.top_level.push(post),
            }
        }
        listing.top_level.reverse();
        listing
    }

    pub fn replies_to(&self, post_id: i64) -> &[PostRow] {
        self.replies.get(&post_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub like_count: i64,
    /// Points credited to the post's author.
    pub rewarded: i64,
}

impl Database {
    /// Appends a post to `scope`'s board and returns its id. Replies must
    /// point at a top-level post on the same board.
    pub fn create_post(&self, scope: &str, author: &str, body: &str, parent_id: Option<i64>) -> Result<i64> {
        self.with_tx(|tx| {
            let owner_id = account_id(tx, scope)?;
            let author = registered_listener(tx, owner_id, scope, author)?;

            if let Some(parent) = parent_id {
                let is_top_level: Option<bool> = tx
                    .query_row(
                        "SELECT parent_id IS NULL FROM posts WHERE id = ?1 AND account_id = ?2",
                        params![parent, owner_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if is_top_level != Some(true) {
                    return Err(Error::NotFound("post"));
                }
            }

            tx.execute(
                "INSERT INTO posts (account_id, listener_id, body, parent_id) VALUES (?1, ?2, ?3, ?4)",
                params![owner_id, author.id, body, parent_id],
            )?;
            let id = tx.last_insert_rowid();

            debug!(scope, author = %author.name, id, ?parent_id, "post created");
            Ok(id)
        })
    }

    pub fn list_posts(&self, scope: &str) -> Result<PostListing> {
        self.with_conn(|conn| {
            let owner_id = account_id(conn, scope)?;
            let mut stmt = conn.prepare(
                "SELECT p.id, a.handle, l.name, p.body, p.parent_id, p.like_count, p.created_at
                 FROM posts p
                 JOIN accounts a ON p.account_id = a.id
                 JOIN listeners l ON p.listener_id = l.id
                 WHERE p.account_id = ?1
                 ORDER BY p.created_at ASC, p.id ASC",
            )?;
            let rows = stmt
                .query_map([owner_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(PostListing::partition(rows))
        })
    }

    pub fn get_post(&self, post_id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT p.id, a.handle, l.name, p.body, p.parent_id, p.like_count, p.created_at
                     FROM posts p
                     JOIN accounts a ON p.account_id = a.id
                     JOIN listeners l ON p.listener_id = l.id
                     WHERE p.id = ?1",
                    [post_id],
                    post_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Records `liker`'s like on a post in `scope` and bumps its count. When
    /// `reward` is positive the author is credited that many points in the
    /// same transaction.
    pub fn like(&self, scope: &str, post_id: i64, liker: &str, reward: i64) -> Result<LikeOutcome> {
        self.with_tx(|tx| {
            let owner_id = account_id(tx, scope)?;
            let author_id: i64 = tx
                .query_row(
                    "SELECT listener_id FROM posts WHERE id = ?1 AND account_id = ?2",
                    params![post_id, owner_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(Error::NotFound("post"))?;

            let liker = registered_listener(tx, owner_id, scope, liker)?;
            if liker.id == author_id {
                return Err(Error::SelfLike);
            }

            tx.execute(
                "INSERT INTO likes (post_id, listener_id) VALUES (?1, ?2)",
                params![post_id, liker.id],
            )
            .map_err(|e| on_unique(e, Error::AlreadyLiked))?;

            tx.execute("UPDATE posts SET like_count = like_count + 1 WHERE id = ?1", [post_id])?;
            let like_count: i64 =
                tx.query_row("SELECT like_count FROM posts WHERE id = ?1", [post_id], |row| row.get(0))?;

            let rewarded = if reward > 0 {
                let author = query_listener_by_id(tx, author_id)?;
                apply_delta(tx, owner_id, &author, reward, LIKE_REASON)?;
                reward
            } else {
                0
            };

            debug!(scope, post_id, liker = %liker.name, like_count, "post liked");
            Ok(LikeOutcome { like_count, rewarded })
        })
    }
}

fn registered_listener(conn: &Connection, owner_id: i64, scope: &str, name: &str) -> Result<ListenerRow> {
    query_listener(conn, owner_id, name)?.ok_or_else(|| Error::NotRegistered {
        scope: scope.to_string(),
        name: name.to_string(),
    })
}

fn query_listener_by_id(conn: &Connection, id: i64) -> Result<ListenerRow> {
    let row = conn.query_row(
        "SELECT id, name, points, total_points, created_at FROM listeners WHERE id = ?1",
        [id],
        listener_from_row,
    )?;
    Ok(row)
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        scope: row.get(1)?,
        author: row.get(2)?,
        body: row.get(3)?,
        parent_id: row.get(4)?,
        like_count: row.get(5)?,
        created_at: row.get(6)?,
    })
}
