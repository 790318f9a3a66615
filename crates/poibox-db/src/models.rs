//! Database row types, one per table, as seen by the web layer.

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: i64,
    pub handle: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRow {
    pub id: i64,
    pub name: String,
    pub points: i64,
    pub total_points: i64,
    pub created_at: String,
}

/// A passbook entry. `listener` is the listener's name.
#[derive(Debug, Clone)]
pub struct AdjustmentRow {
    pub id: i64,
    pub listener: String,
    pub amount: i64,
    pub reason: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    /// Handle of the liver whose board the post is on.
    pub scope: String,
    pub author: String,
    pub body: String,
    pub parent_id: Option<i64>,
    pub like_count: i64,
    pub created_at: String,
}

impl PostRow {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Who a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSubject {
    Account { id: i64, handle: String },
    Listener { id: i64, name: String, scope: String },
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub subject: SessionSubject,
    pub expires_at: i64,
}
