use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{name} is not registered with {scope}")]
    NotRegistered { scope: String, name: String },

    #[error("insufficient balance: {balance} points, tried to take {requested}")]
    InsufficientBalance { balance: i64, requested: i64 },

    #[error("post already liked")]
    AlreadyLiked,

    #[error("cannot like your own post")]
    SelfLike,

    #[error("{0}")]
    Invalid(&'static str),

    #[error("database lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// True for UNIQUE / PRIMARY KEY constraint failures.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Maps a unique-constraint failure to `on_conflict`, passes anything else through.
pub(crate) fn on_unique(err: rusqlite::Error, on_conflict: Error) -> Error {
    if is_unique_violation(&err) {
        on_conflict
    } else {
        Error::Sqlite(err)
    }
}
