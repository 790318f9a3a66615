use thiserror::Error;
use tracing::error;

use poibox_types::validate::ValidationError;

use crate::flash::Redirected;

/// Every way a request can fail. None of these reach the client as a bare
/// status code; handlers turn them into a flash message and a redirect.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("that {0} already exists")]
    Duplicate(String),

    #[error("wrong handle or password")]
    InvalidCredentials,

    #[error("please sign in first")]
    Unauthenticated,

    #[error("you are not allowed to do that")]
    Unauthorized,

    #[error("not enough points: balance is {balance}, tried to take {requested}")]
    InsufficientBalance { balance: i64, requested: i64 },

    #[error("you already liked this post")]
    AlreadyLiked,

    #[error("you cannot like your own post")]
    SelfLike,

    #[error("something went wrong, please try again")]
    Internal,
}

impl ApiError {
    /// Redirects to `location`, showing this error there.
    pub fn back_to(self, location: impl Into<String>) -> Redirected {
        Redirected::to(location).error(self.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<poibox_db::Error> for ApiError {
    fn from(err: poibox_db::Error) -> Self {
        use poibox_db::Error as Db;

        match err {
            Db::Duplicate(what) => Self::Duplicate(what.to_string()),
            Db::NotFound(what) => Self::NotFound(what.to_string()),
            Db::NotRegistered { .. } => Self::Unauthenticated,
            Db::InsufficientBalance { balance, requested } => {
                Self::InsufficientBalance { balance, requested }
            }
            Db::AlreadyLiked => Self::AlreadyLiked,
            Db::SelfLike => Self::SelfLike,
            Db::Invalid(msg) => Self::Validation(msg.to_string()),
            err @ (Db::Poisoned | Db::Sqlite(_)) => {
                error!("database error: {}", err);
                Self::Internal
            }
        }
    }
}
