use std::sync::Arc;

use tracing::error;

use poibox_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// HMAC key for session tokens.
    pub session_secret: String,
    pub settings: Settings,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub session_days: i64,
    /// Rows shown in the admin panel's recent adjustments.
    pub history_limit: u32,
    /// Points credited to a post's author per like. 0 disables.
    pub like_reward: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_days: 30,
            history_limit: 5,
            like_reward: 1,
        }
    }
}

/// Runs a blocking database call off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> poibox_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}
