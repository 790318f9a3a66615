pub mod admin;
pub mod auth;
pub mod board;
pub mod error;
pub mod flash;
pub mod listener;
pub mod middleware;
pub mod pages;
pub mod state;

use axum::{
    Json, Router, middleware as mw,
    routing::{get, post},
};
use serde_json::{Value, json};

pub use state::{AppState, AppStateInner, Settings};

/// Every route of the app. Admin routes sit behind the account session gate.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin", get(admin::dashboard).post(admin::act))
        .layer(mw::from_fn_with_state(state.clone(), middleware::require_account));

    Router::new()
        .route("/", get(auth::index))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/health", get(health))
        .route("/like/{post_id}", post(board::like))
        .route("/{liver}/welcome", get(listener::welcome).post(listener::identify))
        .route("/{liver}/board", get(board::show).post(board::create))
        .route("/{liver}/members", get(listener::members))
        .merge(admin_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
