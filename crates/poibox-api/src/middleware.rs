use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, error};
use uuid::Uuid;

use poibox_db::models::SessionSubject;
use poibox_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Cookie holding a liver's admin session.
pub const SESSION_COOKIE: &str = "poibox_session";
/// Cookie holding a listener's session for one liver's pages.
pub const LISTENER_COOKIE: &str = "poibox_listener";

#[derive(Debug, Clone)]
pub struct AccountSession {
    pub sid: Uuid,
    pub account_id: i64,
    pub handle: String,
}

#[derive(Debug, Clone)]
pub struct ListenerSession {
    pub sid: Uuid,
    pub listener_id: i64,
    pub name: String,
    /// Handle of the liver this listener belongs to.
    pub scope: String,
}

/// Gate for the admin routes: resolves the account session or sends the
/// visitor to the login page.
pub async fn require_account(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match account_session(&state, &jar).await {
        Ok(Some(session)) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Ok(None) => ApiError::Unauthenticated.back_to("/login").into_response(),
        Err(err) => err.back_to("/").into_response(),
    }
}

pub async fn account_session(state: &AppState, jar: &CookieJar) -> Result<Option<AccountSession>, ApiError> {
    let Some((sid, subject)) = resolve(state, jar, SESSION_COOKIE).await? else {
        return Ok(None);
    };
    Ok(match subject {
        SessionSubject::Account { id, handle } => Some(AccountSession {
            sid,
            account_id: id,
            handle,
        }),
        SessionSubject::Listener { .. } => None,
    })
}

pub async fn listener_session(state: &AppState, jar: &CookieJar) -> Result<Option<ListenerSession>, ApiError> {
    let Some((sid, subject)) = resolve(state, jar, LISTENER_COOKIE).await? else {
        return Ok(None);
    };
    Ok(match subject {
        SessionSubject::Listener { id, name, scope } => Some(ListenerSession {
            sid,
            listener_id: id,
            name,
            scope,
        }),
        SessionSubject::Account { .. } => None,
    })
}

/// Validates the token in `cookie` and checks that its server-side session
/// still exists and names the same subject.
async fn resolve(
    state: &AppState,
    jar: &CookieJar,
    cookie: &str,
) -> Result<Option<(Uuid, SessionSubject)>, ApiError> {
    let Some(token) = jar.get(cookie).map(|c| c.value().to_string()) else {
        return Ok(None);
    };
    let Some(claims) = decode_token(&state.session_secret, &token) else {
        debug!(cookie, "rejected session token");
        return Ok(None);
    };

    let sid = claims.sid.to_string();
    let now = chrono::Utc::now().timestamp();
    let Some(row) = run_db(state, move |db| db.get_session(&sid, now)).await? else {
        return Ok(None);
    };

    let consistent = match &row.subject {
        SessionSubject::Account { handle, .. } => claims.scope.is_none() && *handle == claims.sub,
        SessionSubject::Listener { name, scope, .. } => {
            claims.scope.as_deref() == Some(scope.as_str()) && *name == claims.sub
        }
    };
    Ok(consistent.then_some((claims.sid, row.subject)))
}

/// Creates the server-side session and returns the cookie that refers to it.
pub async fn open_session(
    state: &AppState,
    cookie: &'static str,
    subject: SessionSubject,
) -> Result<Cookie<'static>, ApiError> {
    let sid = Uuid::new_v4();
    let now = chrono::Utc::now();
    let expires_at = chrono::TimeDelta::try_days(state.settings.session_days)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            error!(days = state.settings.session_days, "session lifetime out of range");
            ApiError::Internal
        })?
        .timestamp();

    let (sub, scope) = match &subject {
        SessionSubject::Account { handle, .. } => (handle.clone(), None),
        SessionSubject::Listener { name, scope, .. } => (name.clone(), Some(scope.clone())),
    };
    let claims = Claims {
        sid,
        sub,
        scope,
        exp: expires_at as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.session_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("failed to sign session token: {}", e);
        ApiError::Internal
    })?;

    let id = sid.to_string();
    run_db(state, move |db| db.create_session(&id, &subject, expires_at, now.timestamp())).await?;

    Ok(Cookie::build((cookie, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build())
}

/// Deletes the session behind `cookie` (if any) and expires the cookie.
pub async fn close_session(state: &AppState, jar: CookieJar, cookie: &'static str) -> Result<CookieJar, ApiError> {
    if let Some(claims) = jar
        .get(cookie)
        .and_then(|c| decode_token(&state.session_secret, c.value()))
    {
        let sid = claims.sid.to_string();
        run_db(state, move |db| db.delete_session(&sid)).await?;
    }
    Ok(jar.remove(Cookie::build(cookie).path("/")))
}

fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}
