use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rand_core::OsRng;
use tracing::{error, info};

use poibox_db::models::SessionSubject;
use poibox_types::api::{LoginForm, SearchQuery, SignupForm};
use poibox_types::validate;

use crate::error::ApiError;
use crate::flash::{self, Redirected};
use crate::middleware::{SESSION_COOKIE, account_session, close_session, open_session};
use crate::pages;
use crate::state::{AppState, run_db};

/// GET /: landing page with liver search.
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SearchQuery>,
) -> Response {
    let (jar, flash) = flash::take(jar);
    let session = account_session(&state, &jar).await.unwrap_or(None);

    let q = query.q.trim().to_string();
    let results = if q.is_empty() {
        Vec::new()
    } else {
        let needle = q.clone();
        match run_db(&state, move |db| db.search_accounts(&needle)).await {
            Ok(results) => results,
            Err(err) => return err.back_to("/").into_response(),
        }
    };

    let page = pages::landing(
        flash.as_ref(),
        session.as_ref().map(|s| s.handle.as_str()),
        &q,
        &results,
    );
    (jar, page).into_response()
}

pub async fn signup_page(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = flash::take(jar);
    (jar, pages::account_form(flash.as_ref(), "/signup"))
}

pub async fn login_page(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = flash::take(jar);
    (jar, pages::account_form(flash.as_ref(), "/login"))
}

/// POST /signup
pub async fn signup(State(state): State<AppState>, jar: CookieJar, Form(form): Form<SignupForm>) -> Redirected {
    match try_signup(&state, form).await {
        Ok((handle, cookie)) => Redirected::to("/admin")
            .notice(format!("Welcome, {handle}! Your ledger is ready."))
            .with_jar(jar.add(cookie)),
        Err(err) => err.back_to("/signup"),
    }
}

async fn try_signup(
    state: &AppState,
    form: SignupForm,
) -> Result<(String, Cookie<'static>), ApiError> {
    let handle = validate::handle(&form.handle)?.to_string();
    let password = validate::password(&form.password)?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            error!("password hashing failed: {}", e);
            ApiError::Internal
        })?
        .to_string();

    let h = handle.clone();
    let account = run_db(state, move |db| db.create_account(&h, &password_hash)).await?;
    info!(handle = %account.handle, "account created");

    let cookie = open_session(
        state,
        SESSION_COOKIE,
        SessionSubject::Account {
            id: account.id,
            handle: account.handle,
        },
    )
    .await?;
    Ok((handle, cookie))
}

/// POST /login
pub async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> Redirected {
    let handle = form.handle.trim().to_string();
    let lookup = handle.clone();
    let account = match run_db(&state, move |db| db.get_account_by_handle(&lookup)).await {
        Ok(Some(account)) => account,
        Ok(None) => return ApiError::InvalidCredentials.back_to("/login"),
        Err(err) => return err.back_to("/login"),
    };

    // Verify password
    let verified = PasswordHash::new(&account.password)
        .map(|parsed| {
            Argon2::default()
                .verify_password(form.password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or_else(|e| {
            error!(handle = %account.handle, "stored password hash is unreadable: {}", e);
            false
        });
    if !verified {
        info!(handle = %handle, "failed login");
        return ApiError::InvalidCredentials.back_to("/login");
    }

    let subject = SessionSubject::Account {
        id: account.id,
        handle: account.handle,
    };
    match open_session(&state, SESSION_COOKIE, subject).await {
        Ok(cookie) => Redirected::to("/admin").with_jar(jar.add(cookie)),
        Err(err) => err.back_to("/login"),
    }
}

/// GET /logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Redirected {
    match close_session(&state, jar, SESSION_COOKIE).await {
        Ok(jar) => Redirected::to("/").notice("Signed out.").with_jar(jar),
        Err(err) => err.back_to("/"),
    }
}
