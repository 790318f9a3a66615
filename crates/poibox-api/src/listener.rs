use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::info;

use poibox_db::models::SessionSubject;
use poibox_types::api::WelcomeForm;
use poibox_types::validate;

use crate::error::ApiError;
use crate::flash::{self, Redirected};
use crate::middleware::{LISTENER_COOKIE, ListenerSession, listener_session, open_session};
use crate::pages;
use crate::state::{AppState, run_db};

/// Rejects a `{liver}` segment that could never be a handle. Checked before
/// the segment is used to build a redirect target.
pub(crate) fn liver_segment(liver: &str) -> Result<(), ApiError> {
    validate::handle(liver)
        .map(|_| ())
        .map_err(|_| ApiError::NotFound("liver".into()))
}

/// The listener session, but only if it belongs to `liver`'s pages.
pub(crate) async fn viewer_for(
    state: &AppState,
    jar: &CookieJar,
    liver: &str,
) -> Result<Option<ListenerSession>, ApiError> {
    Ok(listener_session(state, jar)
        .await?
        .filter(|session| session.scope == liver))
}

/// GET /{liver}/welcome: identify form, or the listener's balance and passbook.
pub async fn welcome(State(state): State<AppState>, Path(liver): Path<String>, jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);

    let loaded: Result<_, ApiError> = async {
        let viewer = viewer_for(&state, &jar, &liver).await?;
        let scope = liver.clone();
        run_db(&state, move |db| {
            if db.get_account_by_handle(&scope)?.is_none() {
                return Err(poibox_db::Error::NotFound("liver"));
            }
            let Some(viewer) = viewer else {
                return Ok(None);
            };
            let Some(listener) = db.get_listener(&scope, &viewer.name)? else {
                return Ok(None);
            };
            let passbook = db.passbook(&scope, &listener.name)?;
            Ok(Some((listener, passbook)))
        })
        .await
    }
    .await;

    match loaded {
        Ok(Some((listener, passbook))) => {
            (jar, pages::welcome(flash.as_ref(), &liver, Some(&listener), &passbook)).into_response()
        }
        Ok(None) => (jar, pages::welcome(flash.as_ref(), &liver, None, &[])).into_response(),
        Err(err) => err.back_to("/").into_response(),
    }
}

/// POST /{liver}/welcome: registers the name on first visit and opens a
/// listener session for this liver.
pub async fn identify(
    State(state): State<AppState>,
    Path(liver): Path<String>,
    jar: CookieJar,
    Form(form): Form<WelcomeForm>,
) -> Redirected {
    if let Err(err) = liver_segment(&liver) {
        return err.back_to("/");
    }
    let back = format!("/{liver}/welcome");
    match try_identify(&state, &liver, &form).await {
        Ok((name, cookie)) => Redirected::to(back)
            .notice(format!("Hello, {name}!"))
            .with_jar(jar.add(cookie)),
        Err(err @ ApiError::NotFound(_)) => err.back_to("/"),
        Err(err) => err.back_to(back),
    }
}

async fn try_identify(
    state: &AppState,
    liver: &str,
    form: &WelcomeForm,
) -> Result<(String, Cookie<'static>), ApiError> {
    let name = validate::listener_name(&form.name)?.to_string();

    let (scope, n) = (liver.to_string(), name.clone());
    let listener = run_db(state, move |db| db.register_listener(&scope, &n)).await?;
    info!(liver, listener = %listener.name, "listener identified");

    let cookie = open_session(
        state,
        LISTENER_COOKIE,
        SessionSubject::Listener {
            id: listener.id,
            name: listener.name,
            scope: liver.to_string(),
        },
    )
    .await?;
    Ok((name, cookie))
}

/// GET /{liver}/members: public ranking.
pub async fn members(State(state): State<AppState>, Path(liver): Path<String>, jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    let scope = liver.clone();
    match run_db(&state, move |db| db.list_listeners(&scope, None)).await {
        Ok(listeners) => (jar, pages::members(flash.as_ref(), &liver, &listeners)).into_response(),
        Err(err) => err.back_to("/").into_response(),
    }
}
