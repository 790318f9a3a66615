use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use poibox_types::api::{AdminAction, AdminForm, SearchQuery};
use poibox_types::validate;

use crate::error::ApiError;
use crate::flash::{self, Redirected};
use crate::middleware::AccountSession;
use crate::pages;
use crate::state::{AppState, run_db};

/// Reason recorded when the admin leaves the field blank.
const DEFAULT_REASON: &str = "manual adjustment";

/// GET /admin: the liver's own ledger.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(account): Extension<AccountSession>,
    jar: CookieJar,
    Query(query): Query<SearchQuery>,
) -> Response {
    let (jar, flash) = flash::take(jar);
    let limit = state.settings.history_limit;
    let owner = account.handle.clone();
    let q = query.q.trim().to_string();
    let search = q.clone();

    let loaded = run_db(&state, move |db| {
        let search = (!search.is_empty()).then_some(search.as_str());
        let listeners = db.list_listeners(&owner, search)?;
        let history = db.history(&owner, limit)?;
        Ok((listeners, history))
    })
    .await;

    match loaded {
        Ok((listeners, history)) => {
            let page = pages::admin(flash.as_ref(), &account.handle, &q, &listeners, &history);
            (jar, page).into_response()
        }
        Err(err) => err.back_to("/").into_response(),
    }
}

/// POST /admin: create a listener or adjust a balance.
pub async fn act(
    State(state): State<AppState>,
    Extension(account): Extension<AccountSession>,
    Form(form): Form<AdminForm>,
) -> Redirected {
    let result = match validate::admin_action(&form.action) {
        Ok(AdminAction::Create) => create_listener(&state, &account, &form).await,
        Ok(AdminAction::Adjust) => adjust_points(&state, &account, &form).await,
        Err(err) => Err(err.into()),
    };
    match result {
        Ok(notice) => Redirected::to("/admin").notice(notice),
        Err(err) => err.back_to("/admin"),
    }
}

async fn create_listener(state: &AppState, account: &AccountSession, form: &AdminForm) -> Result<String, ApiError> {
    let name = validate::listener_name(&form.name)?.to_string();
    let points = validate::initial_points(&form.points)?;

    let owner = account.handle.clone();
    let listener = run_db(state, move |db| db.create_listener(&owner, &name, points)).await?;

    info!(owner = %account.handle, listener = %listener.name, points, "listener added");
    Ok(format!("Added {} with {} points.", listener.name, listener.points))
}

async fn adjust_points(state: &AppState, account: &AccountSession, form: &AdminForm) -> Result<String, ApiError> {
    let name = validate::listener_name(&form.name)?.to_string();
    let delta = validate::delta(&form.points)?;
    let reason = match validate::reason(&form.reason)? {
        "" => DEFAULT_REASON.to_string(),
        reason => reason.to_string(),
    };

    let owner = account.handle.clone();
    let listener = run_db(state, move |db| db.adjust_points(&owner, &name, delta, &reason)).await?;

    info!(owner = %account.handle, listener = %listener.name, delta, "points adjusted");
    Ok(format!(
        "{} now has {} points ({} in total).",
        listener.name, listener.points, listener.total_points
    ))
}
