use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use poibox_types::api::PostForm;
use poibox_types::validate;

use crate::error::ApiError;
use crate::flash::{self, Redirected};
use crate::listener::{liver_segment, viewer_for};
use crate::middleware::listener_session;
use crate::pages;
use crate::state::{AppState, run_db};

/// GET /{liver}/board
pub async fn show(State(state): State<AppState>, Path(liver): Path<String>, jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);

    let loaded: Result<_, ApiError> = async {
        let viewer = viewer_for(&state, &jar, &liver).await?;
        let scope = liver.clone();
        let listing = run_db(&state, move |db| db.list_posts(&scope)).await?;
        Ok((viewer, listing))
    }
    .await;

    match loaded {
        Ok((viewer, listing)) => {
            let page = pages::board(flash.as_ref(), &liver, &listing, viewer.as_ref().map(|v| v.name.as_str()));
            (jar, page).into_response()
        }
        Err(err) => err.back_to("/").into_response(),
    }
}

/// POST /{liver}/board: new post, or a reply when `parent_id` is set.
pub async fn create(
    State(state): State<AppState>,
    Path(liver): Path<String>,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Redirected {
    if let Err(err) = liver_segment(&liver) {
        return err.back_to("/");
    }
    let board = format!("/{liver}/board");
    match try_create(&state, &liver, &jar, &form).await {
        Ok(id) => Redirected::to(format!("{board}#post-{id}")),
        Err(ApiError::Unauthenticated) => ApiError::Unauthenticated.back_to(format!("/{liver}/welcome")),
        Err(err) => err.back_to(board),
    }
}

async fn try_create(state: &AppState, liver: &str, jar: &CookieJar, form: &PostForm) -> Result<i64, ApiError> {
    let viewer = viewer_for(state, jar, liver)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    let body = validate::post_body(&form.message)?.to_string();
    let parent_id = validate::parent_id(&form.parent_id)?;

    let (scope, author) = (liver.to_string(), viewer.name.clone());
    let id = run_db(state, move |db| db.create_post(&scope, &author, &body, parent_id)).await?;

    info!(liver, author = %viewer.name, id, ?parent_id, "post created");
    Ok(id)
}

/// POST /like/{post_id}: the liker is whoever holds the listener session.
/// That session must belong to the board the post is on.
pub async fn like(State(state): State<AppState>, Path(post_id): Path<String>, jar: CookieJar) -> Redirected {
    let session = match listener_session(&state, &jar).await {
        Ok(Some(session)) => session,
        Ok(None) => return ApiError::Unauthenticated.back_to("/"),
        Err(err) => return err.back_to("/"),
    };
    let own_board = format!("/{}/board", session.scope);
    let post_id = match validate::post_id(&post_id) {
        Ok(id) => id,
        Err(err) => return ApiError::from(err).back_to(own_board),
    };

    let post = match run_db(&state, move |db| db.get_post(post_id)).await {
        Ok(Some(post)) => post,
        Ok(None) => return ApiError::NotFound("post".into()).back_to(own_board),
        Err(err) => return err.back_to(own_board),
    };
    if post.scope != session.scope {
        return ApiError::Unauthorized.back_to(format!("/{}/board", post.scope));
    }

    let reward = state.settings.like_reward;
    let (scope, liker) = (session.scope.clone(), session.name.clone());
    match run_db(&state, move |db| db.like(&scope, post_id, &liker, reward)).await {
        Ok(outcome) => {
            info!(
                liver = %session.scope,
                liker = %session.name,
                post_id,
                likes = outcome.like_count,
                rewarded = outcome.rewarded,
                "post liked"
            );
            Redirected::to(format!("{own_board}#post-{post_id}"))
        }
        Err(err) => err.back_to(own_board),
    }
}
