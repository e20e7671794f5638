use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::{comments, posts};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::routes::home::Html;
use crate::routes::posts::view_data;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CommentForm {
    pub post_id: i64,
    pub content: String,
}

#[derive(Deserialize)]
pub struct DeleteCommentForm {
    pub comment_id: i64,
}

/// POST /comment/create — add a comment, back to the post
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    // 404 before validation if the post is gone
    posts::get(&state.db, form.post_id)?;

    match comments::create(&state.db, &form.content, form.post_id, user.id) {
        Ok(_) => Ok(Redirect::to(&format!("/post/{}", form.post_id)).into_response()),
        Err(err) if err.is_form_error() => {
            let template = view_data(
                &state,
                Some(user),
                form.post_id,
                Some(err.to_string()),
                form.content,
            )?;
            Ok(Html(template).into_response())
        }
        Err(err) => Err(err),
    }
}

/// POST /comment/delete — author only, back to the post
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<DeleteCommentForm>,
) -> AppResult<Response> {
    let comment = comments::get(&state.db, form.comment_id)?;
    comments::delete(&state.db, form.comment_id, user.id)?;
    tracing::info!(
        "Comment deleted: id={} author={:?}",
        form.comment_id,
        user.username
    );
    Ok(Redirect::to(&format!("/post/{}", comment.post_id)).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comment/create", post(create))
        .route("/comment/delete", post(delete))
}
