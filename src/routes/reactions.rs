use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::models::{Polarity, Target};
use crate::db::{comments, posts, reactions};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReactForm {
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub action: String,
}

/// POST /react — like, dislike or remove a reaction on a post or a comment,
/// then back to the post page.
pub async fn react(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ReactForm>,
) -> AppResult<Response> {
    let target = Target::from_ids(form.post_id, form.comment_id)?;

    // 404 for a vanished target; also tells us which post to return to.
    let back_to = match target {
        Target::Post(id) => posts::get(&state.db, id)?.id,
        Target::Comment(id) => comments::get(&state.db, id)?.post_id,
    };

    let result = match form.action.as_str() {
        "like" => reactions::set(&state.db, user.id, target, Polarity::Like),
        "dislike" => reactions::set(&state.db, user.id, target, Polarity::Dislike),
        "remove" => reactions::remove(&state.db, user.id, target),
        other => {
            return Err(AppError::Validation(format!(
                "unknown reaction action: {}",
                other
            )))
        }
    };

    match result {
        Ok(()) => {}
        // The page already reflects the user's current reaction; nothing to
        // change, so this is not an error worth a page of its own.
        Err(AppError::AlreadyReacted) | Err(AppError::NotFound) => {}
        Err(err) => return Err(err),
    }

    Ok(Redirect::to(&format!("/post/{}", back_to)).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/react", post(react))
}
