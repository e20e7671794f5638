use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::Form;
use serde::Deserialize;

use crate::db::models::{Category, Comment, Polarity, Post, ReactionStats, Target};
use crate::db::{categories, comments, posts, reactions};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;

// -- Templates --

pub struct CategoryOption {
    pub category: Category,
    pub checked: bool,
}

#[derive(Template)]
#[template(path = "pages/create_post.html")]
pub struct CreatePostTemplate {
    pub user: Option<CurrentUser>,
    pub options: Vec<CategoryOption>,
    pub error: Option<String>,
    pub title: String,
    pub content: String,
}

#[derive(Template)]
#[template(path = "pages/edit_post.html")]
pub struct EditPostTemplate {
    pub user: Option<CurrentUser>,
    pub post_id: i64,
    pub options: Vec<CategoryOption>,
    pub error: Option<String>,
    pub title: String,
    pub content: String,
}

pub struct CommentView {
    pub comment: Comment,
    pub stats: ReactionStats,
    pub mine: Option<Polarity>,
}

#[derive(Template)]
#[template(path = "pages/view_post.html")]
pub struct ViewPostTemplate {
    pub user: Option<CurrentUser>,
    pub post: Post,
    pub post_categories: Vec<Category>,
    pub stats: ReactionStats,
    pub my_reaction: Option<Polarity>,
    pub comments: Vec<CommentView>,
    pub comment_error: Option<String>,
    pub comment_draft: String,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub categories: Vec<i64>,
}

#[derive(Deserialize)]
pub struct DeletePostForm {
    pub post_id: i64,
}

fn category_options(state: &AppState, checked: &[i64]) -> AppResult<Vec<CategoryOption>> {
    let options = categories::list(&state.db)?
        .into_iter()
        .map(|category| {
            let is_checked = checked.contains(&category.id);
            CategoryOption {
                category,
                checked: is_checked,
            }
        })
        .collect();
    Ok(options)
}

// -- Handlers --

/// GET /post/create — render the new-post form
pub async fn create_page(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    Ok(Html(CreatePostTemplate {
        options: category_options(&state, &[])?,
        user: Some(user),
        error: None,
        title: String::new(),
        content: String::new(),
    })
    .into_response())
}

/// POST /post/create
pub async fn create_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    match posts::create(&state.db, &form.title, &form.content, user.id, &form.categories) {
        Ok(created) => {
            tracing::info!(
                "Post created: id={} title={:?} author={:?}",
                created.id,
                created.title,
                user.username
            );
            Ok(Redirect::to(&format!("/post/{}", created.id)).into_response())
        }
        Err(err) if err.is_form_error() => Ok(Html(CreatePostTemplate {
            options: category_options(&state, &form.categories)?,
            user: Some(user),
            error: Some(err.to_string()),
            title: form.title,
            content: form.content,
        })
        .into_response()),
        Err(err) => Err(err),
    }
}

/// GET /post/{id} — post with comments, reaction stats and the viewer's
/// own reaction
pub async fn view(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let template = view_data(&state, user, id, None, String::new())?;
    Ok(Html(template).into_response())
}

/// Collect everything the post page shows. Shared with the comment-create
/// handler so a failed comment re-renders the page with an inline error.
pub(crate) fn view_data(
    state: &AppState,
    user: Option<CurrentUser>,
    post_id: i64,
    comment_error: Option<String>,
    comment_draft: String,
) -> AppResult<ViewPostTemplate> {
    let post = posts::get(&state.db, post_id)?;
    let post_categories = categories::for_post(&state.db, post_id)?;
    let stats = reactions::stats(&state.db, Target::Post(post_id))?;
    let my_reaction = user
        .as_ref()
        .and_then(|u| reactions::user_reaction(&state.db, u.id, Target::Post(post_id)).ok())
        .map(|r| r.polarity);

    let mut comment_views = Vec::new();
    for comment in comments::for_post(&state.db, post_id)? {
        let stats = reactions::stats(&state.db, Target::Comment(comment.id))?;
        let mine = user
            .as_ref()
            .and_then(|u| {
                reactions::user_reaction(&state.db, u.id, Target::Comment(comment.id)).ok()
            })
            .map(|r| r.polarity);
        comment_views.push(CommentView {
            comment,
            stats,
            mine,
        });
    }

    Ok(ViewPostTemplate {
        user,
        post,
        post_categories,
        stats,
        my_reaction,
        comments: comment_views,
        comment_error,
        comment_draft,
    })
}

/// GET /post/{id}/edit — render the edit form (author only)
pub async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let post = posts::get(&state.db, id)?;
    if post.user_id != user.id {
        return Err(AppError::NotAuthor);
    }

    let checked: Vec<i64> = categories::for_post(&state.db, id)?
        .iter()
        .map(|c| c.id)
        .collect();

    Ok(Html(EditPostTemplate {
        options: category_options(&state, &checked)?,
        user: Some(user),
        post_id: id,
        error: None,
        title: post.title,
        content: post.content,
    })
    .into_response())
}

/// POST /post/{id}/edit
pub async fn edit_submit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    match posts::update(&state.db, id, &form.title, &form.content, &form.categories, user.id) {
        Ok(()) => {
            tracing::info!("Post updated: id={} author={:?}", id, user.username);
            Ok(Redirect::to(&format!("/post/{}", id)).into_response())
        }
        Err(err) if err.is_form_error() => Ok(Html(EditPostTemplate {
            options: category_options(&state, &form.categories)?,
            user: Some(user),
            post_id: id,
            error: Some(err.to_string()),
            title: form.title,
            content: form.content,
        })
        .into_response()),
        Err(err) => Err(err),
    }
}

/// POST /post/delete — author only, id carried in the form
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<DeletePostForm>,
) -> AppResult<Response> {
    posts::delete(&state.db, form.post_id, user.id)?;
    tracing::info!("Post deleted: id={} author={:?}", form.post_id, user.username);
    Ok(Redirect::to("/").into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/create", get(create_page).post(create_submit))
        .route("/post/delete", post(delete))
        .route("/post/{id}", get(view))
        .route("/post/{id}/edit", get(edit_page).post(edit_submit))
}
