use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::db::models::{Category, Post, ReactionStats, Target};
use crate::db::{categories, posts, reactions};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::state::AppState;

pub const PAGE_SIZE: i64 = 20;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// A post together with the bits the list pages show alongside it.
pub struct PostCard {
    pub post: Post,
    pub categories: Vec<Category>,
    pub stats: ReactionStats,
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub user: Option<CurrentUser>,
    pub cards: Vec<PostCard>,
    pub categories: Vec<Category>,
    pub filter: Option<String>,
}

#[derive(Deserialize)]
pub struct HomeQuery {
    pub category: Option<String>,
    pub page: Option<i64>,
}

pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<HomeQuery>,
) -> AppResult<Response> {
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * PAGE_SIZE;

    let filter = query.category.filter(|s| !s.is_empty());
    let posts = match filter.as_deref() {
        Some(slug) => {
            let category = categories::get_by_slug(&state.db, slug)?;
            categories::posts_in(&state.db, category.id, PAGE_SIZE, offset)?
        }
        None => posts::list(&state.db, PAGE_SIZE, offset)?,
    };

    let cards = build_cards(&state, posts)?;
    let all_categories = categories::list(&state.db)?;

    Ok(Html(HomeTemplate {
        user,
        cards,
        categories: all_categories,
        filter,
    })
    .into_response())
}

pub(crate) fn build_cards(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostCard>> {
    let mut cards = Vec::with_capacity(posts.len());
    for post in posts {
        let post_categories = categories::for_post(&state.db, post.id)?;
        let stats = reactions::stats(&state.db, Target::Post(post.id))?;
        cards.push(PostCard {
            post,
            categories: post_categories,
            stats,
        });
    }
    Ok(cards)
}
