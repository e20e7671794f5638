use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::categories;
use crate::db::models::Category;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::{build_cards, Html, PostCard, PAGE_SIZE};
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/categories.html")]
pub struct CategoriesTemplate {
    pub user: Option<CurrentUser>,
    pub categories: Vec<Category>,
    pub error: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Template)]
#[template(path = "pages/category.html")]
pub struct CategoryTemplate {
    pub user: Option<CurrentUser>,
    pub category: Category,
    pub cards: Vec<PostCard>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct CategoryQuery {
    pub page: Option<i64>,
}

// -- Handlers --

/// GET /categories — all categories, with a create form for signed-in users
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    Ok(Html(CategoriesTemplate {
        user,
        categories: categories::list(&state.db)?,
        error: None,
        name: String::new(),
        slug: String::new(),
        description: String::new(),
    })
    .into_response())
}

/// POST /categories/create
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    match categories::create(&state.db, &form.name, &form.slug, &form.description) {
        Ok(created) => {
            tracing::info!(
                "Category created: {:?} (slug {:?}) by {:?}",
                created.name,
                created.slug,
                user.username
            );
            Ok(Redirect::to(&format!("/category/{}", created.slug)).into_response())
        }
        Err(err) if err.is_form_error() => Ok(Html(CategoriesTemplate {
            user: Some(user),
            categories: categories::list(&state.db)?,
            error: Some(err.to_string()),
            name: form.name,
            slug: form.slug,
            description: form.description,
        })
        .into_response()),
        Err(err) => Err(err),
    }
}

/// GET /category/{slug} — posts filed under one category, newest first
pub async fn show(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> AppResult<Response> {
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * PAGE_SIZE;

    let category = categories::get_by_slug(&state.db, &slug)?;
    let posts = categories::posts_in(&state.db, category.id, PAGE_SIZE, offset)?;
    let cards = build_cards(&state, posts)?;

    Ok(Html(CategoryTemplate {
        user,
        category,
        cards,
    })
    .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(index))
        .route("/categories/create", post(create))
        .route("/category/{slug}", get(show))
}
