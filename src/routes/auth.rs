use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::models::{Comment, Post};
use crate::db::{comments, posts, reactions, sessions, users};
use crate::error::AppResult;
use crate::extractors::{self, CurrentUser, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub username: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub email: String,
}

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub user: Option<CurrentUser>,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub liked: Vec<Post>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=-1", name)
}

fn redirect_with_cookie(location: &str, cookie: String) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, cookie),
        ],
        "",
    )
        .into_response()
}

// -- Register handlers --

/// GET /register — render registration form (guests only)
pub async fn register_page(MaybeUser(user): MaybeUser) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(RegisterTemplate {
        user: None,
        error: None,
        username: String::new(),
        email: String::new(),
    })
    .into_response())
}

/// POST /register — create the account, open a session, redirect home
pub async fn register_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    tracing::info!("Registering user: username={:?} email={:?}", form.username, form.email);

    let created = match users::create(&state.db, &form.username, &form.email, &form.password) {
        Ok(user) => user,
        Err(err) if err.is_form_error() => {
            return Ok(Html(RegisterTemplate {
                user: None,
                error: Some(err.to_string()),
                username: form.username,
                email: form.email,
            })
            .into_response());
        }
        Err(err) => return Err(err),
    };

    let session = match sessions::create(&state.db, created.id, state.config.auth.session_hours) {
        Ok(session) => session,
        Err(err) => {
            tracing::error!("Failed to create session for user {}: {}", created.id, err);
            return Ok(Redirect::to("/login").into_response());
        }
    };

    tracing::info!("Registered user {:?} (id {})", created.username, created.id);

    Ok(redirect_with_cookie(
        "/",
        session_cookie(
            &state.config.auth.cookie_name,
            &session.token,
            state.config.auth.session_hours,
        ),
    ))
}

// -- Login handlers --

/// GET /login — render login form (guests only)
pub async fn login_page(MaybeUser(user): MaybeUser) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(LoginTemplate {
        user: None,
        error: None,
        email: String::new(),
    })
    .into_response())
}

/// POST /login — verify credentials, open a session, redirect home
pub async fn login_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let (user_id, username) = match users::verify(&state.db, &form.email, &form.password) {
        Ok(found) => found,
        Err(err) if err.is_form_error() => {
            return Ok(Html(LoginTemplate {
                user: None,
                error: Some(err.to_string()),
                email: form.email,
            })
            .into_response());
        }
        Err(err) => return Err(err),
    };

    let session = sessions::create(&state.db, user_id, state.config.auth.session_hours)?;

    tracing::info!("Login successful for {:?} (id {})", username, user_id);

    Ok(redirect_with_cookie(
        "/",
        session_cookie(
            &state.config.auth.cookie_name,
            &session.token,
            state.config.auth.session_hours,
        ),
    ))
}

// -- Logout handler --

/// POST /logout — delete session, clear cookie, redirect home
pub async fn logout(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _body) = request.into_parts();

    if let Some(token) = extractors::session_token(&parts, &state.config.auth.cookie_name) {
        if let Err(err) = sessions::delete(&state.db, token) {
            tracing::warn!("Failed to delete session on logout: {}", err);
        }
    }

    Ok(redirect_with_cookie(
        "/",
        clear_session_cookie(&state.config.auth.cookie_name),
    ))
}

// -- Profile handler --

/// GET /profile — the current user's posts, comments and liked posts
pub async fn profile(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let posts = posts::list_for_user(&state.db, user.id)?;
    let comments = comments::for_user(&state.db, user.id)?;
    let liked = reactions::liked_posts(&state.db, user.id)?;

    Ok(Html(ProfileTemplate {
        user: Some(user),
        posts,
        comments,
        liked,
    })
    .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register_submit))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}
