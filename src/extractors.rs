use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::db::sessions;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Extractor that requires authentication.
/// Rejection redirects to the login page.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;

        let user =
            sessions::user_for_token(&state.db, token).map_err(|err| match err {
                AppError::SessionExpired => AppError::SessionExpired,
                _ => AppError::Unauthorized,
            })?;

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
        })
    }
}

/// Optional user extractor — returns None instead of redirecting when not
/// authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

pub fn session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}
