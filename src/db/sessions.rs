use chrono::{Duration, Utc};
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::db::models::{Session, User};
use crate::error::AppError;
use crate::state::DbPool;

/// Token length in bytes; hex-encoded to 64 characters.
const TOKEN_BYTES: usize = 32;

/// Create a new session for a user. Any existing sessions for the user are
/// deleted first, so at most one session per user is ever live.
pub fn create(pool: &DbPool, user_id: i64, hours: u64) -> Result<Session, AppError> {
    delete_for_user(pool, user_id)?;

    let token = generate_token();
    let now = Utc::now();
    let expires = now + Duration::hours(hours as i64);

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO sessions (token, user_id, expires, created) VALUES (?1, ?2, ?3, ?4)",
        params![token, user_id, expires, now],
    )?;

    Ok(Session {
        token,
        user_id,
        expires,
        created: now,
    })
}

/// Look up a session by token. Expiry is checked lazily: a stale row is
/// deleted here and reported as `SessionExpired`.
pub fn get(pool: &DbPool, token: &str) -> Result<Session, AppError> {
    let conn = pool.get()?;
    let session = conn
        .query_row(
            "SELECT token, user_id, expires, created FROM sessions WHERE token = ?1",
            params![token],
            |row| {
                Ok(Session {
                    token: row.get(0)?,
                    user_id: row.get(1)?,
                    expires: row.get(2)?,
                    created: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(AppError::NotFound)?;

    if Utc::now() > session.expires {
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        return Err(AppError::SessionExpired);
    }

    Ok(session)
}

/// Resolve the owning user of a session token. A session whose user has
/// disappeared is deleted and reported as not found.
pub fn user_for_token(pool: &DbPool, token: &str) -> Result<User, AppError> {
    let session = get(pool, token)?;

    let conn = pool.get()?;
    let user = conn
        .query_row(
            "SELECT id, username, email, password_hash, created FROM users WHERE id = ?1",
            params![session.user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    created: row.get(4)?,
                })
            },
        )
        .optional()?;

    match user {
        Some(user) => Ok(user),
        None => {
            // Orphaned session
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Err(AppError::NotFound)
        }
    }
}

/// Delete a session by token. Fails if no row matched.
pub fn delete(pool: &DbPool, token: &str) -> Result<(), AppError> {
    let conn = pool.get()?;
    let affected = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Delete all sessions belonging to a user.
pub fn delete_for_user(pool: &DbPool, user_id: i64) -> Result<(), AppError> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
    Ok(())
}

/// Remove expired sessions. Safe to run at any time; lookups already handle
/// expiry lazily, so this only reclaims storage.
pub fn cleanup_expired(pool: &DbPool) -> Result<usize, AppError> {
    let conn = pool.get()?;
    let removed = conn.execute(
        "DELETE FROM sessions WHERE expires < ?1",
        params![Utc::now()],
    )?;
    Ok(removed)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
    }
}
