use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;
use crate::error::AppError;
use crate::state::DbPool;

/// Register a new user. Validates the input, checks username and email
/// uniqueness, hashes the password with bcrypt and inserts the row.
pub fn create(pool: &DbPool, username: &str, email: &str, password: &str) -> Result<User, AppError> {
    let username = username.trim();
    let email = email.trim();

    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)?;

    let conn = pool.get()?;
    check_uniqueness(&conn, username, email)?;

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hash failed: {}", e)))?;

    let now = Utc::now();
    conn.execute(
        "INSERT INTO users (username, email, password_hash, created) VALUES (?1, ?2, ?3, ?4)",
        params![username, email, password_hash, now],
    )?;
    let id = conn.last_insert_rowid();

    Ok(User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password_hash,
        created: now,
    })
}

/// Check login credentials. Returns the user's id and username on success.
pub fn verify(pool: &DbPool, email: &str, password: &str) -> Result<(i64, String), AppError> {
    let conn = pool.get()?;
    let row: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT id, username, password_hash FROM users WHERE email = ?1",
            params![email.trim()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let (id, username, hash) = row
        .ok_or_else(|| AppError::Validation("no account found with that email".to_string()))?;

    let ok = bcrypt::verify(password, &hash)
        .map_err(|e| AppError::Internal(format!("password verify failed: {}", e)))?;
    if !ok {
        return Err(AppError::Validation("incorrect password".to_string()));
    }

    Ok((id, username))
}

pub fn get(pool: &DbPool, id: i64) -> Result<User, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT id, username, email, password_hash, created FROM users WHERE id = ?1",
        params![id],
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
    .optional()?
    .ok_or(AppError::NotFound)
}

fn check_uniqueness(conn: &Connection, username: &str, email: &str) -> Result<(), AppError> {
    let username_taken: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()?;
    if username_taken.is_some() {
        return Err(AppError::Conflict(
            "that username is already taken".to_string(),
        ));
    }

    let email_taken: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()?;
    if email_taken.is_some() {
        return Err(AppError::Conflict(
            "an account with that email already exists".to_string(),
        ));
    }

    Ok(())
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.len() < 3 {
        return Err(AppError::Validation(
            "username must be at least 3 characters".to_string(),
        ));
    }
    if username.len() > 50 {
        return Err(AppError::Validation(
            "username must not exceed 50 characters".to_string(),
        ));
    }
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(AppError::Validation(
            "username may only contain letters, digits, underscore and hyphen".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() {
        return Err(AppError::Validation("email must not be empty".to_string()));
    }
    if email.len() > 255 {
        return Err(AppError::Validation(
            "email must not exceed 255 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 6 {
        return Err(AppError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }
    if password.len() > 128 {
        return Err(AppError::Validation(
            "password must not exceed 128 characters".to_string(),
        ));
    }
    Ok(())
}
