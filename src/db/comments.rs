use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Comment;
use crate::error::AppError;
use crate::state::DbPool;

const MAX_CONTENT_LEN: usize = 2_000;

fn row_to_comment(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        content: row.get(1)?,
        post_id: row.get(2)?,
        user_id: row.get(3)?,
        created: row.get(4)?,
        updated: row.get(5)?,
        author: row.get(6)?,
    })
}

pub fn create(pool: &DbPool, content: &str, post_id: i64, user_id: i64) -> Result<Comment, AppError> {
    let content = content.trim();
    validate(content)?;

    let conn = pool.get()?;
    let now = Utc::now();
    conn.execute(
        "INSERT INTO comments (content, post_id, user_id, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![content, post_id, user_id, now, now],
    )?;
    let id = conn.last_insert_rowid();

    Ok(Comment {
        id,
        content: content.to_string(),
        post_id,
        user_id,
        created: now,
        updated: now,
        author: String::new(),
    })
}

pub fn get(pool: &DbPool, id: i64) -> Result<Comment, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT c.id, c.content, c.post_id, c.user_id, c.created, c.updated, u.username
         FROM comments c
         JOIN users u ON c.user_id = u.id
         WHERE c.id = ?1",
        params![id],
        row_to_comment,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// All comments on a post, oldest first.
pub fn for_post(pool: &DbPool, post_id: i64) -> Result<Vec<Comment>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT c.id, c.content, c.post_id, c.user_id, c.created, c.updated, u.username
         FROM comments c
         JOIN users u ON c.user_id = u.id
         WHERE c.post_id = ?1
         ORDER BY c.created ASC",
    )?;
    let comments = stmt
        .query_map(params![post_id], row_to_comment)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// A user's comments, newest first.
pub fn for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Comment>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT c.id, c.content, c.post_id, c.user_id, c.created, c.updated, u.username
         FROM comments c
         JOIN users u ON c.user_id = u.id
         WHERE c.user_id = ?1
         ORDER BY c.created DESC",
    )?;
    let comments = stmt
        .query_map(params![user_id], row_to_comment)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Update a comment. Only the author may do this.
pub fn update(pool: &DbPool, id: i64, content: &str, user_id: i64) -> Result<(), AppError> {
    let content = content.trim();
    validate(content)?;

    let conn = pool.get()?;
    require_author(&conn, id, user_id)?;

    conn.execute(
        "UPDATE comments SET content = ?1, updated = ?2 WHERE id = ?3",
        params![content, Utc::now(), id],
    )?;
    Ok(())
}

/// Delete a comment. Only the author may do this.
pub fn delete(pool: &DbPool, id: i64, user_id: i64) -> Result<(), AppError> {
    let conn = pool.get()?;
    require_author(&conn, id, user_id)?;

    let affected = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub fn count_for_post(pool: &DbPool, post_id: i64) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn require_author(conn: &Connection, comment_id: i64, user_id: i64) -> Result<(), AppError> {
    let author_id: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM comments WHERE id = ?1",
            params![comment_id],
            |row| row.get(0),
        )
        .optional()?;
    match author_id {
        None => Err(AppError::NotFound),
        Some(author_id) if author_id != user_id => Err(AppError::NotAuthor),
        Some(_) => Ok(()),
    }
}

fn validate(content: &str) -> Result<(), AppError> {
    if content.is_empty() {
        return Err(AppError::Validation(
            "comment must not be empty".to_string(),
        ));
    }
    if content.len() > MAX_CONTENT_LEN {
        return Err(AppError::Validation(
            "comment must not exceed 2000 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_rules() {
        assert!(validate("nice post").is_ok());
        assert!(validate("").is_err());
        assert!(validate(&"x".repeat(2_001)).is_err());
    }
}
