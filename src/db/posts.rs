use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Post;
use crate::error::AppError;
use crate::state::DbPool;

const MAX_TITLE_LEN: usize = 255;
const MAX_CONTENT_LEN: usize = 10_000;

pub(crate) fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        user_id: row.get(3)?,
        created: row.get(4)?,
        updated: row.get(5)?,
        author: row.get(6)?,
    })
}

/// Create a post and attach it to the given categories.
pub fn create(
    pool: &DbPool,
    title: &str,
    content: &str,
    user_id: i64,
    category_ids: &[i64],
) -> Result<Post, AppError> {
    let title = title.trim();
    let content = content.trim();
    validate(title, content)?;

    let conn = pool.get()?;
    let now = Utc::now();
    conn.execute(
        "INSERT INTO posts (title, content, user_id, created, updated)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![title, content, user_id, now, now],
    )?;
    let id = conn.last_insert_rowid();

    for category_id in category_ids {
        conn.execute(
            "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
            params![id, category_id],
        )?;
    }

    Ok(Post {
        id,
        title: title.to_string(),
        content: content.to_string(),
        user_id,
        created: now,
        updated: now,
        author: String::new(),
    })
}

/// Fetch a post with its author's username.
pub fn get(pool: &DbPool, id: i64) -> Result<Post, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT p.id, p.title, p.content, p.user_id, p.created, p.updated, u.username
         FROM posts p
         JOIN users u ON p.user_id = u.id
         WHERE p.id = ?1",
        params![id],
        row_to_post,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// All posts, newest first, with pagination.
pub fn list(pool: &DbPool, limit: i64, offset: i64) -> Result<Vec<Post>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.content, p.user_id, p.created, p.updated, u.username
         FROM posts p
         JOIN users u ON p.user_id = u.id
         ORDER BY p.created DESC
         LIMIT ?1 OFFSET ?2",
    )?;
    let posts = stmt
        .query_map(params![limit, offset], row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// A user's own posts, newest first.
pub fn list_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Post>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.content, p.user_id, p.created, p.updated, u.username
         FROM posts p
         JOIN users u ON p.user_id = u.id
         WHERE p.user_id = ?1
         ORDER BY p.created DESC",
    )?;
    let posts = stmt
        .query_map(params![user_id], row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Update a post. Only the author may do this; the category links are
/// replaced with the given set.
pub fn update(
    pool: &DbPool,
    id: i64,
    title: &str,
    content: &str,
    category_ids: &[i64],
    user_id: i64,
) -> Result<(), AppError> {
    let title = title.trim();
    let content = content.trim();
    validate(title, content)?;

    let conn = pool.get()?;
    require_author(&conn, id, user_id)?;

    conn.execute(
        "UPDATE posts SET title = ?1, content = ?2, updated = ?3 WHERE id = ?4",
        params![title, content, Utc::now(), id],
    )?;

    conn.execute(
        "DELETE FROM post_categories WHERE post_id = ?1",
        params![id],
    )?;
    for category_id in category_ids {
        conn.execute(
            "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
            params![id, category_id],
        )?;
    }

    Ok(())
}

/// Delete a post. Only the author may do this.
pub fn delete(pool: &DbPool, id: i64, user_id: i64) -> Result<(), AppError> {
    let conn = pool.get()?;
    require_author(&conn, id, user_id)?;

    let affected = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub fn count(pool: &DbPool) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let count = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
    Ok(count)
}

fn require_author(conn: &Connection, post_id: i64, user_id: i64) -> Result<(), AppError> {
    let author_id: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM posts WHERE id = ?1",
            params![post_id],
            |row| row.get(0),
        )
        .optional()?;
    match author_id {
        None => Err(AppError::NotFound),
        Some(author_id) if author_id != user_id => Err(AppError::NotAuthor),
        Some(_) => Ok(()),
    }
}

fn validate(title: &str, content: &str) -> Result<(), AppError> {
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(AppError::Validation(
            "title must not exceed 255 characters".to_string(),
        ));
    }
    if content.is_empty() {
        return Err(AppError::Validation(
            "post content must not be empty".to_string(),
        ));
    }
    if content.len() > MAX_CONTENT_LEN {
        return Err(AppError::Validation(
            "post content must not exceed 10000 characters".to_string(),
        ));
    }
    Ok(())
}
