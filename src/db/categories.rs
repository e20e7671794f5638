use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Category, Post};
use crate::db::posts::row_to_post;
use crate::error::AppError;
use crate::state::DbPool;

const MAX_NAME_LEN: usize = 100;
const MAX_SLUG_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        created: row.get(4)?,
    })
}

pub fn create(pool: &DbPool, name: &str, slug: &str, description: &str) -> Result<Category, AppError> {
    let name = name.trim();
    let slug = slug.trim();
    validate(name, slug, description)?;

    let conn = pool.get()?;
    check_uniqueness(&conn, name, slug, None)?;

    let now = Utc::now();
    conn.execute(
        "INSERT INTO categories (name, slug, description, created) VALUES (?1, ?2, ?3, ?4)",
        params![name, slug, description, now],
    )?;
    let id = conn.last_insert_rowid();

    Ok(Category {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
        description: description.to_string(),
        created: now,
    })
}

pub fn get(pool: &DbPool, id: i64) -> Result<Category, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT id, name, slug, description, created FROM categories WHERE id = ?1",
        params![id],
        row_to_category,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

pub fn get_by_slug(pool: &DbPool, slug: &str) -> Result<Category, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT id, name, slug, description, created FROM categories WHERE slug = ?1",
        params![slug],
        row_to_category,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// All categories, alphabetical.
pub fn list(pool: &DbPool) -> Result<Vec<Category>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, slug, description, created FROM categories ORDER BY name",
    )?;
    let categories = stmt
        .query_map([], row_to_category)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn update(
    pool: &DbPool,
    id: i64,
    name: &str,
    slug: &str,
    description: &str,
) -> Result<(), AppError> {
    let name = name.trim();
    let slug = slug.trim();
    validate(name, slug, description)?;

    let conn = pool.get()?;
    check_uniqueness(&conn, name, slug, Some(id))?;

    let affected = conn.execute(
        "UPDATE categories SET name = ?1, slug = ?2, description = ?3 WHERE id = ?4",
        params![name, slug, description, id],
    )?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub fn delete(pool: &DbPool, id: i64) -> Result<(), AppError> {
    let conn = pool.get()?;
    let affected = conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Attach a post to a category. Already-attached is a no-op.
pub fn assign_post(pool: &DbPool, post_id: i64, category_id: i64) -> Result<(), AppError> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
        params![post_id, category_id],
    )?;
    Ok(())
}

pub fn unassign_post(pool: &DbPool, post_id: i64, category_id: i64) -> Result<(), AppError> {
    let conn = pool.get()?;
    conn.execute(
        "DELETE FROM post_categories WHERE post_id = ?1 AND category_id = ?2",
        params![post_id, category_id],
    )?;
    Ok(())
}

/// Categories a post belongs to, alphabetical.
pub fn for_post(pool: &DbPool, post_id: i64) -> Result<Vec<Category>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.slug, c.description, c.created
         FROM categories c
         JOIN post_categories pc ON c.id = pc.category_id
         WHERE pc.post_id = ?1
         ORDER BY c.name",
    )?;
    let categories = stmt
        .query_map(params![post_id], row_to_category)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

/// Posts in a category, newest first, with pagination.
pub fn posts_in(
    pool: &DbPool,
    category_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.content, p.user_id, p.created, p.updated, u.username
         FROM posts p
         JOIN users u ON p.user_id = u.id
         JOIN post_categories pc ON p.id = pc.post_id
         WHERE pc.category_id = ?1
         ORDER BY p.created DESC
         LIMIT ?2 OFFSET ?3",
    )?;
    let posts = stmt
        .query_map(params![category_id, limit, offset], row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

fn check_uniqueness(
    conn: &Connection,
    name: &str,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<(), AppError> {
    let exclude = exclude_id.unwrap_or(-1);

    let name_taken: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM categories WHERE name = ?1 AND id != ?2",
            params![name, exclude],
            |row| row.get(0),
        )
        .optional()?;
    if name_taken.is_some() {
        return Err(AppError::Conflict(
            "a category with that name already exists".to_string(),
        ));
    }

    let slug_taken: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM categories WHERE slug = ?1 AND id != ?2",
            params![slug, exclude],
            |row| row.get(0),
        )
        .optional()?;
    if slug_taken.is_some() {
        return Err(AppError::Conflict(
            "a category with that slug already exists".to_string(),
        ));
    }

    Ok(())
}

fn validate(name: &str, slug: &str, description: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::Validation(
            "category name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(AppError::Validation(
            "category name must not exceed 100 characters".to_string(),
        ));
    }
    if slug.is_empty() {
        return Err(AppError::Validation("slug must not be empty".to_string()));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(AppError::Validation(
            "slug must not exceed 100 characters".to_string(),
        ));
    }
    let slug_ok = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !slug_ok {
        return Err(AppError::Validation(
            "slug may only contain lowercase letters, digits and hyphens".to_string(),
        ));
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(
            "description must not exceed 500 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_slug_rules() {
        assert!(validate("General", "general", "").is_ok());
        assert!(validate("", "general", "").is_err());
        assert!(validate(&"x".repeat(101), "general", "").is_err());
        assert!(validate("General", "", "").is_err());
        assert!(validate("General", "Bad Slug", "").is_err());
        assert!(validate("General", &"x".repeat(101), "").is_err());
        assert!(validate("General", "general", &"x".repeat(501)).is_err());
    }
}
