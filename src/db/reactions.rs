use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::models::{Polarity, Post, Reaction, ReactionStats, Target};
use crate::db::posts::row_to_post;
use crate::error::AppError;
use crate::state::DbPool;

/// Record a like or dislike for a target.
///
/// Three-state toggle per (user, target): no existing reaction inserts a new
/// row, an opposite-polarity reaction is switched in place, and re-asserting
/// the current polarity is rejected with `AlreadyReacted` so the delivery
/// layer can show an "already reacted" state.
pub fn set(pool: &DbPool, user_id: i64, target: Target, polarity: Polarity) -> Result<(), AppError> {
    match user_reaction(pool, user_id, target) {
        Ok(existing) => {
            if existing.polarity == polarity {
                return Err(AppError::AlreadyReacted);
            }
            let conn = pool.get()?;
            conn.execute(
                "UPDATE likes SET is_dislike = ?1 WHERE id = ?2",
                params![polarity.is_dislike(), existing.id],
            )?;
            Ok(())
        }
        Err(AppError::NotFound) => {
            let (post_id, comment_id) = match target {
                Target::Post(id) => (Some(id), None),
                Target::Comment(id) => (None, Some(id)),
            };
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO likes (user_id, post_id, comment_id, is_dislike, created)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, post_id, comment_id, polarity.is_dislike(), Utc::now()],
            )?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Remove a user's reaction from a target. Fails if there is none.
pub fn remove(pool: &DbPool, user_id: i64, target: Target) -> Result<(), AppError> {
    let conn = pool.get()?;
    let sql = format!(
        "DELETE FROM likes WHERE user_id = ?1 AND {} = ?2",
        target.column()
    );
    let affected = conn.execute(&sql, params![user_id, target.id()])?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Like and dislike counts for a target, in one read.
pub fn stats(pool: &DbPool, target: Target) -> Result<ReactionStats, AppError> {
    let conn = pool.get()?;
    let sql = format!(
        "SELECT
            COUNT(CASE WHEN is_dislike = 0 THEN 1 END),
            COUNT(CASE WHEN is_dislike = 1 THEN 1 END)
         FROM likes WHERE {} = ?1",
        target.column()
    );
    let stats = conn.query_row(&sql, params![target.id()], |row| {
        Ok(ReactionStats {
            likes: row.get(0)?,
            dislikes: row.get(1)?,
        })
    })?;
    Ok(stats)
}

/// The user's current reaction for a target, if any.
pub fn user_reaction(pool: &DbPool, user_id: i64, target: Target) -> Result<Reaction, AppError> {
    let conn = pool.get()?;
    let sql = format!(
        "SELECT id, user_id, post_id, comment_id, is_dislike, created
         FROM likes WHERE user_id = ?1 AND {} = ?2",
        target.column()
    );
    let row = conn
        .query_row(&sql, params![user_id, target.id()], |row| {
            let post_id: Option<i64> = row.get(2)?;
            let comment_id: Option<i64> = row.get(3)?;
            let is_dislike: bool = row.get(4)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                post_id,
                comment_id,
                is_dislike,
                row.get::<_, chrono::DateTime<Utc>>(5)?,
            ))
        })
        .optional()?;

    let (id, user_id, post_id, comment_id, is_dislike, created) =
        row.ok_or(AppError::NotFound)?;

    Ok(Reaction {
        id,
        user_id,
        target: Target::from_ids(post_id, comment_id)?,
        polarity: Polarity::from_dislike(is_dislike),
        created,
    })
}

/// Posts the user has liked, most recently liked first.
pub fn liked_posts(pool: &DbPool, user_id: i64) -> Result<Vec<Post>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.content, p.user_id, p.created, p.updated, u.username
         FROM posts p
         JOIN users u ON p.user_id = u.id
         JOIN likes l ON p.id = l.post_id
         WHERE l.user_id = ?1 AND l.is_dislike = 0
         ORDER BY l.created DESC",
    )?;
    let posts = stmt
        .query_map(params![user_id], row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}
