use chrono::{DateTime, Utc};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub expires: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Author username, joined in from `users` on every read.
    pub author: String,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created: DateTime<Utc>,
}

/// What a reaction applies to. Exactly one of post or comment, by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Post(i64),
    Comment(i64),
}

impl Target {
    /// Build a target from the two optional form identifiers. Both set or
    /// neither set is rejected.
    pub fn from_ids(post_id: Option<i64>, comment_id: Option<i64>) -> Result<Self, AppError> {
        match (post_id, comment_id) {
            (Some(id), None) => Ok(Target::Post(id)),
            (None, Some(id)) => Ok(Target::Comment(id)),
            _ => Err(AppError::InvalidTarget),
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            Target::Post(_) => "post_id",
            Target::Comment(_) => "comment_id",
        }
    }

    pub(crate) fn id(&self) -> i64 {
        match self {
            Target::Post(id) | Target::Comment(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Like,
    Dislike,
}

impl Polarity {
    pub fn is_dislike(&self) -> bool {
        matches!(self, Polarity::Dislike)
    }

    pub fn from_dislike(is_dislike: bool) -> Self {
        if is_dislike {
            Polarity::Dislike
        } else {
            Polarity::Like
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reaction {
    pub id: i64,
    pub user_id: i64,
    pub target: Target,
    pub polarity: Polarity,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionStats {
    pub likes: i64,
    pub dislikes: i64,
}
