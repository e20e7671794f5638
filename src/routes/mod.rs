pub mod assets;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod home;
pub mod posts;
pub mod reactions;
