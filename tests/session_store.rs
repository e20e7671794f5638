use chrono::{Duration, Utc};
use palaver::db;
use palaver::db::{sessions, users};
use palaver::error::AppError;
use palaver::state::DbPool;
use rusqlite::params;
use tempfile::TempDir;

fn setup() -> (TempDir, DbPool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    (temp_dir, pool)
}

fn register(pool: &DbPool, username: &str, email: &str) -> i64 {
    users::create(pool, username, email, "secret1")
        .expect("Failed to create user")
        .id
}

fn backdate(pool: &DbPool, token: &str, hours: i64) {
    let past = Utc::now() - Duration::hours(hours);
    let conn = pool.get().unwrap();
    conn.execute(
        "UPDATE sessions SET expires = ?1 WHERE token = ?2",
        params![past, token],
    )
    .unwrap();
}

#[test]
fn session_token_is_64_hex_chars() {
    let (_tmp, pool) = setup();
    let user_id = register(&pool, "alice", "alice@example.com");

    let session = sessions::create(&pool, user_id, 24).unwrap();
    assert_eq!(session.token.len(), 64);
    assert!(session.token.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(session.expires > session.created);
}

#[test]
fn second_session_invalidates_the_first() {
    let (_tmp, pool) = setup();
    let user_id = register(&pool, "alice", "alice@example.com");

    let first = sessions::create(&pool, user_id, 24).unwrap();
    let second = sessions::create(&pool, user_id, 24).unwrap();
    assert_ne!(first.token, second.token);

    // Old token is gone, new one resolves
    assert!(matches!(
        sessions::get(&pool, &first.token),
        Err(AppError::NotFound)
    ));
    let resolved = sessions::get(&pool, &second.token).unwrap();
    assert_eq!(resolved.user_id, user_id);

    // And only one row survives
    let conn = pool.get().unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn sessions_for_different_users_coexist() {
    let (_tmp, pool) = setup();
    let alice = register(&pool, "alice", "alice@example.com");
    let bob = register(&pool, "bob", "bob@example.com");

    let alice_session = sessions::create(&pool, alice, 24).unwrap();
    let bob_session = sessions::create(&pool, bob, 24).unwrap();

    assert_eq!(sessions::get(&pool, &alice_session.token).unwrap().user_id, alice);
    assert_eq!(sessions::get(&pool, &bob_session.token).unwrap().user_id, bob);
}

#[test]
fn expired_session_is_deleted_on_lookup() {
    let (_tmp, pool) = setup();
    let user_id = register(&pool, "alice", "alice@example.com");

    let session = sessions::create(&pool, user_id, 24).unwrap();
    backdate(&pool, &session.token, 1);

    // First lookup reports expiry and deletes the row
    assert!(matches!(
        sessions::get(&pool, &session.token),
        Err(AppError::SessionExpired)
    ));
    // Second lookup no longer finds it
    assert!(matches!(
        sessions::get(&pool, &session.token),
        Err(AppError::NotFound)
    ));
}

#[test]
fn user_for_token_resolves_the_owner() {
    let (_tmp, pool) = setup();
    let user_id = register(&pool, "alice", "alice@example.com");
    let session = sessions::create(&pool, user_id, 24).unwrap();

    let user = sessions::user_for_token(&pool, &session.token).unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.username, "alice");
}

#[test]
fn user_for_token_reports_expiry() {
    let (_tmp, pool) = setup();
    let user_id = register(&pool, "alice", "alice@example.com");
    let session = sessions::create(&pool, user_id, 24).unwrap();
    backdate(&pool, &session.token, 1);

    assert!(matches!(
        sessions::user_for_token(&pool, &session.token),
        Err(AppError::SessionExpired)
    ));
}

#[test]
fn orphaned_session_is_cleaned_up_on_lookup() {
    let (_tmp, pool) = setup();
    let user_id = register(&pool, "alice", "alice@example.com");
    let session = sessions::create(&pool, user_id, 24).unwrap();

    // Remove the user out from under the session, keeping the session row
    {
        let conn = pool.get().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])
            .unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    }

    assert!(matches!(
        sessions::user_for_token(&pool, &session.token),
        Err(AppError::NotFound)
    ));

    // The dangling row was deleted too
    let conn = pool.get().unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn delete_unknown_token_is_not_found() {
    let (_tmp, pool) = setup();
    assert!(matches!(
        sessions::delete(&pool, "no-such-token"),
        Err(AppError::NotFound)
    ));
}

#[test]
fn delete_removes_the_session() {
    let (_tmp, pool) = setup();
    let user_id = register(&pool, "alice", "alice@example.com");
    let session = sessions::create(&pool, user_id, 24).unwrap();

    sessions::delete(&pool, &session.token).unwrap();
    assert!(matches!(
        sessions::get(&pool, &session.token),
        Err(AppError::NotFound)
    ));
}

#[test]
fn cleanup_removes_only_expired_sessions() {
    let (_tmp, pool) = setup();
    let alice = register(&pool, "alice", "alice@example.com");
    let bob = register(&pool, "bob", "bob@example.com");

    let stale = sessions::create(&pool, alice, 24).unwrap();
    let live = sessions::create(&pool, bob, 24).unwrap();
    backdate(&pool, &stale.token, 1);

    let removed = sessions::cleanup_expired(&pool).unwrap();
    assert_eq!(removed, 1);

    assert!(matches!(
        sessions::get(&pool, &stale.token),
        Err(AppError::NotFound)
    ));
    assert!(sessions::get(&pool, &live.token).is_ok());
}
