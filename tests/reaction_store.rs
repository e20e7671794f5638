use palaver::db;
use palaver::db::models::{Polarity, ReactionStats, Target};
use palaver::db::{comments, posts, reactions, users};
use palaver::error::AppError;
use palaver::state::DbPool;
use tempfile::TempDir;

fn setup() -> (TempDir, DbPool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    (temp_dir, pool)
}

fn seed_post(pool: &DbPool) -> (i64, i64) {
    let user = users::create(pool, "alice", "alice@example.com", "secret1").unwrap();
    let post = posts::create(pool, "Hello", "First post", user.id, &[]).unwrap();
    (user.id, post.id)
}

#[test]
fn like_then_like_again_is_rejected() {
    let (_tmp, pool) = setup();
    let (user_id, post_id) = seed_post(&pool);
    let target = Target::Post(post_id);

    reactions::set(&pool, user_id, target, Polarity::Like).unwrap();
    assert!(matches!(
        reactions::set(&pool, user_id, target, Polarity::Like),
        Err(AppError::AlreadyReacted)
    ));

    // The count did not move
    assert_eq!(
        reactions::stats(&pool, target).unwrap(),
        ReactionStats { likes: 1, dislikes: 0 }
    );
}

#[test]
fn opposite_polarity_switches_in_place() {
    let (_tmp, pool) = setup();
    let (user_id, post_id) = seed_post(&pool);
    let target = Target::Post(post_id);

    reactions::set(&pool, user_id, target, Polarity::Like).unwrap();
    reactions::set(&pool, user_id, target, Polarity::Dislike).unwrap();

    assert_eq!(
        reactions::stats(&pool, target).unwrap(),
        ReactionStats { likes: 0, dislikes: 1 }
    );
    let mine = reactions::user_reaction(&pool, user_id, target).unwrap();
    assert_eq!(mine.polarity, Polarity::Dislike);
}

#[test]
fn remove_clears_the_reaction() {
    let (_tmp, pool) = setup();
    let (user_id, post_id) = seed_post(&pool);
    let target = Target::Post(post_id);

    reactions::set(&pool, user_id, target, Polarity::Like).unwrap();
    reactions::remove(&pool, user_id, target).unwrap();

    assert_eq!(reactions::stats(&pool, target).unwrap(), ReactionStats::default());
    assert!(matches!(
        reactions::remove(&pool, user_id, target),
        Err(AppError::NotFound)
    ));
}

#[test]
fn comment_reactions_are_independent_of_the_post() {
    let (_tmp, pool) = setup();
    let (user_id, post_id) = seed_post(&pool);
    let comment = comments::create(&pool, "Nice one", post_id, user_id).unwrap();

    reactions::set(&pool, user_id, Target::Post(post_id), Polarity::Like).unwrap();
    reactions::set(&pool, user_id, Target::Comment(comment.id), Polarity::Dislike).unwrap();

    assert_eq!(
        reactions::stats(&pool, Target::Post(post_id)).unwrap(),
        ReactionStats { likes: 1, dislikes: 0 }
    );
    assert_eq!(
        reactions::stats(&pool, Target::Comment(comment.id)).unwrap(),
        ReactionStats { likes: 0, dislikes: 1 }
    );
}

#[test]
fn stats_aggregate_across_users() {
    let (_tmp, pool) = setup();
    let (alice, post_id) = seed_post(&pool);
    let bob = users::create(&pool, "bob", "bob@example.com", "secret1")
        .unwrap()
        .id;
    let target = Target::Post(post_id);

    reactions::set(&pool, alice, target, Polarity::Like).unwrap();
    reactions::set(&pool, bob, target, Polarity::Dislike).unwrap();

    assert_eq!(
        reactions::stats(&pool, target).unwrap(),
        ReactionStats { likes: 1, dislikes: 1 }
    );
}

#[test]
fn target_rejects_both_or_neither_id() {
    assert!(matches!(
        Target::from_ids(Some(1), Some(2)),
        Err(AppError::InvalidTarget)
    ));
    assert!(matches!(
        Target::from_ids(None, None),
        Err(AppError::InvalidTarget)
    ));
}

#[test]
fn liked_posts_lists_likes_only() {
    let (_tmp, pool) = setup();
    let (alice, first) = seed_post(&pool);
    let second = posts::create(&pool, "Another", "More words", alice, &[])
        .unwrap()
        .id;
    let third = posts::create(&pool, "Third", "Even more", alice, &[])
        .unwrap()
        .id;

    reactions::set(&pool, alice, Target::Post(first), Polarity::Like).unwrap();
    reactions::set(&pool, alice, Target::Post(second), Polarity::Dislike).unwrap();
    reactions::set(&pool, alice, Target::Post(third), Polarity::Like).unwrap();

    let liked = reactions::liked_posts(&pool, alice).unwrap();
    let ids: Vec<i64> = liked.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![third, first]); // most recently liked first
}

#[test]
fn deleting_a_post_drops_its_reactions() {
    let (_tmp, pool) = setup();
    let (user_id, post_id) = seed_post(&pool);
    let target = Target::Post(post_id);

    reactions::set(&pool, user_id, target, Polarity::Like).unwrap();
    posts::delete(&pool, post_id, user_id).unwrap();

    assert_eq!(reactions::stats(&pool, target).unwrap(), ReactionStats::default());
}
