use std::time::Duration;

use tempfile::TempDir;

use warbler::db::models::{
    FollowColumn, LikeColumn, NewFollow, NewLike, NewTweet, NewUser, TweetColumn, User,
    UserColumn,
};
use warbler::db::{self, Database};
use warbler::repository::{
    ConstraintKind, Filter, FollowRepository, LikeRepository, Repository, SqliteRepository,
    TweetRepository, UserRepository,
};

struct Repos {
    users: UserRepository,
    follows: FollowRepository,
    tweets: TweetRepository,
    likes: LikeRepository,
    _temp: TempDir,
}

fn repos() -> Repos {
    let temp = TempDir::new().unwrap();
    let pool = db::create_pool(&temp.path().join("test.db"), 8)
        .expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    let db = Database::new(pool, Duration::from_secs(5));
    Repos {
        users: UserRepository::new(db.clone()),
        follows: SqliteRepository::new(db.clone()),
        tweets: TweetRepository::new(db.clone()),
        likes: SqliteRepository::new(db),
        _temp: temp,
    }
}

fn new_user(name: &str, key: &str) -> NewUser {
    NewUser {
        first_name: name.to_string(),
        last_name: "Test".to_string(),
        api_key: key.to_string(),
    }
}

async fn add_user(r: &Repos, name: &str) -> User {
    r.users
        .add(new_user(name, &format!("{name}-key")).into())
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_on_unique_key_yield_one_row() {
    let r = repos();
    let a = r.users.clone();
    let b = r.users.clone();

    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.add(new_user("One", "shared").into()).await }),
        tokio::spawn(async move { b.add(new_user("Two", "shared").into()).await }),
    );
    let results = [first.unwrap(), second.unwrap()];

    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1, "exactly one add should succeed: {results:?}");
    let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));

    let rows = r
        .users
        .find_all(Filter::by(UserColumn::ApiKey, "shared".to_string()))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn deleting_a_user_cascades_to_dependents() {
    let r = repos();
    let alice = add_user(&r, "Alice").await;
    let bob = add_user(&r, "Bob").await;

    let alice_tweet = r
        .tweets
        .publish(
            NewTweet {
                user_id: alice.id,
                tweet_data: "mine".to_string(),
            },
            Vec::new(),
        )
        .await
        .unwrap();
    let bob_tweet = r
        .tweets
        .publish(
            NewTweet {
                user_id: bob.id,
                tweet_data: "bob's".to_string(),
            },
            Vec::new(),
        )
        .await
        .unwrap();

    // follows in both directions
    for (user_id, follower_id) in [(alice.id, bob.id), (bob.id, alice.id)] {
        r.follows
            .add(NewFollow { user_id, follower_id }.into())
            .await
            .unwrap();
    }
    // alice likes bob's tweet, bob likes alice's
    for (user_id, tweet_id) in [(alice.id, bob_tweet.id), (bob.id, alice_tweet.id)] {
        r.likes
            .add(NewLike { user_id, tweet_id }.into())
            .await
            .unwrap();
    }

    let removed = r
        .users
        .delete(Filter::by(UserColumn::Id, alice.id), false)
        .await
        .unwrap();
    assert_eq!(removed, 1);

    assert!(r
        .tweets
        .find_all(Filter::by(TweetColumn::UserId, alice.id))
        .await
        .unwrap()
        .is_empty());
    assert!(r
        .follows
        .find_all(Filter::by(FollowColumn::UserId, alice.id))
        .await
        .unwrap()
        .is_empty());
    assert!(r
        .follows
        .find_all(Filter::by(FollowColumn::FollowerId, alice.id))
        .await
        .unwrap()
        .is_empty());
    // her own like is gone, and so is bob's like on her deleted tweet
    assert!(r.likes.find_all(Filter::all()).await.unwrap().is_empty());
    assert!(r
        .likes
        .find_all(Filter::by(LikeColumn::TweetId, alice_tweet.id))
        .await
        .unwrap()
        .is_empty());

    // bob and his tweet survive
    assert!(r.users.find_one_or_none_by_id(bob.id).await.unwrap().is_some());
    assert_eq!(
        r.tweets.find_all(Filter::all()).await.unwrap(),
        vec![bob_tweet]
    );
}

#[tokio::test]
async fn liking_twice_is_rejected_and_unlike_deletes() {
    let r = repos();
    let alice = add_user(&r, "Alice").await;
    let tweet = r
        .tweets
        .publish(
            NewTweet {
                user_id: alice.id,
                tweet_data: "hi".to_string(),
            },
            Vec::new(),
        )
        .await
        .unwrap();
    let like = NewLike {
        user_id: alice.id,
        tweet_id: tweet.id,
    };

    let stored = r.likes.add(like.into()).await.unwrap();
    assert!(stored.like);
    let err = r.likes.add(like.into()).await.unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::PrimaryKey));

    let filter = Filter::by(LikeColumn::UserId, alice.id).and(LikeColumn::TweetId, tweet.id);
    assert_eq!(r.likes.delete(filter.clone(), false).await.unwrap(), 1);
    assert_eq!(r.likes.delete(filter, false).await.unwrap(), 0);
}
