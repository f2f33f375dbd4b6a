//! Demo data for local runs (`--seed-demo N`).
//!
//! Creates a well-known `test` user (api key `test`) plus N random users,
//! then random follows, tweets and likes between them. Random picks that
//! collide with an existing row are skipped.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::db::models::{NewFollow, NewLike, NewTweet, NewUser, User, UserColumn};
use crate::repository::{Filter, Repository, RepositoryError};
use crate::state::AppState;

pub const TEST_API_KEY: &str = "test";

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Donald", "Edsger", "Frances", "Grace", "John", "Ken",
    "Leslie", "Margaret", "Niklaus", "Radia", "Tony",
];
const LAST_NAMES: &[&str] = &[
    "Allen", "Backus", "Dijkstra", "Hamilton", "Hoare", "Hopper", "Knuth", "Lamport", "Liskov",
    "Lovelace", "Perlman", "Ritchie", "Shannon", "Thompson", "Wirth",
];
const WORDS: &[&str] = &[
    "deploy", "friday", "coffee", "meeting", "release", "roadmap", "standup", "lunch", "review",
    "quarter", "launch", "sprint", "demo", "office", "weekend", "ship", "metrics", "team",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub follows: usize,
    pub tweets: usize,
    pub likes: usize,
}

/// Random 32-character hex key.
pub fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn random_sentence(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(3..=8);
    let words: Vec<&str> = (0..len)
        .filter_map(|_| WORDS.choose(&mut *rng).copied())
        .collect();
    let mut sentence = words.join(" ");
    if let Some(first) = sentence.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    sentence.push('.');
    sentence
}

/// Insert, treating a constraint violation as "already there".
fn ignore_conflict<T>(result: Result<T, RepositoryError>) -> Result<Option<T>, RepositoryError> {
    match result {
        Ok(row) => Ok(Some(row)),
        Err(e) if e.constraint_kind().is_some() => {
            tracing::debug!("Seed row skipped: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn ensure_test_user(state: &AppState) -> Result<User, RepositoryError> {
    let existing = state
        .users
        .find_one_or_none(Filter::by(UserColumn::ApiKey, TEST_API_KEY.to_string()))
        .await?;
    match existing {
        Some(user) => Ok(user),
        None => {
            state
                .users
                .add(
                    NewUser {
                        first_name: "Test".to_string(),
                        last_name: "User".to_string(),
                        api_key: TEST_API_KEY.to_string(),
                    }
                    .into(),
                )
                .await
        }
    }
}

pub async fn seed_demo(state: &AppState, count: usize) -> Result<SeedReport, RepositoryError> {
    let mut report = SeedReport::default();
    let mut users = vec![ensure_test_user(state).await?];

    for _ in 0..count {
        let new_user = {
            let mut rng = rand::thread_rng();
            NewUser {
                first_name: FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Demo").to_string(),
                last_name: LAST_NAMES.choose(&mut rng).copied().unwrap_or("User").to_string(),
                api_key: generate_api_key(),
            }
        };
        if let Some(user) = ignore_conflict(state.users.add(new_user.into()).await)? {
            users.push(user);
            report.users += 1;
        }
    }
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();

    let follows: Vec<NewFollow> = {
        let mut rng = rand::thread_rng();
        ids.iter()
            .flat_map(|&follower| {
                let picks: Vec<i64> = ids
                    .choose_multiple(&mut rng, 3)
                    .copied()
                    .filter(|&id| id != follower)
                    .collect();
                picks.into_iter().map(move |user_id| NewFollow {
                    user_id,
                    follower_id: follower,
                })
            })
            .collect()
    };
    for follow in follows {
        if ignore_conflict(state.follows.add(follow.into()).await)?.is_some() {
            report.follows += 1;
        }
    }

    let drafts: Vec<NewTweet> = {
        let mut rng = rand::thread_rng();
        ids.iter()
            .flat_map(|&user_id| {
                let n = rng.gen_range(1..=2);
                (0..n)
                    .map(|_| NewTweet {
                        user_id,
                        tweet_data: random_sentence(&mut rng),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    };
    let mut tweet_ids = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let tweet = state.tweets.publish(draft, Vec::new()).await?;
        tweet_ids.push(tweet.id);
        report.tweets += 1;
    }

    let likes: Vec<NewLike> = {
        let mut rng = rand::thread_rng();
        ids.iter()
            .flat_map(|&user_id| {
                tweet_ids
                    .choose_multiple(&mut rng, 2)
                    .map(|&tweet_id| NewLike { user_id, tweet_id })
                    .collect::<Vec<_>>()
            })
            .collect()
    };
    for like in likes {
        if ignore_conflict(state.likes.add(like.into()).await)?.is_some() {
            report.likes += 1;
        }
    }

    tracing::info!(
        users = report.users,
        follows = report.follows,
        tweets = report.tweets,
        likes = report.likes,
        "Seeded demo data"
    );
    Ok(report)
}
