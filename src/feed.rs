//! Feed assembly: loaded tweets shaped for the timeline and ranked by likes.

use serde::{Deserialize, Serialize};

use crate::db::models::{Follow, FollowColumn, User};
use crate::repository::{Filter, FollowRepository, Repository, RepositoryError, TweetRepository};
use crate::repository::tweets::LoadedTweet;

/// Which authors a viewer's feed draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedScope {
    /// Every tweet on the platform.
    #[default]
    All,
    /// Tweets by followed users plus the viewer's own.
    Following,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedAuthor {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedLike {
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedTweet {
    pub id: i64,
    pub content: String,
    pub attachments: Vec<String>,
    pub author: FeedAuthor,
    pub likes: Vec<FeedLike>,
}

impl From<LoadedTweet> for FeedTweet {
    fn from(loaded: LoadedTweet) -> Self {
        Self {
            id: loaded.tweet.id,
            content: loaded.tweet.tweet_data,
            attachments: loaded.media.into_iter().map(|m| m.media_data).collect(),
            author: FeedAuthor {
                id: loaded.author.id,
                name: loaded.author.first_name,
            },
            likes: loaded
                .likes
                .into_iter()
                .map(|l| FeedLike {
                    user_id: l.user_id,
                    name: l.first_name,
                })
                .collect(),
        }
    }
}

/// Rank by like count descending, then tweet id ascending.
pub fn assemble(mut tweets: Vec<LoadedTweet>) -> Vec<FeedTweet> {
    tweets.sort_by(|a, b| {
        b.like_count()
            .cmp(&a.like_count())
            .then(a.tweet.id.cmp(&b.tweet.id))
    });
    tweets.into_iter().map(FeedTweet::from).collect()
}

pub async fn build_feed(
    tweets: &TweetRepository,
    follows: &FollowRepository,
    viewer: &User,
    scope: FeedScope,
) -> Result<Vec<FeedTweet>, RepositoryError> {
    let loaded = match scope {
        FeedScope::All => tweets.find_all_loaded(Filter::all()).await?,
        FeedScope::Following => {
            let followed: Vec<Follow> = follows
                .find_all(Filter::by(FollowColumn::FollowerId, viewer.id))
                .await?;
            let mut authors: Vec<i64> = followed.into_iter().map(|f| f.user_id).collect();
            authors.push(viewer.id);
            tweets.find_loaded_by_authors(authors).await?
        }
    };
    tracing::debug!(viewer = viewer.id, ?scope, count = loaded.len(), "Feed assembled");
    Ok(assemble(loaded))
}
