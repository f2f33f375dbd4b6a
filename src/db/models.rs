use rusqlite::Row;
use serde::Serialize;

use crate::repository::{Column, Entity, Keyed, Values};

// --- users ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub api_key: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    Id,
    FirstName,
    LastName,
    ApiKey,
    CreatedAt,
    UpdatedAt,
}

impl Column for UserColumn {
    fn name(self) -> &'static str {
        match self {
            UserColumn::Id => "id",
            UserColumn::FirstName => "first_name",
            UserColumn::LastName => "last_name",
            UserColumn::ApiKey => "api_key",
            UserColumn::CreatedAt => "created_at",
            UserColumn::UpdatedAt => "updated_at",
        }
    }
}

impl Entity for User {
    type Column = UserColumn;
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [UserColumn] = &[
        UserColumn::Id,
        UserColumn::FirstName,
        UserColumn::LastName,
        UserColumn::ApiKey,
        UserColumn::CreatedAt,
        UserColumn::UpdatedAt,
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get("id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            api_key: row.get("api_key")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl Keyed for User {
    const ID: UserColumn = UserColumn::Id;
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub api_key: String,
}

impl From<NewUser> for Values<UserColumn> {
    fn from(user: NewUser) -> Self {
        Values::new()
            .set(UserColumn::FirstName, user.first_name)
            .set(UserColumn::LastName, user.last_name)
            .set(UserColumn::ApiKey, user.api_key)
    }
}

// --- follows ---

/// `follower_id` follows `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Follow {
    pub user_id: i64,
    pub follower_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowColumn {
    UserId,
    FollowerId,
    CreatedAt,
    UpdatedAt,
}

impl Column for FollowColumn {
    fn name(self) -> &'static str {
        match self {
            FollowColumn::UserId => "user_id",
            FollowColumn::FollowerId => "follower_id",
            FollowColumn::CreatedAt => "created_at",
            FollowColumn::UpdatedAt => "updated_at",
        }
    }
}

impl Entity for Follow {
    type Column = FollowColumn;
    const TABLE: &'static str = "follows";
    const COLUMNS: &'static [FollowColumn] = &[
        FollowColumn::UserId,
        FollowColumn::FollowerId,
        FollowColumn::CreatedAt,
        FollowColumn::UpdatedAt,
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Follow {
            user_id: row.get("user_id")?,
            follower_id: row.get("follower_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewFollow {
    /// The user being followed.
    pub user_id: i64,
    pub follower_id: i64,
}

impl From<NewFollow> for Values<FollowColumn> {
    fn from(follow: NewFollow) -> Self {
        Values::new()
            .set(FollowColumn::UserId, follow.user_id)
            .set(FollowColumn::FollowerId, follow.follower_id)
    }
}

// --- tweets ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tweet {
    pub id: i64,
    pub user_id: i64,
    pub tweet_data: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetColumn {
    Id,
    UserId,
    TweetData,
    CreatedAt,
    UpdatedAt,
}

impl Column for TweetColumn {
    fn name(self) -> &'static str {
        match self {
            TweetColumn::Id => "id",
            TweetColumn::UserId => "user_id",
            TweetColumn::TweetData => "tweet_data",
            TweetColumn::CreatedAt => "created_at",
            TweetColumn::UpdatedAt => "updated_at",
        }
    }
}

impl Entity for Tweet {
    type Column = TweetColumn;
    const TABLE: &'static str = "tweets";
    const COLUMNS: &'static [TweetColumn] = &[
        TweetColumn::Id,
        TweetColumn::UserId,
        TweetColumn::TweetData,
        TweetColumn::CreatedAt,
        TweetColumn::UpdatedAt,
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Tweet {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            tweet_data: row.get("tweet_data")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl Keyed for Tweet {
    const ID: TweetColumn = TweetColumn::Id;
}

#[derive(Debug, Clone)]
pub struct NewTweet {
    pub user_id: i64,
    pub tweet_data: String,
}

impl From<NewTweet> for Values<TweetColumn> {
    fn from(tweet: NewTweet) -> Self {
        Values::new()
            .set(TweetColumn::UserId, tweet.user_id)
            .set(TweetColumn::TweetData, tweet.tweet_data)
    }
}

// --- likes ---

/// Unliking deletes the row, so `like` is true for every stored row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Like {
    pub user_id: i64,
    pub tweet_id: i64,
    pub like: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeColumn {
    UserId,
    TweetId,
    Like,
    CreatedAt,
    UpdatedAt,
}

impl Column for LikeColumn {
    fn name(self) -> &'static str {
        match self {
            LikeColumn::UserId => "user_id",
            LikeColumn::TweetId => "tweet_id",
            LikeColumn::Like => "like",
            LikeColumn::CreatedAt => "created_at",
            LikeColumn::UpdatedAt => "updated_at",
        }
    }
}

impl Entity for Like {
    type Column = LikeColumn;
    const TABLE: &'static str = "likes";
    const COLUMNS: &'static [LikeColumn] = &[
        LikeColumn::UserId,
        LikeColumn::TweetId,
        LikeColumn::Like,
        LikeColumn::CreatedAt,
        LikeColumn::UpdatedAt,
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Like {
            user_id: row.get("user_id")?,
            tweet_id: row.get("tweet_id")?,
            like: row.get("like")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewLike {
    pub user_id: i64,
    pub tweet_id: i64,
}

impl From<NewLike> for Values<LikeColumn> {
    fn from(like: NewLike) -> Self {
        Values::new()
            .set(LikeColumn::UserId, like.user_id)
            .set(LikeColumn::TweetId, like.tweet_id)
            .set(LikeColumn::Like, true)
    }
}

// --- medias ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Media {
    pub id: i64,
    pub media_data: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaColumn {
    Id,
    MediaData,
    CreatedAt,
    UpdatedAt,
}

impl Column for MediaColumn {
    fn name(self) -> &'static str {
        match self {
            MediaColumn::Id => "id",
            MediaColumn::MediaData => "media_data",
            MediaColumn::CreatedAt => "created_at",
            MediaColumn::UpdatedAt => "updated_at",
        }
    }
}

impl Entity for Media {
    type Column = MediaColumn;
    const TABLE: &'static str = "medias";
    const COLUMNS: &'static [MediaColumn] = &[
        MediaColumn::Id,
        MediaColumn::MediaData,
        MediaColumn::CreatedAt,
        MediaColumn::UpdatedAt,
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Media {
            id: row.get("id")?,
            media_data: row.get("media_data")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl Keyed for Media {
    const ID: MediaColumn = MediaColumn::Id;
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub media_data: String,
}

impl From<NewMedia> for Values<MediaColumn> {
    fn from(media: NewMedia) -> Self {
        Values::new().set(MediaColumn::MediaData, media.media_data)
    }
}

// --- tweetmedias ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TweetMedia {
    pub tweet_id: i64,
    pub media_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetMediaColumn {
    TweetId,
    MediaId,
    CreatedAt,
    UpdatedAt,
}

impl Column for TweetMediaColumn {
    fn name(self) -> &'static str {
        match self {
            TweetMediaColumn::TweetId => "tweet_id",
            TweetMediaColumn::MediaId => "media_id",
            TweetMediaColumn::CreatedAt => "created_at",
            TweetMediaColumn::UpdatedAt => "updated_at",
        }
    }
}

impl Entity for TweetMedia {
    type Column = TweetMediaColumn;
    const TABLE: &'static str = "tweetmedias";
    const COLUMNS: &'static [TweetMediaColumn] = &[
        TweetMediaColumn::TweetId,
        TweetMediaColumn::MediaId,
        TweetMediaColumn::CreatedAt,
        TweetMediaColumn::UpdatedAt,
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TweetMedia {
            tweet_id: row.get("tweet_id")?,
            media_id: row.get("media_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewTweetMedia {
    pub tweet_id: i64,
    pub media_id: i64,
}

impl From<NewTweetMedia> for Values<TweetMediaColumn> {
    fn from(link: NewTweetMedia) -> Self {
        Values::new()
            .set(TweetMediaColumn::TweetId, link.tweet_id)
            .set(TweetMediaColumn::MediaId, link.media_id)
    }
}
