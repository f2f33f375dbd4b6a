use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection};

use super::sql::{self, IN_CHUNK};
use super::{Column, Entity, Filter, Repository, RepositoryError, Values};
use crate::db::models::{
    Media, NewTweet, NewTweetMedia, Tweet, TweetColumn, TweetMedia, User, UserColumn,
};
use crate::db::Database;

/// A user who liked a tweet, resolved to a display name.
#[derive(Debug, Clone, PartialEq)]
pub struct Liker {
    pub user_id: i64,
    pub first_name: String,
}

/// A tweet with its author, likes and attached media.
#[derive(Debug, Clone)]
pub struct LoadedTweet {
    pub tweet: Tweet,
    pub author: User,
    pub likes: Vec<Liker>,
    pub media: Vec<Media>,
}

impl LoadedTweet {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

/// Tweets, with eager loading of the relations the feed needs.
#[derive(Clone)]
pub struct TweetRepository {
    db: Database,
}

impl TweetRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// `find_all` with author, likes and media attached in the same unit of work.
    pub async fn find_all_loaded(
        &self,
        filter: Filter<TweetColumn>,
    ) -> Result<Vec<LoadedTweet>, RepositoryError> {
        self.db
            .read(move |tx| {
                let tweets = sql::select::<Tweet>(tx, &filter, None)?;
                load_relations(tx, tweets)
            })
            .await
    }

    /// Loaded tweets written by any of `author_ids`.
    pub async fn find_loaded_by_authors(
        &self,
        author_ids: Vec<i64>,
    ) -> Result<Vec<LoadedTweet>, RepositoryError> {
        self.db
            .read(move |tx| {
                let mut tweets = Vec::new();
                for chunk in author_ids.chunks(IN_CHUNK) {
                    let query = format!(
                        "SELECT {} FROM {} WHERE user_id IN ({})",
                        sql::select_list::<Tweet>(None),
                        Tweet::TABLE,
                        sql::placeholders(chunk.len())
                    );
                    let mut stmt = tx.prepare(&query)?;
                    let rows = stmt
                        .query_map(params_from_iter(chunk), Tweet::from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    tweets.extend(rows);
                }
                load_relations(tx, tweets)
            })
            .await
    }

    /// Insert a tweet and link its media atomically.
    ///
    /// An unknown media id fails the foreign key and nothing is written.
    pub async fn publish(
        &self,
        tweet: NewTweet,
        media_ids: Vec<i64>,
    ) -> Result<Tweet, RepositoryError> {
        self.db
            .write(move |tx| {
                let created = sql::insert::<Tweet>(tx, &Values::from(tweet))?;
                for media_id in media_ids {
                    let link = NewTweetMedia {
                        tweet_id: created.id,
                        media_id,
                    };
                    sql::insert::<TweetMedia>(tx, &Values::from(link))?;
                }
                Ok(created)
            })
            .await
    }
}

#[async_trait]
impl Repository<Tweet> for TweetRepository {
    fn database(&self) -> &Database {
        &self.db
    }
}

fn load_relations(
    conn: &Connection,
    tweets: Vec<Tweet>,
) -> Result<Vec<LoadedTweet>, RepositoryError> {
    if tweets.is_empty() {
        return Ok(Vec::new());
    }

    let tweet_ids: Vec<i64> = tweets.iter().map(|t| t.id).collect();
    let mut author_ids: Vec<i64> = tweets.iter().map(|t| t.user_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors = load_users(conn, &author_ids)?;
    let mut likes = load_likers(conn, &tweet_ids)?;
    let mut media = load_media(conn, &tweet_ids)?;

    tweets
        .into_iter()
        .map(|tweet| -> Result<LoadedTweet, RepositoryError> {
            // Foreign keys guarantee the author row exists.
            let author = authors
                .get(&tweet.user_id)
                .cloned()
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            Ok(LoadedTweet {
                likes: likes.remove(&tweet.id).unwrap_or_default(),
                media: media.remove(&tweet.id).unwrap_or_default(),
                author,
                tweet,
            })
        })
        .collect()
}

fn load_users(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, User>, RepositoryError> {
    let mut users = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(IN_CHUNK) {
        let query = format!(
            "SELECT {} FROM {} WHERE \"{}\" IN ({})",
            sql::select_list::<User>(None),
            User::TABLE,
            UserColumn::Id.name(),
            sql::placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(chunk), User::from_row)?;
        for user in rows {
            let user = user?;
            users.insert(user.id, user);
        }
    }
    Ok(users)
}

fn load_likers(
    conn: &Connection,
    tweet_ids: &[i64],
) -> Result<HashMap<i64, Vec<Liker>>, RepositoryError> {
    let mut likers: HashMap<i64, Vec<Liker>> = HashMap::new();
    for chunk in tweet_ids.chunks(IN_CHUNK) {
        let query = format!(
            "SELECT l.tweet_id, l.user_id, u.first_name
             FROM likes l
             JOIN users u ON u.id = l.user_id
             WHERE l.tweet_id IN ({})
             ORDER BY l.created_at, l.user_id",
            sql::placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(chunk), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Liker {
                    user_id: row.get(1)?,
                    first_name: row.get(2)?,
                },
            ))
        })?;
        for row in rows {
            let (tweet_id, liker) = row?;
            likers.entry(tweet_id).or_default().push(liker);
        }
    }
    Ok(likers)
}

fn load_media(
    conn: &Connection,
    tweet_ids: &[i64],
) -> Result<HashMap<i64, Vec<Media>>, RepositoryError> {
    let mut media: HashMap<i64, Vec<Media>> = HashMap::new();
    for chunk in tweet_ids.chunks(IN_CHUNK) {
        let query = format!(
            "SELECT tm.tweet_id AS owner_tweet_id, {}
             FROM tweetmedias tm
             JOIN medias m ON m.id = tm.media_id
             WHERE tm.tweet_id IN ({})
             ORDER BY m.id",
            sql::select_list::<Media>(Some("m")),
            sql::placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(chunk), |row| {
            Ok((row.get::<_, i64>("owner_tweet_id")?, Media::from_row(row)?))
        })?;
        for row in rows {
            let (tweet_id, item) = row?;
            media.entry(tweet_id).or_default().push(item);
        }
    }
    Ok(media)
}
