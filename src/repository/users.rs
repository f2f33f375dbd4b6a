use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::Serialize;

use super::{sql, Filter, Repository, RepositoryError};
use crate::db::models::{User, UserColumn};
use crate::db::Database;

/// Id and name of a user, as shown in follower lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
}

/// How to select the user whose profile is wanted.
#[derive(Debug, Clone)]
pub enum ProfileLookup {
    ApiKey(String),
    Id(i64),
}

#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Users following `user_id`.
    pub async fn followers_of(&self, user_id: i64) -> Result<Vec<UserSummary>, RepositoryError> {
        self.db.read(move |tx| query_followers(tx, user_id)).await
    }

    /// Users `user_id` follows.
    pub async fn following_of(&self, user_id: i64) -> Result<Vec<UserSummary>, RepositoryError> {
        self.db.read(move |tx| query_following(tx, user_id)).await
    }

    /// The user plus both follow edge sets, read in one unit of work.
    pub async fn profile(
        &self,
        lookup: ProfileLookup,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        self.db
            .read(move |tx| {
                let filter = match lookup {
                    ProfileLookup::ApiKey(key) => Filter::by(UserColumn::ApiKey, key),
                    ProfileLookup::Id(id) => Filter::by(UserColumn::Id, id),
                };
                let Some(user) = sql::select::<User>(tx, &filter, Some(1))?.pop() else {
                    return Ok(None);
                };
                Ok(Some(UserProfile {
                    followers: query_followers(tx, user.id)?,
                    following: query_following(tx, user.id)?,
                    id: user.id,
                    first_name: user.first_name,
                    last_name: user.last_name,
                }))
            })
            .await
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    fn database(&self) -> &Database {
        &self.db
    }
}

fn query_followers(conn: &Connection, user_id: i64) -> Result<Vec<UserSummary>, RepositoryError> {
    query_summaries(
        conn,
        "SELECT u.id, u.first_name, u.last_name
         FROM follows f
         JOIN users u ON u.id = f.follower_id
         WHERE f.user_id = ?1
         ORDER BY u.id",
        user_id,
    )
}

fn query_following(conn: &Connection, user_id: i64) -> Result<Vec<UserSummary>, RepositoryError> {
    query_summaries(
        conn,
        "SELECT u.id, u.first_name, u.last_name
         FROM follows f
         JOIN users u ON u.id = f.user_id
         WHERE f.follower_id = ?1
         ORDER BY u.id",
        user_id,
    )
}

fn query_summaries(
    conn: &Connection,
    query: &str,
    user_id: i64,
) -> Result<Vec<UserSummary>, RepositoryError> {
    let mut stmt = conn.prepare(query)?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
