use crate::config::Config;
use crate::db::Database;
use crate::repository::{
    FollowRepository, LikeRepository, MediaRepository, SqliteRepository, TweetRepository,
    UserRepository,
};

/// Shared handler context. Every repository holds a clone of the same
/// [`Database`], so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub users: UserRepository,
    pub follows: FollowRepository,
    pub tweets: TweetRepository,
    pub likes: LikeRepository,
    pub medias: MediaRepository,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            follows: SqliteRepository::new(db.clone()),
            tweets: TweetRepository::new(db.clone()),
            likes: SqliteRepository::new(db.clone()),
            medias: SqliteRepository::new(db.clone()),
            db,
            config,
        }
    }
}
