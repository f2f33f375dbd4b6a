// Repository pattern - isolates all database side effects
//
// `Repository<E>` carries the five generic operations as provided methods, so
// the plain `SqliteRepository<E>` and the entity-specific repositories share
// one implementation of transaction scoping and error mapping.

pub mod sql;
pub mod tweets;
pub mod users;

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{ErrorCode, Row};
use thiserror::Error;

use crate::db::models::{Follow, Like, Media, TweetMedia};
use crate::db::Database;

pub use tweets::TweetRepository;
pub use users::UserRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    PrimaryKey,
    ForeignKey,
    NotNull,
    Check,
    Other,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::PrimaryKey => "primary key",
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::NotNull => "not null",
            ConstraintKind::Check => "check",
            ConstraintKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Invalid repository call: {0}")]
    Usage(String),

    #[error("Constraint violation ({kind}): {source}")]
    Constraint {
        kind: ConstraintKind,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Expected at most one row in {table}, found several")]
    MultipleRows { table: &'static str },

    #[error("SQL error: {0}")]
    Sql(rusqlite::Error),

    #[error("Database error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database worker failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RepositoryError {
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            RepositoryError::Constraint { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        let kind = match &err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
                match e.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
                    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintKind::PrimaryKey,
                    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
                    rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
                    rusqlite::ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
                    _ => ConstraintKind::Other,
                }
            }
            _ => return RepositoryError::Sql(err),
        };
        RepositoryError::Constraint { kind, source: err }
    }
}

/// A column of one entity's table.
pub trait Column: fmt::Debug + Copy + PartialEq + Send + Sync + 'static {
    fn name(self) -> &'static str;
}

/// Schema description of a table the generic repository can operate on.
pub trait Entity: Sized + Send + 'static {
    type Column: Column;

    const TABLE: &'static str;

    /// Every column, in the order rows are selected.
    const COLUMNS: &'static [Self::Column];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Entities with an integer surrogate key.
pub trait Keyed: Entity {
    const ID: Self::Column;
}

/// Exact-equality conjunction over an entity's columns.
#[derive(Debug, Clone)]
pub struct Filter<C> {
    clauses: Vec<(C, Value)>,
}

impl<C: Column> Filter<C> {
    /// Matches every row.
    pub fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    pub fn by(column: C, value: impl Into<Value>) -> Self {
        Self::all().and(column, value)
    }

    pub fn and(mut self, column: C, value: impl Into<Value>) -> Self {
        self.clauses.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(C, Value)] {
        &self.clauses
    }
}

impl<C: Column> Default for Filter<C> {
    fn default() -> Self {
        Self::all()
    }
}

/// Column assignments for `add` and `update`.
#[derive(Debug, Clone)]
pub struct Values<C> {
    assignments: Vec<(C, Value)>,
}

impl<C: Column> Values<C> {
    pub fn new() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }

    /// Later assignments to the same column replace earlier ones.
    pub fn set(mut self, column: C, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.assignments.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.assignments.push((column, value)),
        }
        self
    }

    pub fn set_opt<V: Into<Value>>(self, column: C, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn contains(&self, column: C) -> bool {
        self.assignments.iter().any(|(c, _)| *c == column)
    }

    pub fn assignments(&self) -> &[(C, Value)] {
        &self.assignments
    }
}

impl<C: Column> Default for Values<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic CRUD over one entity type.
///
/// Each call runs in its own unit of work from [`Database`]. Absence is
/// reported as `None` or an empty `Vec`, never as an error.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    fn database(&self) -> &Database;

    async fn find_all(&self, filter: Filter<E::Column>) -> Result<Vec<E>, RepositoryError> {
        self.database()
            .read(move |tx| sql::select::<E>(tx, &filter, None))
            .await
    }

    async fn find_one_or_none_by_id(&self, id: i64) -> Result<Option<E>, RepositoryError>
    where
        E: Keyed,
    {
        self.find_one_or_none(Filter::by(E::ID, id)).await
    }

    /// Fails with [`RepositoryError::MultipleRows`] if the filter is not unique.
    async fn find_one_or_none(
        &self,
        filter: Filter<E::Column>,
    ) -> Result<Option<E>, RepositoryError> {
        self.database()
            .read(move |tx| {
                let mut rows = sql::select::<E>(tx, &filter, Some(2))?;
                if rows.len() > 1 {
                    return Err(RepositoryError::MultipleRows { table: E::TABLE });
                }
                Ok(rows.pop())
            })
            .await
    }

    async fn add(&self, values: Values<E::Column>) -> Result<E, RepositoryError> {
        self.database()
            .write(move |tx| sql::insert::<E>(tx, &values))
            .await
    }

    /// Returns every row as it stands after the update.
    async fn update(
        &self,
        filter: Filter<E::Column>,
        values: Values<E::Column>,
    ) -> Result<Vec<E>, RepositoryError> {
        if values.is_empty() {
            return Err(RepositoryError::Usage(format!(
                "update on {} needs at least one value",
                E::TABLE
            )));
        }
        self.database()
            .write(move |tx| sql::update::<E>(tx, &filter, &values))
            .await
    }

    /// An empty filter is only accepted together with `delete_all`.
    async fn delete(
        &self,
        filter: Filter<E::Column>,
        delete_all: bool,
    ) -> Result<usize, RepositoryError> {
        if filter.is_empty() && !delete_all {
            return Err(RepositoryError::Usage(format!(
                "delete on {} needs a filter or delete_all",
                E::TABLE
            )));
        }
        self.database()
            .write(move |tx| sql::delete::<E>(tx, &filter))
            .await
    }
}

/// The plain generic repository, for entities with no specialization.
pub struct SqliteRepository<E> {
    db: Database,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SqliteRepository<E> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for SqliteRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.db.clone())
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for SqliteRepository<E> {
    fn database(&self) -> &Database {
        &self.db
    }
}

pub type FollowRepository = SqliteRepository<Follow>;
pub type LikeRepository = SqliteRepository<Like>;
pub type MediaRepository = SqliteRepository<Media>;
pub type TweetMediaRepository = SqliteRepository<TweetMedia>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::{NewUser, User, UserColumn};
    use tempfile::TempDir;

    fn create_test_repo() -> (SqliteRepository<User>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = db::create_pool(&temp_dir.path().join("test.db"), 4).unwrap();
        db::run_migrations(&pool).unwrap();
        let db = Database::new(pool, Duration::from_secs(5));
        (SqliteRepository::new(db), temp_dir)
    }

    fn new_user(n: usize) -> Values<UserColumn> {
        NewUser {
            first_name: format!("first_{n}"),
            last_name: format!("last_{n}"),
            api_key: format!("api_key_{n}"),
        }
        .into()
    }

    #[tokio::test]
    async fn find_all_without_filter_returns_every_row() {
        let (repo, _temp) = create_test_repo();
        for n in 1..=10 {
            repo.add(new_user(n)).await.unwrap();
        }

        let users = repo.find_all(Filter::all()).await.unwrap();
        assert_eq!(users.len(), 10);
    }

    #[tokio::test]
    async fn find_all_filters_by_equality() {
        let (repo, _temp) = create_test_repo();
        repo.add(new_user(1)).await.unwrap();
        repo.add(new_user(2)).await.unwrap();

        let users = repo
            .find_all(Filter::by(UserColumn::LastName, "last_2".to_string()))
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].first_name, "first_2");

        let none = repo
            .find_all(
                Filter::by(UserColumn::LastName, "last_2".to_string())
                    .and(UserColumn::FirstName, "first_1".to_string()),
            )
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn add_then_find_by_id_round_trips() {
        let (repo, _temp) = create_test_repo();
        let added = repo.add(new_user(7)).await.unwrap();
        assert!(added.id > 0);
        assert!(!added.created_at.is_empty());

        let found = repo.find_one_or_none_by_id(added.id).await.unwrap().unwrap();
        assert_eq!(found.first_name, "first_7");
        assert_eq!(found.last_name, "last_7");
        assert_eq!(found.api_key, "api_key_7");
        assert_eq!(found, added);
    }

    #[tokio::test]
    async fn find_one_or_none_by_missing_id_is_none() {
        let (repo, _temp) = create_test_repo();
        assert!(repo.find_one_or_none_by_id(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_one_or_none_rejects_ambiguous_filter() {
        let (repo, _temp) = create_test_repo();
        repo.add(
            Values::new()
                .set(UserColumn::FirstName, "Same".to_string())
                .set(UserColumn::LastName, "A".to_string())
                .set(UserColumn::ApiKey, "k1".to_string()),
        )
        .await
        .unwrap();
        repo.add(
            Values::new()
                .set(UserColumn::FirstName, "Same".to_string())
                .set(UserColumn::LastName, "B".to_string())
                .set(UserColumn::ApiKey, "k2".to_string()),
        )
        .await
        .unwrap();

        let result = repo
            .find_one_or_none(Filter::by(UserColumn::FirstName, "Same".to_string()))
            .await;
        assert!(matches!(
            result,
            Err(RepositoryError::MultipleRows { table: "users" })
        ));
    }

    #[tokio::test]
    async fn duplicate_unique_value_is_a_constraint_error() {
        let (repo, _temp) = create_test_repo();
        repo.add(new_user(1)).await.unwrap();

        let err = repo.add(new_user(1)).await.unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));

        let rows = repo
            .find_all(Filter::by(UserColumn::ApiKey, "api_key_1".to_string()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn missing_required_column_is_a_not_null_error() {
        let (repo, _temp) = create_test_repo();
        let err = repo
            .add(Values::new().set(UserColumn::FirstName, "Only".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::NotNull));
    }

    #[tokio::test]
    async fn update_returns_post_update_rows() {
        let (repo, _temp) = create_test_repo();
        let added = repo.add(new_user(1)).await.unwrap();

        let updated = repo
            .update(
                Filter::by(UserColumn::ApiKey, "api_key_1".to_string()),
                Values::new().set(UserColumn::FirstName, "renamed".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id, added.id);
        assert_eq!(updated[0].first_name, "renamed");
        assert_eq!(updated[0].last_name, "last_1");
    }

    #[tokio::test]
    async fn update_matching_nothing_returns_empty() {
        let (repo, _temp) = create_test_repo();
        repo.add(new_user(1)).await.unwrap();

        let updated = repo
            .update(
                Filter::by(UserColumn::ApiKey, "api_key_1000".to_string()),
                Values::new().set(UserColumn::FirstName, "x".to_string()),
            )
            .await
            .unwrap();
        assert!(updated.is_empty());
    }

    #[tokio::test]
    async fn update_conflicting_unique_value_rolls_back() {
        let (repo, _temp) = create_test_repo();
        repo.add(new_user(1)).await.unwrap();
        repo.add(new_user(2)).await.unwrap();

        let err = repo
            .update(
                Filter::by(UserColumn::ApiKey, "api_key_2".to_string()),
                Values::new()
                    .set(UserColumn::FirstName, "changed".to_string())
                    .set(UserColumn::ApiKey, "api_key_1".to_string()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));

        let untouched = repo
            .find_one_or_none(Filter::by(UserColumn::ApiKey, "api_key_2".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.first_name, "first_2");
    }

    #[tokio::test]
    async fn update_without_values_is_a_usage_error() {
        let (repo, _temp) = create_test_repo();
        let result = repo.update(Filter::all(), Values::new()).await;
        assert!(matches!(result, Err(RepositoryError::Usage(_))));
    }

    #[tokio::test]
    async fn delete_without_filter_is_refused() {
        let (repo, _temp) = create_test_repo();
        repo.add(new_user(1)).await.unwrap();

        let result = repo.delete(Filter::all(), false).await;
        assert!(matches!(result, Err(RepositoryError::Usage(_))));
        assert_eq!(repo.find_all(Filter::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_all_clears_the_table() {
        let (repo, _temp) = create_test_repo();
        for n in 1..=3 {
            repo.add(new_user(n)).await.unwrap();
        }

        let deleted = repo.delete(Filter::all(), true).await.unwrap();
        assert_eq!(deleted, 3);
        assert!(repo.find_all(Filter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_counts_removed_rows() {
        let (repo, _temp) = create_test_repo();
        repo.add(new_user(1)).await.unwrap();

        let filter = Filter::by(UserColumn::FirstName, "first_1".to_string());
        assert_eq!(repo.delete(filter.clone(), false).await.unwrap(), 1);
        assert_eq!(repo.delete(filter, false).await.unwrap(), 0);
    }

    #[test]
    fn values_set_replaces_existing_assignment() {
        let values = Values::new()
            .set(UserColumn::FirstName, "a".to_string())
            .set(UserColumn::FirstName, "b".to_string());
        assert_eq!(values.assignments().len(), 1);
        assert_eq!(values.assignments()[0].1, Value::Text("b".into()));
    }

    #[test]
    fn values_set_opt_skips_none() {
        let values = Values::new()
            .set_opt(UserColumn::FirstName, None::<String>)
            .set_opt(UserColumn::LastName, Some("x".to_string()));
        assert!(!values.contains(UserColumn::FirstName));
        assert!(values.contains(UserColumn::LastName));
    }
}
