// API-key authentication gate
//
// The credential is an opaque bearer token matched by exact equality against
// `users.api_key`. Routes get the caller through the `CurrentUser` extractor.

use thiserror::Error;

use crate::db::models::{User, UserColumn};
use crate::repository::{Filter, Repository, RepositoryError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("API key is missing")]
    MissingCredential,

    #[error("API key is not valid")]
    InvalidCredential,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Resolve a raw credential to its user. An empty string counts as missing.
pub async fn authenticate<R: Repository<User>>(
    users: &R,
    credential: Option<&str>,
) -> Result<User, AuthError> {
    let key = match credential {
        Some(key) if !key.is_empty() => key,
        _ => return Err(AuthError::MissingCredential),
    };

    users
        .find_one_or_none(Filter::by(UserColumn::ApiKey, key.to_string()))
        .await?
        .ok_or(AuthError::InvalidCredential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::NewUser;
    use crate::db::Database;
    use crate::repository::SqliteRepository;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn repo_with_user() -> (SqliteRepository<User>, User, TempDir) {
        let temp = TempDir::new().unwrap();
        let pool = db::create_pool(&temp.path().join("test.db"), 2).unwrap();
        db::run_migrations(&pool).unwrap();
        let repo = SqliteRepository::new(Database::new(pool, Duration::from_secs(5)));
        let user = repo
            .add(
                NewUser {
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                    api_key: "secret".to_string(),
                }
                .into(),
            )
            .await
            .unwrap();
        (repo, user, temp)
    }

    #[tokio::test]
    async fn valid_key_returns_user() {
        let (repo, user, _temp) = repo_with_user().await;
        let found = authenticate(&repo, Some("secret")).await.unwrap();
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn missing_or_empty_key_is_missing_credential() {
        let (repo, _user, _temp) = repo_with_user().await;
        assert!(matches!(
            authenticate(&repo, None).await,
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            authenticate(&repo, Some("")).await,
            Err(AuthError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn unknown_key_is_invalid_credential() {
        let (repo, _user, _temp) = repo_with_user().await;
        assert!(matches!(
            authenticate(&repo, Some("Secret")).await,
            Err(AuthError::InvalidCredential)
        ));
    }
}
