pub mod medias;
pub mod tweets;
pub mod users;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

const NAME_MAX_CHARS: usize = 50;

/// Build the full HTTP application over `state`.
pub fn app(state: AppState) -> Router {
    let max_upload = state.config.storage.max_upload_bytes;
    Router::new()
        .merge(users::router())
        .merge(tweets::router())
        .merge(medias::router(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// First and last names are 1 to 50 characters.
pub(crate) fn validate_name(name: &str) -> Result<(), AppError> {
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX_CHARS {
        return Err(AppError::BadRequest(format!(
            "name must be 1 to {NAME_MAX_CHARS} characters, got {len}"
        )));
    }
    Ok(())
}
