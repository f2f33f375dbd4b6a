use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::models::{FollowColumn, NewFollow, NewUser, User, UserColumn};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiPath, ApiQuery, CurrentUser};
use crate::repository::users::{ProfileLookup, UserProfile};
use crate::repository::{Filter, Repository, Values};
use crate::routes::validate_name;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/all_users", get(all_users))
        .route(
            "/api/users",
            get(current_user)
                .post(create_user)
                .put(update_user)
                .delete(delete_user),
        )
        .route("/api/users/me", get(me))
        .route("/api/users/{id}", get(user_by_id))
        .route("/api/users/{id}/follow", post(follow).delete(unfollow))
}

/// Public user record, as returned by the user endpoints.
#[derive(Debug, Serialize)]
struct UserView {
    id: i64,
    first_name: String,
    last_name: String,
    api_key: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            api_key: user.api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateUser {
    first_name: String,
    last_name: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct UpdateUser {
    first_name: Option<String>,
    last_name: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    result: bool,
    user: UserProfile,
}

async fn all_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserView>>> {
    let users = state.users.find_all(Filter::all()).await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    ApiQuery(req): ApiQuery<CreateUser>,
) -> AppResult<impl IntoResponse> {
    validate_name(&req.first_name)?;
    validate_name(&req.last_name)?;
    if req.api_key.is_empty() {
        return Err(AppError::BadRequest("api_key must not be empty".to_string()));
    }

    let user = state
        .users
        .add(
            NewUser {
                first_name: req.first_name,
                last_name: req.last_name,
                api_key: req.api_key,
            }
            .into(),
        )
        .await?;
    tracing::info!(user_id = user.id, first_name = %user.first_name, "Created user");
    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

async fn current_user(CurrentUser(user): CurrentUser) -> Json<UserView> {
    Json(UserView::from(user))
}

async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(req): ApiQuery<UpdateUser>,
) -> AppResult<Json<Vec<UserView>>> {
    for name in [&req.first_name, &req.last_name].into_iter().flatten() {
        validate_name(name)?;
    }
    if req.api_key.as_deref() == Some("") {
        return Err(AppError::BadRequest("api_key must not be empty".to_string()));
    }

    let values = Values::new()
        .set_opt(UserColumn::FirstName, req.first_name)
        .set_opt(UserColumn::LastName, req.last_name)
        .set_opt(UserColumn::ApiKey, req.api_key);
    let updated = state
        .users
        .update(Filter::by(UserColumn::Id, user.id), values)
        .await?;
    if updated.is_empty() {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = user.id, "Updated user");
    Ok(Json(updated.into_iter().map(UserView::from).collect()))
}

async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = state
        .users
        .delete(Filter::by(UserColumn::Id, user.id), false)
        .await?;
    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = user.id, "Deleted user");
    Ok(Json(json!({ "deleted_rows": deleted })))
}

async fn follow(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    state
        .follows
        .add(
            NewFollow {
                user_id: id,
                follower_id: viewer.id,
            }
            .into(),
        )
        .await?;
    tracing::info!(follower = viewer.id, followed = id, "Followed user");
    Ok((StatusCode::CREATED, Json(json!({ "result": true }))))
}

async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state
        .follows
        .delete(
            Filter::by(FollowColumn::UserId, id).and(FollowColumn::FollowerId, viewer.id),
            false,
        )
        .await?;
    if removed == 0 {
        tracing::warn!(follower = viewer.id, followed = id, "Unfollow matched nothing");
    }
    Ok(Json(json!({ "result": removed > 0 })))
}

async fn me(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
) -> AppResult<Json<ProfileResponse>> {
    profile(&state, ProfileLookup::Id(viewer.id)).await
}

async fn user_by_id(
    State(state): State<AppState>,
    _viewer: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ProfileResponse>> {
    profile(&state, ProfileLookup::Id(id)).await
}

async fn profile(state: &AppState, lookup: ProfileLookup) -> AppResult<Json<ProfileResponse>> {
    let user = state
        .users
        .profile(lookup)
        .await?
        .ok_or_else(|| AppError::NotFound("No such user".to_string()))?;
    Ok(Json(ProfileResponse { result: true, user }))
}
