use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::models::{LikeColumn, NewLike, NewTweet, TweetColumn};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, ApiPath, CurrentUser};
use crate::feed::{self, FeedTweet};
use crate::repository::{Filter, Repository};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tweets", get(list_feed).post(create_tweet))
        .route("/api/tweets/{id}", delete(delete_tweet))
        .route("/api/tweets/{id}/likes", post(like).delete(unlike))
}

#[derive(Debug, Deserialize)]
struct CreateTweet {
    tweet_data: String,
    #[serde(default)]
    tweet_media_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
struct FeedResponse {
    result: bool,
    tweets: Vec<FeedTweet>,
}

async fn create_tweet(
    State(state): State<AppState>,
    CurrentUser(author): CurrentUser,
    ApiJson(req): ApiJson<CreateTweet>,
) -> AppResult<Json<serde_json::Value>> {
    if req.tweet_data.trim().is_empty() {
        return Err(AppError::BadRequest("tweet_data must not be empty".to_string()));
    }

    let mut media_ids = req.tweet_media_ids.unwrap_or_default();
    media_ids.sort_unstable();
    media_ids.dedup();

    let tweet = state
        .tweets
        .publish(
            NewTweet {
                user_id: author.id,
                tweet_data: req.tweet_data,
            },
            media_ids,
        )
        .await?;
    tracing::info!(tweet_id = tweet.id, user_id = author.id, "Published tweet");
    Ok(Json(json!({ "result": true, "tweet_id": tweet.id })))
}

/// Only the author can delete a tweet; anything else reports `result: false`.
async fn delete_tweet(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state
        .tweets
        .delete(
            Filter::by(TweetColumn::Id, id).and(TweetColumn::UserId, viewer.id),
            false,
        )
        .await?;
    if removed > 0 {
        tracing::info!(tweet_id = id, user_id = viewer.id, "Deleted tweet");
    }
    Ok(Json(json!({ "result": removed > 0 })))
}

async fn like(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    state
        .likes
        .add(
            NewLike {
                user_id: viewer.id,
                tweet_id: id,
            }
            .into(),
        )
        .await?;
    Ok((StatusCode::OK, Json(json!({ "result": true }))))
}

async fn unlike(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state
        .likes
        .delete(
            Filter::by(LikeColumn::UserId, viewer.id).and(LikeColumn::TweetId, id),
            false,
        )
        .await?;
    Ok(Json(json!({ "result": removed > 0 })))
}

async fn list_feed(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
) -> AppResult<Json<FeedResponse>> {
    let tweets = feed::build_feed(
        &state.tweets,
        &state.follows,
        &viewer,
        state.config.feed.scope,
    )
    .await?;
    Ok(Json(FeedResponse {
        result: true,
        tweets,
    }))
}
