use std::path::Path as FsPath;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::db::models::{Media, NewMedia};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiPath, CurrentUser};
use crate::repository::Repository;
use crate::state::AppState;

/// Public URL prefix under which stored uploads are served.
pub const UPLOADS_PREFIX: &str = "/uploads";

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/medias",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/uploads/{name}", get(serve))
}

/// `{uuid}_{stem}.{ext}`, keeping only filename-safe characters of the client's name.
fn stored_name(original: &str) -> String {
    let original = FsPath::new(original);
    let clean = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .take(64)
            .collect()
    };
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .map(clean)
        .unwrap_or_default();
    let ext = original
        .extension()
        .and_then(|s| s.to_str())
        .map(clean)
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "bin".to_string());

    let id = uuid::Uuid::now_v7();
    if stem.is_empty() {
        format!("{id}.{ext}")
    } else {
        format!("{id}_{stem}.{ext}")
    }
}

/// Writes the bytes under the uploads directory and records them.
/// The file is removed again if the row cannot be inserted.
async fn store_upload(state: &AppState, name: &str, content: &[u8]) -> AppResult<Media> {
    let dir = state.config.uploads_path();
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, content).await?;

    let added = state
        .medias
        .add(
            NewMedia {
                media_data: format!("{UPLOADS_PREFIX}/{name}"),
            }
            .into(),
        )
        .await;
    match added {
        Ok(media) => Ok(media),
        Err(err) => {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", path.display(), e);
            }
            Err(err.into())
        }
    }
}

async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = stored_name(field.file_name().unwrap_or_default());
        let content = field.bytes().await?;

        let media = store_upload(&state, &name, &content).await?;
        tracing::info!(
            media_id = media.id,
            user_id = user.id,
            bytes = content.len(),
            "Stored upload"
        );
        return Ok((
            StatusCode::CREATED,
            Json(json!({ "result": true, "media_id": media.id })),
        ));
    }

    Err(AppError::BadRequest(
        "multipart field `file` is required".to_string(),
    ))
}

async fn serve(State(state): State<AppState>, ApiPath(name): ApiPath<String>) -> AppResult<Response> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(AppError::NotFound("No such upload".to_string()));
    }

    let path = state.config.uploads_path().join(&name);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("No such upload".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let mime = mime_guess::from_path(&name).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::Config;
    use crate::db::{self, Database};

    #[test]
    fn stored_name_keeps_stem_and_extension() {
        let name = stored_name("holiday photo.JPG");
        assert!(name.ends_with("_holidayphoto.JPG"), "{name}");
    }

    #[test]
    fn stored_name_strips_path_components() {
        let name = stored_name("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
        assert!(name.ends_with("_passwd.bin"), "{name}");
    }

    #[test]
    fn stored_name_without_client_name_is_uuid_only() {
        let name = stored_name("");
        assert!(name.ends_with(".bin"));
        assert!(!name.contains('_'));
    }

    #[test]
    fn stored_names_are_unique() {
        assert_ne!(stored_name("a.png"), stored_name("a.png"));
    }

    #[tokio::test]
    async fn failed_insert_removes_stored_file() {
        let temp = tempfile::TempDir::new().unwrap();
        // No migrations, so the medias insert fails.
        let pool = db::create_pool(&temp.path().join("bare.db"), 1).unwrap();
        let mut config = Config::default();
        config.storage.path = Some(temp.path().join("uploads"));
        let state = AppState::new(Database::new(pool, Duration::from_secs(5)), config);

        let result = store_upload(&state, "orphan.png", b"bytes").await;
        assert!(result.is_err());
        assert!(temp.path().join("uploads").is_dir());
        assert!(!temp.path().join("uploads").join("orphan.png").exists());
    }
}
