use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{ApiQuery, AuthUser};
use crate::models::{AstronomyShow, ShowTheme};
use crate::permissions::{self, Action, Resource};
use crate::services::media;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/astronomy-shows", get(list_shows).post(create_show))
        .route("/astronomy-shows/{id}", get(retrieve_show).delete(delete_show))
        .route("/astronomy-shows/{id}/upload-image", post(upload_image))
}

/* ---------- helpers ---------- */

async fn fetch_show(pool: &sqlx::PgPool, show_id: i64) -> Result<AstronomyShow, ApiError> {
    sqlx::query_as::<_, AstronomyShow>(
        "SELECT id, title, description, image FROM astronomy_shows WHERE id = $1",
    )
    .bind(show_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("astronomy show"))
}

async fn fetch_show_themes(
    pool: &sqlx::PgPool,
    show_id: i64,
) -> Result<Vec<ShowTheme>, ApiError> {
    let themes = sqlx::query_as::<_, ShowTheme>(
        r#"
        SELECT t.id, t.name
        FROM show_themes t
        JOIN astronomy_show_themes st ON st.theme_id = t.id
        WHERE st.show_id = $1
        ORDER BY t.id
        "#,
    )
    .bind(show_id)
    .fetch_all(pool)
    .await?;
    Ok(themes)
}

/* ---------- LIST ---------- */

// GET /api/astronomy-shows?title=...&theme=...
#[derive(Debug, Deserialize)]
struct ShowsQuery {
    /// Case-insensitive substring match on the show title.
    title: Option<String>,
    /// Case-insensitive substring match on any linked theme name.
    theme: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShowListItem {
    id: i64,
    title: String,
    description: String,
    theme: Vec<String>,
    image: Option<String>,
}

async fn list_shows(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ShowsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let shows = sqlx::query_as::<_, AstronomyShow>(
        r#"
        SELECT s.id, s.title, s.description, s.image
        FROM astronomy_shows s
        WHERE ($1::TEXT IS NULL OR s.title ILIKE '%' || $1 || '%')
          AND ($2::TEXT IS NULL OR EXISTS(
              SELECT 1
              FROM astronomy_show_themes st
              JOIN show_themes t ON t.id = st.theme_id
              WHERE st.show_id = s.id AND t.name ILIKE '%' || $2 || '%'
          ))
        ORDER BY s.id
        "#,
    )
    .bind(params.title.as_deref())
    .bind(params.theme.as_deref())
    .fetch_all(&state.db.pool)
    .await?;

    // one pass for all theme names instead of a query per show
    let ids: Vec<i64> = shows.iter().map(|s| s.id).collect();
    let theme_rows = sqlx::query_as::<_, (i64, String)>(
        r#"
        SELECT st.show_id, t.name
        FROM astronomy_show_themes st
        JOIN show_themes t ON t.id = st.theme_id
        WHERE st.show_id = ANY($1)
        ORDER BY t.id
        "#,
    )
    .bind(&ids)
    .fetch_all(&state.db.pool)
    .await?;

    let mut names: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (show_id, name) in theme_rows {
        names.entry(show_id).or_default().push(name);
    }

    let payload: Vec<ShowListItem> = shows
        .into_iter()
        .map(|s| ShowListItem {
            theme: names.remove(&s.id).unwrap_or_default(),
            id: s.id,
            title: s.title,
            description: s.description,
            image: s.image,
        })
        .collect();

    Ok((StatusCode::OK, Json(payload)))
}

/* ---------- CREATE ---------- */

// POST /api/astronomy-shows
#[derive(Debug, Deserialize, Validate)]
struct CreateShowRequest {
    #[validate(length(min = 1, max = 100, message = "title must be 1..100 characters"))]
    title: String,
    #[validate(length(min = 1, message = "description must not be empty"))]
    description: String,
    #[serde(default)]
    theme_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct ShowDetail {
    id: i64,
    title: String,
    description: String,
    theme: Vec<ShowTheme>,
    image: Option<String>,
}

async fn create_show(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateShowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Write, Resource::Catalog)?;
    req.validate()?;

    let mut tx = state.db.pool.begin().await?;

    let show = sqlx::query_as::<_, AstronomyShow>(
        "INSERT INTO astronomy_shows (title, description)
         VALUES ($1, $2)
         RETURNING id, title, description, image",
    )
    .bind(&req.title)
    .bind(&req.description)
    .fetch_one(&mut *tx)
    .await?;

    for theme_id in &req.theme_ids {
        sqlx::query(
            "INSERT INTO astronomy_show_themes (show_id, theme_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(show.id)
        .bind(theme_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ApiError::Validation(format!("unknown theme id {theme_id}"))
            }
            other => ApiError::Database(other),
        })?;
    }

    tx.commit().await?;

    let theme = fetch_show_themes(&state.db.pool, show.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ShowDetail {
            id: show.id,
            title: show.title,
            description: show.description,
            theme,
            image: show.image,
        }),
    ))
}

/* ---------- RETRIEVE / DELETE ---------- */

// GET /api/astronomy-shows/{id}
async fn retrieve_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let show = fetch_show(&state.db.pool, id).await?;
    let theme = fetch_show_themes(&state.db.pool, id).await?;

    Ok((
        StatusCode::OK,
        Json(ShowDetail {
            id: show.id,
            title: show.title,
            description: show.description,
            theme,
            image: show.image,
        }),
    ))
}

// DELETE /api/astronomy-shows/{id}
//
// Deletion is refused while sessions reference the show, so booking
// history never disappears behind a catalog edit.
async fn delete_show(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Write, Resource::Catalog)?;

    let has_sessions: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM show_sessions WHERE show_id = $1)",
    )
    .bind(id)
    .fetch_one(&state.db.pool)
    .await?;

    if has_sessions {
        return Err(ApiError::Conflict(
            "astronomy show still has scheduled sessions".to_string(),
        ));
    }

    let deleted = sqlx::query("DELETE FROM astronomy_shows WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("astronomy show"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/* ---------- IMAGE UPLOAD ---------- */

#[derive(Debug, Serialize)]
struct ShowImageResponse {
    id: i64,
    image: String,
}

// POST /api/astronomy-shows/{id}/upload-image
async fn upload_image(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Write, Resource::Catalog)?;

    let show = fetch_show(&state.db.pool, id).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("image") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("invalid multipart body: {e}")))?;
            upload = Some((file_name, data.to_vec()));
        }
    }

    let (file_name, data) = upload
        .ok_or_else(|| ApiError::Validation("multipart field \"image\" is required".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::Validation("uploaded image is empty".to_string()));
    }
    media::validate_image(&file_name, &data)?;

    let relative =
        media::store_show_image(&state.config.app.media_root, &show.title, &file_name, &data)
            .await?;

    sqlx::query("UPDATE astronomy_shows SET image = $1 WHERE id = $2")
        .bind(&relative)
        .bind(id)
        .execute(&state.db.pool)
        .await?;

    Ok((StatusCode::OK, Json(ShowImageResponse { id, image: relative })))
}
