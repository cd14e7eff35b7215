use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::ShowTheme;
use crate::permissions::{self, Action, Resource};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/show-themes", get(list_themes).post(create_theme))
}

// GET /api/show-themes
async fn list_themes(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let themes = sqlx::query_as::<_, ShowTheme>("SELECT id, name FROM show_themes ORDER BY id")
        .fetch_all(&state.db.pool)
        .await?;

    Ok((StatusCode::OK, Json(themes)))
}

// POST /api/show-themes
#[derive(Debug, Deserialize, Validate)]
struct CreateThemeRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1..100 characters"))]
    name: String,
}

async fn create_theme(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateThemeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Write, Resource::Catalog)?;
    req.validate()?;

    let theme = sqlx::query_as::<_, ShowTheme>(
        "INSERT INTO show_themes (name) VALUES ($1) RETURNING id, name",
    )
    .bind(&req.name)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict(format!("theme \"{}\" already exists", req.name))
        }
        other => ApiError::Database(other),
    })?;

    Ok((StatusCode::CREATED, Json(theme)))
}
