use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::PlanetariumDome;
use crate::permissions::{self, Action, Resource};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/planetarium-domes", get(list_domes).post(create_dome))
        .route("/planetarium-domes/{id}", get(retrieve_dome).delete(delete_dome))
}

/// Dome payload with the derived capacity attached.
#[derive(Debug, Serialize)]
struct DomeResponse {
    id: i64,
    name: String,
    row_count: i32,
    seats_in_row: i32,
    capacity: i64,
}

impl From<PlanetariumDome> for DomeResponse {
    fn from(dome: PlanetariumDome) -> Self {
        DomeResponse {
            capacity: dome.capacity(),
            id: dome.id,
            name: dome.name,
            row_count: dome.row_count,
            seats_in_row: dome.seats_in_row,
        }
    }
}

// GET /api/planetarium-domes
async fn list_domes(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let domes = sqlx::query_as::<_, PlanetariumDome>(
        "SELECT id, name, row_count, seats_in_row FROM planetarium_domes ORDER BY id",
    )
    .fetch_all(&state.db.pool)
    .await?;

    let payload: Vec<DomeResponse> = domes.into_iter().map(DomeResponse::from).collect();
    Ok((StatusCode::OK, Json(payload)))
}

// POST /api/planetarium-domes
#[derive(Debug, Deserialize, Validate)]
struct CreateDomeRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1..255 characters"))]
    name: String,
    #[validate(range(min = 1, message = "row_count must be at least 1"))]
    row_count: i32,
    #[validate(range(min = 1, message = "seats_in_row must be at least 1"))]
    seats_in_row: i32,
}

async fn create_dome(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateDomeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Write, Resource::Catalog)?;
    req.validate()?;

    let dome = sqlx::query_as::<_, PlanetariumDome>(
        "INSERT INTO planetarium_domes (name, row_count, seats_in_row)
         VALUES ($1, $2, $3)
         RETURNING id, name, row_count, seats_in_row",
    )
    .bind(&req.name)
    .bind(req.row_count)
    .bind(req.seats_in_row)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(DomeResponse::from(dome))))
}

// GET /api/planetarium-domes/{id}
async fn retrieve_dome(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let dome = sqlx::query_as::<_, PlanetariumDome>(
        "SELECT id, name, row_count, seats_in_row FROM planetarium_domes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound("planetarium dome"))?;

    Ok((StatusCode::OK, Json(DomeResponse::from(dome))))
}

// DELETE /api/planetarium-domes/{id}
//
// Same RESTRICT policy as shows: a dome with scheduled sessions cannot be
// removed.
async fn delete_dome(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Write, Resource::Catalog)?;

    let has_sessions: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM show_sessions WHERE dome_id = $1)",
    )
    .bind(id)
    .fetch_one(&state.db.pool)
    .await?;

    if has_sessions {
        return Err(ApiError::Conflict(
            "planetarium dome still has scheduled sessions".to_string(),
        ));
    }

    let deleted = sqlx::query("DELETE FROM planetarium_domes WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound("planetarium dome"));
    }

    Ok(StatusCode::NO_CONTENT)
}
