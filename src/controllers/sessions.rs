use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{AstronomyShow, PlanetariumDome, ShowSession};
use crate::permissions::{self, Action, Resource};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/show-sessions", get(list_sessions).post(create_session))
        .route("/show-sessions/{id}", get(retrieve_session))
}

/* ---------- LIST ---------- */

// GET /api/show-sessions
//
// tickets_available is an aggregation over the current ticket set, computed
// at read time. It is never stored, so it cannot drift from the tickets
// actually sold.
#[derive(Debug, Serialize, FromRow)]
pub struct SessionListItem {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub show_title: String,
    pub dome_name: String,
    pub dome_capacity: i64,
    pub tickets_available: i64,
}

pub async fn fetch_session_listing(
    pool: &sqlx::PgPool,
) -> Result<Vec<SessionListItem>, ApiError> {
    let sessions = sqlx::query_as::<_, SessionListItem>(
        r#"
        SELECT s.id,
               s.show_time,
               a.title AS show_title,
               d.name AS dome_name,
               (d.row_count::BIGINT * d.seats_in_row) AS dome_capacity,
               (d.row_count::BIGINT * d.seats_in_row) - COUNT(t.id) AS tickets_available
        FROM show_sessions s
        JOIN astronomy_shows a ON a.id = s.show_id
        JOIN planetarium_domes d ON d.id = s.dome_id
        LEFT JOIN tickets t ON t.session_id = s.id
        GROUP BY s.id, s.show_time, a.title, d.name, d.row_count, d.seats_in_row
        ORDER BY s.show_time, s.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = fetch_session_listing(&state.db.pool).await?;
    Ok((StatusCode::OK, Json(sessions)))
}

/* ---------- CREATE ---------- */

// POST /api/show-sessions
#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    show_id: i64,
    dome_id: i64,
    show_time: DateTime<Utc>,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Write, Resource::Catalog)?;

    let show_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM astronomy_shows WHERE id = $1)")
            .bind(req.show_id)
            .fetch_one(&state.db.pool)
            .await?;
    if !show_exists {
        return Err(ApiError::NotFound("astronomy show"));
    }

    let dome_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM planetarium_domes WHERE id = $1)")
            .bind(req.dome_id)
            .fetch_one(&state.db.pool)
            .await?;
    if !dome_exists {
        return Err(ApiError::NotFound("planetarium dome"));
    }

    let session = sqlx::query_as::<_, ShowSession>(
        "INSERT INTO show_sessions (show_id, dome_id, show_time)
         VALUES ($1, $2, $3)
         RETURNING id, show_id, dome_id, show_time",
    )
    .bind(req.show_id)
    .bind(req.dome_id)
    .bind(req.show_time)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/* ---------- RETRIEVE ---------- */

#[derive(Debug, Serialize, FromRow)]
struct TakenPlace {
    #[serde(rename = "row")]
    seat_row: i32,
    #[serde(rename = "seat")]
    seat_number: i32,
}

#[derive(Debug, Serialize)]
struct DomeDetail {
    id: i64,
    name: String,
    row_count: i32,
    seats_in_row: i32,
    capacity: i64,
}

#[derive(Debug, Serialize)]
struct SessionDetail {
    id: i64,
    show_time: DateTime<Utc>,
    astronomy_show: AstronomyShow,
    planetarium_dome: DomeDetail,
    taken_places: Vec<TakenPlace>,
}

// GET /api/show-sessions/{id}
async fn retrieve_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session = sqlx::query_as::<_, ShowSession>(
        "SELECT id, show_id, dome_id, show_time FROM show_sessions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound("show session"))?;

    let show = sqlx::query_as::<_, AstronomyShow>(
        "SELECT id, title, description, image FROM astronomy_shows WHERE id = $1",
    )
    .bind(session.show_id)
    .fetch_one(&state.db.pool)
    .await?;

    let dome = sqlx::query_as::<_, PlanetariumDome>(
        "SELECT id, name, row_count, seats_in_row FROM planetarium_domes WHERE id = $1",
    )
    .bind(session.dome_id)
    .fetch_one(&state.db.pool)
    .await?;

    let taken_places = sqlx::query_as::<_, TakenPlace>(
        "SELECT seat_row, seat_number FROM tickets
         WHERE session_id = $1
         ORDER BY seat_row, seat_number",
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok((
        StatusCode::OK,
        Json(SessionDetail {
            id: session.id,
            show_time: session.show_time,
            astronomy_show: show,
            planetarium_dome: DomeDetail {
                capacity: dome.capacity(),
                id: dome.id,
                name: dome.name,
                row_count: dome.row_count,
                seats_in_row: dome.seats_in_row,
            },
            taken_places,
        }),
    ))
}
