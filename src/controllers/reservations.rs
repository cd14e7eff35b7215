use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{ApiQuery, AuthUser};
use crate::permissions::{self, Action, Resource};
use crate::services::booking::{self, SeatRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/reservations", get(list_reservations).post(create_reservation))
}

/* ---------- helpers ---------- */

/// Clamps page parameters to (limit, offset). Page size defaults to 10,
/// capped at 100.
fn page_bounds(page: Option<u32>, page_size: Option<u32>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size.unwrap_or(10).clamp(1, 100);
    (page_size as i64, (page as i64 - 1) * page_size as i64)
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    id: i64,
    show_title: String,
    dome_name: String,
    dome_capacity: i64,
    show_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct TicketItem {
    id: i64,
    row: i32,
    seat: i32,
    show_session: SessionSummary,
}

#[derive(Debug, Serialize)]
struct ReservationItem {
    id: i64,
    created_at: DateTime<Utc>,
    tickets: Vec<TicketItem>,
}

/// Loads the given reservations (already scoped to the caller) with their
/// tickets tagged by session, preserving newest-first order.
async fn load_reservations(
    pool: &sqlx::PgPool,
    user_id: i64,
    ids: &[i64],
) -> Result<Vec<ReservationItem>, ApiError> {
    let rows = sqlx::query(
        r#"
        SELECT r.id AS rid, r.created_at,
               t.id AS tid, t.seat_row, t.seat_number,
               s.id AS sid, s.show_time,
               a.title AS show_title, d.name AS dome_name,
               (d.row_count::BIGINT * d.seats_in_row) AS dome_capacity
        FROM reservations r
        JOIN tickets t ON t.reservation_id = r.id
        JOIN show_sessions s ON s.id = t.session_id
        JOIN astronomy_shows a ON a.id = s.show_id
        JOIN planetarium_domes d ON d.id = s.dome_id
        WHERE r.user_id = $1 AND r.id = ANY($2)
        ORDER BY r.created_at DESC, r.id DESC, t.seat_row, t.seat_number
        "#,
    )
    .bind(user_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let mut items: Vec<ReservationItem> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();
    for r in rows {
        let rid: i64 = r.get("rid");
        let pos = *index.entry(rid).or_insert_with(|| {
            items.push(ReservationItem {
                id: rid,
                created_at: r.get("created_at"),
                tickets: Vec::new(),
            });
            items.len() - 1
        });
        items[pos].tickets.push(TicketItem {
            id: r.get("tid"),
            row: r.get("seat_row"),
            seat: r.get("seat_number"),
            show_session: SessionSummary {
                id: r.get("sid"),
                show_title: r.get("show_title"),
                dome_name: r.get("dome_name"),
                dome_capacity: r.get("dome_capacity"),
                show_time: r.get("show_time"),
            },
        });
    }

    Ok(items)
}

/* ---------- LIST ---------- */

// GET /api/reservations?page=..&pageSize=..
//
// The query itself is scoped by user_id, so there is no path that returns
// another caller's reservations.
#[derive(Debug, Deserialize)]
struct ReservationsQuery {
    page: Option<u32>,
    #[serde(rename = "pageSize")]
    page_size: Option<u32>,
}

async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<ReservationsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Read, Resource::Reservation)?;

    let (limit, offset) = page_bounds(params.page, params.page_size);

    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM reservations
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db.pool)
    .await?;

    let items = load_reservations(&state.db.pool, user.user_id, &ids).await?;
    Ok((StatusCode::OK, Json(items)))
}

/* ---------- CREATE ---------- */

// POST /api/reservations — the booking engine's entry point.
#[derive(Debug, Deserialize, Validate)]
struct CreateReservationRequest {
    #[validate(length(min = 1, message = "tickets must not be empty"))]
    tickets: Vec<SeatRequest>,
}

async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    permissions::authorize(Some(&user), Action::Write, Resource::Reservation)?;
    req.validate()?;

    let (reservation, _tickets) =
        booking::create_reservation(&state.db.pool, user.user_id, &req.tickets).await?;

    // respond with the same session-tagged shape the listing uses
    let items = load_reservations(&state.db.pool, user.user_id, &[reservation.id]).await?;
    let item = items
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound("reservation"))?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_defaults_to_first_page_of_ten() {
        assert_eq!(page_bounds(None, None), (10, 0));
    }

    #[test]
    fn page_bounds_computes_offset_from_page() {
        assert_eq!(page_bounds(Some(3), Some(25)), (25, 50));
    }

    #[test]
    fn page_bounds_clamps_size_and_page() {
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 0));
        assert_eq!(page_bounds(Some(1), Some(1000)), (100, 0));
    }
}
