//! booking.rs
//!
//! The seat reservation engine: creates one reservation owning one ticket
//! per requested seat, all inside a single transaction.
//!
//! Validation per requested seat, in order:
//! - the session must exist (resolves the dome and its bounds)
//! - 1 <= row <= dome.row_count
//! - 1 <= seat <= dome.seats_in_row
//! - the (session, row, seat) triple must not already be claimed
//!
//! The pre-insert existence check gives a clean error on the common path,
//! but the authoritative tie-break under concurrency is the schema-level
//! unique constraint: if two transactions race for the same seat, exactly
//! one insert succeeds and the loser's duplicate-key error is translated
//! to `SeatTaken`.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::models::{Reservation, Ticket};

/// One requested seat within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatRequest {
    pub session_id: i64,
    pub row: i32,
    pub seat: i32,
}

/// Row/seat bounds of the dome a session plays in.
#[derive(Debug, Clone, FromRow)]
pub struct DomeBounds {
    pub row_count: i32,
    pub seats_in_row: i32,
}

/// Checks a seat against the dome grid. Pure, so the bounds rules are
/// testable without a store.
pub fn validate_seat(row: i32, seat: i32, dome: &DomeBounds) -> Result<(), ApiError> {
    if !(1..=dome.row_count).contains(&row) {
        return Err(ApiError::InvalidSeat {
            field: "row",
            message: format!("row must be between 1 and {}", dome.row_count),
        });
    }
    if !(1..=dome.seats_in_row).contains(&seat) {
        return Err(ApiError::InvalidSeat {
            field: "seat",
            message: format!("seat must be between 1 and {}", dome.seats_in_row),
        });
    }
    Ok(())
}

async fn session_bounds(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    session_id: i64,
) -> Result<DomeBounds, ApiError> {
    sqlx::query_as::<_, DomeBounds>(
        r#"
        SELECT d.row_count, d.seats_in_row
        FROM show_sessions s
        JOIN planetarium_domes d ON d.id = s.dome_id
        WHERE s.id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(ApiError::NotFound("show session"))
}

/// Creates a reservation with all requested tickets, or nothing at all.
/// Any failed check rolls the whole batch back.
pub async fn create_reservation(
    pool: &PgPool,
    user_id: i64,
    requests: &[SeatRequest],
) -> Result<(Reservation, Vec<Ticket>), ApiError> {
    if requests.is_empty() {
        return Err(ApiError::Validation("tickets must not be empty".to_string()));
    }

    let mut tx = pool.begin().await?;

    // Sessions repeat within a batch; resolve each dome once.
    let mut bounds: HashMap<i64, DomeBounds> = HashMap::new();
    for req in requests {
        let dome = match bounds.get(&req.session_id) {
            Some(b) => b.clone(),
            None => {
                let b = session_bounds(&mut tx, req.session_id).await?;
                bounds.insert(req.session_id, b.clone());
                b
            }
        };

        validate_seat(req.row, req.seat, &dome)?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM tickets
                WHERE session_id = $1 AND seat_row = $2 AND seat_number = $3
            )",
        )
        .bind(req.session_id)
        .bind(req.row)
        .bind(req.seat)
        .fetch_one(&mut *tx)
        .await?;

        if taken {
            return Err(ApiError::SeatTaken { row: req.row, seat: req.seat });
        }
    }

    let reservation = sqlx::query_as::<_, Reservation>(
        "INSERT INTO reservations (user_id) VALUES ($1)
         RETURNING id, user_id, created_at",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut tickets = Vec::with_capacity(requests.len());
    for req in requests {
        let ticket = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (session_id, reservation_id, seat_row, seat_number)
             VALUES ($1, $2, $3, $4)
             RETURNING id, session_id, reservation_id, seat_row, seat_number",
        )
        .bind(req.session_id)
        .bind(reservation.id)
        .bind(req.row)
        .bind(req.seat)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            // A concurrent transaction claimed the seat between our check
            // and this insert; the constraint is the tie-break.
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::SeatTaken { row: req.row, seat: req.seat }
            }
            other => ApiError::Database(other),
        })?;
        tickets.push(ticket);
    }

    tx.commit().await?;
    Ok((reservation, tickets))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dome() -> DomeBounds {
        DomeBounds { row_count: 5, seats_in_row: 10 }
    }

    #[test]
    fn seat_is_valid_iff_within_bounds() {
        let d = dome();
        for row in -1..=7 {
            for seat in -1..=12 {
                let in_bounds = (1..=5).contains(&row) && (1..=10).contains(&seat);
                assert_eq!(
                    validate_seat(row, seat, &d).is_ok(),
                    in_bounds,
                    "row={row} seat={seat}"
                );
            }
        }
    }

    #[test]
    fn row_out_of_range_names_the_row_field() {
        let err = validate_seat(0, 1, &dome()).unwrap_err();
        match err {
            ApiError::InvalidSeat { field, message } => {
                assert_eq!(field, "row");
                assert_eq!(message, "row must be between 1 and 5");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = validate_seat(6, 1, &dome()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidSeat { field: "row", .. }));
    }

    #[test]
    fn seat_out_of_range_names_the_seat_field() {
        let err = validate_seat(1, 11, &dome()).unwrap_err();
        match err {
            ApiError::InvalidSeat { field, message } => {
                assert_eq!(field, "seat");
                assert_eq!(message, "seat must be between 1 and 10");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn row_is_checked_before_seat() {
        // both invalid: the row error wins
        let err = validate_seat(0, 0, &dome()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidSeat { field: "row", .. }));
    }
}
