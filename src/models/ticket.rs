use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A claim on one (row, seat) pair within one session. The schema enforces
/// uniqueness of (session_id, seat_row, seat_number).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub session_id: i64,
    pub reservation_id: i64,
    #[serde(rename = "row")]
    pub seat_row: i32,
    #[serde(rename = "seat")]
    pub seat_number: i32,
}
