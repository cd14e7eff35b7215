use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlanetariumDome {
    pub id: i64,
    pub name: String,
    pub row_count: i32,
    pub seats_in_row: i32,
}

impl PlanetariumDome {
    /// Total number of seats. Always derived, never stored.
    pub fn capacity(&self) -> i64 {
        self.row_count as i64 * self.seats_in_row as i64
    }
}
