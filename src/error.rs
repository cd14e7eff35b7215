use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the whole API surface. Every handler and the booking
/// engine return this type; `IntoResponse` maps it to a structured JSON
/// body so no internal detail leaks to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Seat bounds violation; `field` names the offending input.
    #[error("{message}")]
    InvalidSeat {
        field: &'static str,
        message: String,
    },

    /// The (session, row, seat) triple is already claimed. Seat contention
    /// is a legitimate outcome the client handles by re-choosing a seat.
    #[error("seat {seat} in row {row} is already taken for this session")]
    SeatTaken { row: i32, seat: i32 },

    #[error("authentication required")]
    Unauthenticated,

    #[error("you do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidSeat { .. } => StatusCode::BAD_REQUEST,
            ApiError::SeatTaken { .. } => StatusCode::CONFLICT,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidSeat { .. } => "INVALID_SEAT",
            ApiError::SeatTaken { .. } => "SEAT_TAKEN",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "internal server error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("internal error: {:?}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": self.code(),
            "message": message,
        });
        if let ApiError::InvalidSeat { field, .. } = &self {
            body["field"] = json!(field);
        }

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::NotFound("show session").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidSeat { field: "row", message: "row must be between 1 and 5".into() }
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::SeatTaken { row: 1, seat: 1 }.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Validation("tickets: empty".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("dome has sessions".into()).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn database_errors_keep_a_generic_message() {
        let err = ApiError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_seat_names_the_field() {
        let err = ApiError::InvalidSeat { field: "seat", message: "seat must be between 1 and 10".into() };
        assert_eq!(err.code(), "INVALID_SEAT");
        assert_eq!(err.to_string(), "seat must be between 1 and 10");
    }
}
