use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use wayfarer_core::error::LedgerError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    Ledger(LedgerError),
    InternalServerError(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::AuthenticationError(msg) => {
                error_response(StatusCode::UNAUTHORIZED, &msg)
            }
            AppError::AuthorizationError(msg) => error_response(StatusCode::FORBIDDEN, &msg),
            AppError::Ledger(err) => ledger_response(err),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

/// Each ledger error kind maps to its own status so callers can tell the
/// failure modes apart.
fn ledger_response(err: LedgerError) -> Response {
    match &err {
        LedgerError::NotFound { .. } => error_response(StatusCode::NOT_FOUND, &err.to_string()),
        LedgerError::TourClosed { .. } => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
        }
        LedgerError::CapacityExceeded {
            requested,
            available,
        } => {
            let body = Json(json!({
                "error": err.to_string(),
                "requested": requested,
                "available": available,
                "shortfall": requested - available,
            }));
            (StatusCode::CONFLICT, body).into_response()
        }
        LedgerError::InvalidInput(_) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
        LedgerError::InvalidTransition { .. } => {
            error_response(StatusCode::CONFLICT, &err.to_string())
        }
        LedgerError::ConcurrencyConflict { .. } => {
            error_response(StatusCode::CONFLICT, &err.to_string())
        }
        LedgerError::CapacityInvariant { .. } => {
            // Data-integrity fault. Logged loudly, reported opaquely.
            tracing::error!("Data integrity fault: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
        LedgerError::Storage(msg) => {
            tracing::error!("Storage error: {}", msg);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = Json(json!({
        "error": message,
    }));
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn ledger_errors_map_to_distinct_statuses() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (
                AppError::Ledger(LedgerError::tour_not_found(Uuid::new_v4())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Ledger(LedgerError::TourClosed {
                    tour_id: Uuid::new_v4(),
                    reason: "tour status is CANCELLED".to_string(),
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Ledger(LedgerError::CapacityExceeded {
                    requested: 5,
                    available: 2,
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Ledger(LedgerError::InvalidInput("bad".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Ledger(LedgerError::ConcurrencyConflict {
                    tour_id: Uuid::new_v4(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Ledger(LedgerError::CapacityInvariant {
                    tour_id: Uuid::new_v4(),
                    committed: 11,
                    max: 10,
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
