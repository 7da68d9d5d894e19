use uuid::Uuid;

use crate::booking::BookingStatus;

/// Errors produced by the seat reservation ledger.
///
/// Every variant except `Storage` and `CapacityInvariant` is an expected,
/// recoverable outcome that callers must be able to distinguish.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("tour {tour_id} is not accepting reservations: {reason}")]
    TourClosed { tour_id: Uuid, reason: String },

    #[error("insufficient seats: requested {requested}, available {available}")]
    CapacityExceeded { requested: i32, available: i32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("concurrent update conflict on tour {tour_id}, retries exhausted")]
    ConcurrencyConflict { tour_id: Uuid },

    /// Committed seats were observed above the tour's maximum. This is a
    /// data-integrity fault, never a normal runtime condition.
    #[error("capacity invariant violated on tour {tour_id}: committed {committed} > max {max}")]
    CapacityInvariant {
        tour_id: Uuid,
        committed: i32,
        max: i32,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn tour_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { kind: "tour", id }
    }

    pub fn booking_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { kind: "booking", id }
    }

    /// Seats missing to satisfy a rejected reservation.
    pub fn shortfall(&self) -> Option<i32> {
        match self {
            LedgerError::CapacityExceeded {
                requested,
                available,
            } => Some(requested - available),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exceeded_reports_shortfall() {
        let err = LedgerError::CapacityExceeded {
            requested: 2,
            available: 1,
        };
        assert_eq!(err.shortfall(), Some(1));

        let other = LedgerError::tour_not_found(Uuid::new_v4());
        assert_eq!(other.shortfall(), None);
    }
}
