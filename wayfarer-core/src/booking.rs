use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    PENDING,
    CONFIRMED,
    CANCELLED,
    COMPLETED,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PENDING => "PENDING",
            BookingStatus::CONFIRMED => "CONFIRMED",
            BookingStatus::CANCELLED => "CANCELLED",
            BookingStatus::COMPLETED => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::PENDING),
            "CONFIRMED" => Some(BookingStatus::CONFIRMED),
            "CANCELLED" => Some(BookingStatus::CANCELLED),
            "COMPLETED" => Some(BookingStatus::COMPLETED),
            _ => None,
        }
    }

    /// Whether a booking in this status counts against tour capacity.
    pub fn holds_seats(&self) -> bool {
        matches!(self, BookingStatus::PENDING | BookingStatus::CONFIRMED)
    }

    /// Transition table:
    /// PENDING → CONFIRMED | CANCELLED, CONFIRMED → CANCELLED | COMPLETED.
    /// CANCELLED and COMPLETED are terminal. PENDING is initial-only.
    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, target),
            (PENDING, CONFIRMED) | (PENDING, CANCELLED) | (CONFIRMED, CANCELLED) | (CONFIRMED, COMPLETED)
        )
    }

    pub fn validate_transition(&self, target: BookingStatus) -> Result<(), LedgerError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(LedgerError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment state, tracked independently of the booking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    UNPAID,
    PARTIAL,
    PAID,
    REFUNDED,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::UNPAID => "UNPAID",
            PaymentStatus::PARTIAL => "PARTIAL",
            PaymentStatus::PAID => "PAID",
            PaymentStatus::REFUNDED => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(PaymentStatus::UNPAID),
            "PARTIAL" => Some(PaymentStatus::PARTIAL),
            "PAID" => Some(PaymentStatus::PAID),
            "REFUNDED" => Some(PaymentStatus::REFUNDED),
            _ => None,
        }
    }
}

/// A reservation of `party_size` seats against exactly one tour.
///
/// `total_price_cents` is frozen at reservation time and never recomputed
/// when the tour's price changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub customer_id: String,
    pub party_size: i32,
    pub total_price_cents: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub special_requests: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Apply a validated status transition, recording `confirmed_at` on
    /// the PENDING → CONFIRMED edge.
    pub fn transition_to(&mut self, target: BookingStatus, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.status.validate_transition(target)?;
        if self.status == BookingStatus::PENDING && target == BookingStatus::CONFIRMED {
            self.confirmed_at = Some(now);
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }
}

/// Validated input to the reserve operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub tour_id: Uuid,
    pub customer_id: String,
    pub party_size: i32,
    pub special_requests: Option<String>,
}

impl ReservationRequest {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.party_size <= 0 {
            return Err(LedgerError::InvalidInput(
                "party size must be a positive integer".to_string(),
            ));
        }
        if self.customer_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput("customer id is required".to_string()));
        }
        Ok(())
    }
}

pub fn total_price_cents(price_per_seat_cents: i64, party_size: i32) -> i64 {
    price_per_seat_cents * party_size as i64
}
