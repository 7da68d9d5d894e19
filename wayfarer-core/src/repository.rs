use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, ReservationRequest};
use crate::error::LedgerError;
use crate::tour::{Tour, TourUpdate};

/// Repository trait for tour data access.
#[async_trait]
pub trait TourRepository: Send + Sync {
    async fn create_tour(&self, tour: &Tour) -> Result<(), LedgerError>;

    async fn get_tour(&self, id: Uuid) -> Result<Option<Tour>, LedgerError>;

    async fn list_tours(&self) -> Result<Vec<Tour>, LedgerError>;

    /// Field-level update. Implementations must leave `seats_committed`
    /// and `version` untouched; capacity moves only through bookings.
    async fn update_tour(&self, id: Uuid, update: &TourUpdate) -> Result<Tour, LedgerError>;

    /// Advisory, lock-free availability read.
    async fn availability(&self, id: Uuid) -> Result<i32, LedgerError>;
}

/// Repository trait for booking data access. `reserve` and a CANCELLED
/// `update_status` span both the booking and the tour capacity row in one
/// atomic unit.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn reserve(&self, req: &ReservationRequest) -> Result<Booking, LedgerError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, LedgerError>;

    async fn list_bookings(&self, customer_id: &str) -> Result<Vec<Booking>, LedgerError>;

    async fn update_status(&self, id: Uuid, target: BookingStatus) -> Result<Booking, LedgerError>;
}
