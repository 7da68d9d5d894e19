pub mod booking;
pub mod error;
pub mod ledger;
pub mod repository;
pub mod tour;

pub use booking::{Booking, BookingStatus, PaymentStatus, ReservationRequest};
pub use error::LedgerError;
pub use ledger::ReservationLedger;
pub use repository::{BookingRepository, TourRepository};
pub use tour::{Tour, TourStatus, TourUpdate};
