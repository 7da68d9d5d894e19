use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{total_price_cents, Booking, BookingStatus, PaymentStatus, ReservationRequest};
use crate::error::LedgerError;
use crate::tour::{Tour, TourUpdate};

/// In-memory seat reservation ledger.
///
/// Holds the authoritative reservation rules: capacity check and seat
/// commit happen under one `&mut self` call, so wrapping the ledger in a
/// mutex gives the per-tour atomic unit the race freedom depends on. The
/// Postgres repositories implement the same rules with a transactional
/// read-validate-write.
pub struct ReservationLedger {
    tours: HashMap<Uuid, Tour>,
    bookings: HashMap<Uuid, Booking>,
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self {
            tours: HashMap::new(),
            bookings: HashMap::new(),
        }
    }

    pub fn insert_tour(&mut self, tour: Tour) {
        self.tours.insert(tour.id, tour);
    }

    pub fn tour(&self, id: Uuid) -> Option<&Tour> {
        self.tours.get(&id)
    }

    pub fn tours(&self) -> impl Iterator<Item = &Tour> {
        self.tours.values()
    }

    pub fn booking(&self, id: Uuid) -> Option<&Booking> {
        self.bookings.get(&id)
    }

    pub fn bookings_for_customer(&self, customer_id: &str) -> Vec<Booking> {
        let mut out: Vec<Booking> = self
            .bookings
            .values()
            .filter(|b| b.customer_id == customer_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Reserve seats on a tour, creating a PENDING booking.
    ///
    /// Checks run in order, each short-circuiting with a distinct error:
    /// tour exists, tour accepting, capacity. On success the committed
    /// count and the new booking change together.
    pub fn reserve(&mut self, req: &ReservationRequest, now: DateTime<Utc>) -> Result<Booking, LedgerError> {
        req.validate()?;

        let tour = self
            .tours
            .get_mut(&req.tour_id)
            .ok_or_else(|| LedgerError::tour_not_found(req.tour_id))?;

        tour.check_accepting(now)?;
        tour.check_capacity_for(req.party_size)?;

        // Price is frozen here; later tour price changes do not touch it.
        let total = total_price_cents(tour.price_cents, req.party_size);
        tour.commit_seats(req.party_size)?;

        let booking = Booking {
            id: Uuid::new_v4(),
            tour_id: req.tour_id,
            customer_id: req.customer_id.clone(),
            party_size: req.party_size,
            total_price_cents: total,
            status: BookingStatus::PENDING,
            payment_status: PaymentStatus::UNPAID,
            special_requests: req.special_requests.clone(),
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        };

        tracing::info!(
            booking_id = %booking.id,
            tour_id = %req.tour_id,
            party_size = req.party_size,
            "seats reserved"
        );

        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    /// Move a booking through its lifecycle. A transition to CANCELLED
    /// releases the held seats exactly once.
    pub fn update_status(
        &mut self,
        booking_id: Uuid,
        target: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, LedgerError> {
        let booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| LedgerError::booking_not_found(booking_id))?;

        let was_holding = booking.status.holds_seats();
        booking.transition_to(target, now)?;

        if target == BookingStatus::CANCELLED && was_holding {
            let tour = self
                .tours
                .get_mut(&booking.tour_id)
                .ok_or_else(|| LedgerError::tour_not_found(booking.tour_id))?;
            tour.release_seats(booking.party_size)?;
            tracing::info!(
                booking_id = %booking_id,
                tour_id = %booking.tour_id,
                released = booking.party_size,
                "reservation cancelled, seats released"
            );
        }

        Ok(booking.clone())
    }

    /// Remaining seats on a tour. Advisory read; the authoritative check
    /// happens inside `reserve`.
    pub fn availability(&self, tour_id: Uuid) -> Result<i32, LedgerError> {
        let tour = self
            .tours
            .get(&tour_id)
            .ok_or_else(|| LedgerError::tour_not_found(tour_id))?;
        tour.seats_available()
    }

    pub fn apply_tour_update(&mut self, tour_id: Uuid, update: &TourUpdate) -> Result<Tour, LedgerError> {
        let tour = self
            .tours
            .get_mut(&tour_id)
            .ok_or_else(|| LedgerError::tour_not_found(tour_id))?;
        update.apply(tour)?;
        Ok(tour.clone())
    }

    /// Sum of party sizes across seat-holding bookings for a tour.
    /// Always equal to the tour's committed count.
    pub fn held_seats(&self, tour_id: Uuid) -> i32 {
        self.bookings
            .values()
            .filter(|b| b.tour_id == tour_id && b.status.holds_seats())
            .map(|b| b.party_size)
            .sum()
    }
}

impl Default for ReservationLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::TourStatus;
    use std::sync::{Arc, Mutex};

    fn request(tour_id: Uuid, customer: &str, party_size: i32) -> ReservationRequest {
        ReservationRequest {
            tour_id,
            customer_id: customer.to_string(),
            party_size,
            special_requests: None,
        }
    }

    fn ledger_with_tour(price_cents: i64, max: i32) -> (ReservationLedger, Uuid) {
        let mut ledger = ReservationLedger::new();
        let tour = Tour::new("Ninh Binh Day Trip", "Ninh Binh", price_cents, max);
        let id = tour.id;
        ledger.insert_tour(tour);
        (ledger, id)
    }

    #[test]
    fn reserve_unknown_tour_fails_not_found() {
        let mut ledger = ReservationLedger::new();
        let err = ledger
            .reserve(&request(Uuid::new_v4(), "cust-1", 2), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { kind: "tour", .. }));
    }

    #[test]
    fn reserve_freezes_total_price() {
        let (mut ledger, tour_id) = ledger_with_tour(10000, 10);

        let booking = ledger
            .reserve(&request(tour_id, "cust-1", 3), Utc::now())
            .unwrap();
        assert_eq!(booking.total_price_cents, 30000);

        // A later price change must not leak into the existing booking.
        let update = TourUpdate {
            price_cents: Some(15000),
            ..Default::default()
        };
        ledger.apply_tour_update(tour_id, &update).unwrap();
        assert_eq!(
            ledger.booking(booking.id).unwrap().total_price_cents,
            30000
        );
    }

    #[test]
    fn near_full_tour_rejects_then_fills() {
        let (mut ledger, tour_id) = ledger_with_tour(10000, 10);
        ledger.reserve(&request(tour_id, "cust-1", 9), Utc::now()).unwrap();

        let err = ledger
            .reserve(&request(tour_id, "cust-2", 2), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CapacityExceeded {
                requested: 2,
                available: 1
            }
        ));
        assert_eq!(err.shortfall(), Some(1));
        assert_eq!(ledger.tour(tour_id).unwrap().seats_committed, 9);

        ledger.reserve(&request(tour_id, "cust-3", 1), Utc::now()).unwrap();
        let tour = ledger.tour(tour_id).unwrap();
        assert_eq!(tour.seats_committed, 10);
        assert_eq!(tour.status, TourStatus::FULL);
    }

    #[test]
    fn cancelling_confirmed_booking_frees_seats_and_reopens_tour() {
        let (mut ledger, tour_id) = ledger_with_tour(10000, 4);
        let booking = ledger
            .reserve(&request(tour_id, "cust-1", 4), Utc::now())
            .unwrap();
        ledger
            .update_status(booking.id, BookingStatus::CONFIRMED, Utc::now())
            .unwrap();
        assert_eq!(ledger.tour(tour_id).unwrap().status, TourStatus::FULL);

        ledger
            .update_status(booking.id, BookingStatus::CANCELLED, Utc::now())
            .unwrap();
        let tour = ledger.tour(tour_id).unwrap();
        assert_eq!(tour.seats_committed, 0);
        assert_eq!(tour.status, TourStatus::AVAILABLE);
    }

    #[test]
    fn cancellation_is_not_double_applied() {
        let (mut ledger, tour_id) = ledger_with_tour(10000, 10);
        let booking = ledger
            .reserve(&request(tour_id, "cust-1", 3), Utc::now())
            .unwrap();

        ledger
            .update_status(booking.id, BookingStatus::CANCELLED, Utc::now())
            .unwrap();
        assert_eq!(ledger.tour(tour_id).unwrap().seats_committed, 0);

        // Second cancellation fails the transition check and must not
        // release seats again.
        let err = ledger
            .update_status(booking.id, BookingStatus::CANCELLED, Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(ledger.tour(tour_id).unwrap().seats_committed, 0);
    }

    #[test]
    fn committed_count_matches_seat_holding_bookings() {
        let (mut ledger, tour_id) = ledger_with_tour(10000, 20);
        let b1 = ledger.reserve(&request(tour_id, "cust-1", 3), Utc::now()).unwrap();
        let b2 = ledger.reserve(&request(tour_id, "cust-2", 5), Utc::now()).unwrap();
        let b3 = ledger.reserve(&request(tour_id, "cust-3", 2), Utc::now()).unwrap();

        ledger.update_status(b1.id, BookingStatus::CONFIRMED, Utc::now()).unwrap();
        ledger.update_status(b2.id, BookingStatus::CANCELLED, Utc::now()).unwrap();
        ledger.update_status(b3.id, BookingStatus::CONFIRMED, Utc::now()).unwrap();
        ledger.update_status(b3.id, BookingStatus::COMPLETED, Utc::now()).unwrap();

        let tour = ledger.tour(tour_id).unwrap();
        // COMPLETED keeps its seats; only the cancelled booking released.
        assert_eq!(tour.seats_committed, 3 + 2);
        assert_eq!(ledger.held_seats(tour_id), 3);
        // b3 completed: seats stay committed but the derived sum counts
        // only PENDING/CONFIRMED, so compare against live holds plus the
        // completed booking's size.
        assert_eq!(tour.seats_committed, ledger.held_seats(tour_id) + b3.party_size);
    }

    #[test]
    fn pending_is_never_a_transition_target() {
        let (mut ledger, tour_id) = ledger_with_tour(10000, 10);
        let booking = ledger
            .reserve(&request(tour_id, "cust-1", 1), Utc::now())
            .unwrap();

        let err = ledger
            .update_status(booking.id, BookingStatus::PENDING, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: BookingStatus::PENDING,
                to: BookingStatus::PENDING
            }
        ));

        // Moving a confirmed booking back to PENDING is likewise outside
        // the table, and must not disturb the held seats.
        ledger
            .update_status(booking.id, BookingStatus::CONFIRMED, Utc::now())
            .unwrap();
        let err = ledger
            .update_status(booking.id, BookingStatus::PENDING, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: BookingStatus::CONFIRMED,
                to: BookingStatus::PENDING
            }
        ));
        assert_eq!(ledger.tour(tour_id).unwrap().seats_committed, 1);
    }

    #[test]
    fn unknown_booking_fails_not_found_for_any_target() {
        let (mut ledger, _tour_id) = ledger_with_tour(10000, 10);
        for target in [
            BookingStatus::PENDING,
            BookingStatus::CONFIRMED,
            BookingStatus::CANCELLED,
        ] {
            let err = ledger
                .update_status(Uuid::new_v4(), target, Utc::now())
                .unwrap_err();
            assert!(matches!(err, LedgerError::NotFound { kind: "booking", .. }));
        }
    }

    #[test]
    fn full_tour_rejects_with_zero_availability() {
        let (mut ledger, tour_id) = ledger_with_tour(10000, 3);
        ledger.reserve(&request(tour_id, "cust-1", 3), Utc::now()).unwrap();
        assert_eq!(ledger.tour(tour_id).unwrap().status, TourStatus::FULL);

        let err = ledger
            .reserve(&request(tour_id, "cust-2", 1), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CapacityExceeded {
                requested: 1,
                available: 0
            }
        ));
    }

    #[test]
    fn racing_reservations_never_overbook() {
        let (mut ledger, tour_id) = ledger_with_tour(10000, 10);
        // Leave exactly 4 seats for 10 racing single-seat requests.
        ledger.reserve(&request(tour_id, "warmup", 6), Utc::now()).unwrap();

        let ledger = Arc::new(Mutex::new(ledger));
        let mut handles = Vec::new();
        for i in 0..10 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                let req = request(tour_id, &format!("cust-{}", i), 1);
                ledger.lock().unwrap().reserve(&req, Utc::now()).is_ok()
            }));
        }

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 4);
        let ledger = ledger.lock().unwrap();
        let tour = ledger.tour(tour_id).unwrap();
        assert_eq!(tour.seats_committed, 10);
        assert_eq!(tour.status, TourStatus::FULL);
    }
}
