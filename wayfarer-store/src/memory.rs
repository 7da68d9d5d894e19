use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use wayfarer_core::booking::{Booking, BookingStatus, ReservationRequest};
use wayfarer_core::error::LedgerError;
use wayfarer_core::ledger::ReservationLedger;
use wayfarer_core::repository::{BookingRepository, TourRepository};
use wayfarer_core::tour::{Tour, TourUpdate};

/// In-memory store over the core reservation ledger. All mutating calls
/// funnel through one mutex, the single-writer discipline the ledger
/// requires. Used by tests and local development.
pub struct MemoryStore {
    inner: Mutex<ReservationLedger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ReservationLedger::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ReservationLedger>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Storage("ledger mutex poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TourRepository for MemoryStore {
    async fn create_tour(&self, tour: &Tour) -> Result<(), LedgerError> {
        self.lock()?.insert_tour(tour.clone());
        Ok(())
    }

    async fn get_tour(&self, id: Uuid) -> Result<Option<Tour>, LedgerError> {
        Ok(self.lock()?.tour(id).cloned())
    }

    async fn list_tours(&self) -> Result<Vec<Tour>, LedgerError> {
        let ledger = self.lock()?;
        let mut tours: Vec<Tour> = ledger.tours().cloned().collect();
        tours.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tours)
    }

    async fn update_tour(&self, id: Uuid, update: &TourUpdate) -> Result<Tour, LedgerError> {
        self.lock()?.apply_tour_update(id, update)
    }

    async fn availability(&self, id: Uuid) -> Result<i32, LedgerError> {
        self.lock()?.availability(id)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn reserve(&self, req: &ReservationRequest) -> Result<Booking, LedgerError> {
        self.lock()?.reserve(req, Utc::now())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, LedgerError> {
        Ok(self.lock()?.booking(id).cloned())
    }

    async fn list_bookings(&self, customer_id: &str) -> Result<Vec<Booking>, LedgerError> {
        Ok(self.lock()?.bookings_for_customer(customer_id))
    }

    async fn update_status(&self, id: Uuid, target: BookingStatus) -> Result<Booking, LedgerError> {
        self.lock()?.update_status(id, target, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seeded_store(max: i32) -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let tour = Tour::new("Ha Giang Loop", "Ha Giang", 25000, max);
        let id = tour.id;
        store.inner.lock().unwrap().insert_tour(tour);
        (store, id)
    }

    #[tokio::test]
    async fn reserve_and_cancel_roundtrip() {
        let (store, tour_id) = seeded_store(5);
        let req = ReservationRequest {
            tour_id,
            customer_id: "cust-1".to_string(),
            party_size: 2,
            special_requests: None,
        };

        let booking = store.reserve(&req).await.unwrap();
        assert_eq!(store.availability(tour_id).await.unwrap(), 3);

        store
            .update_status(booking.id, BookingStatus::CANCELLED)
            .await
            .unwrap();
        assert_eq!(store.availability(tour_id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn concurrent_single_seat_reservations_respect_capacity() {
        let (store, tour_id) = seeded_store(4);

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let req = ReservationRequest {
                    tour_id,
                    customer_id: format!("cust-{}", i),
                    party_size: 1,
                    special_requests: None,
                };
                store.reserve(&req).await
            }));
        }

        let mut successes = 0;
        let mut capacity_failures = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(LedgerError::CapacityExceeded { .. }) => capacity_failures += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(successes, 4);
        assert_eq!(capacity_failures, 6);
        assert_eq!(store.availability(tour_id).await.unwrap(), 0);
    }
}
