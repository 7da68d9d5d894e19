use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use wayfarer_core::booking::{
    total_price_cents, Booking, BookingStatus, PaymentStatus, ReservationRequest,
};
use wayfarer_core::error::LedgerError;
use wayfarer_core::repository::BookingRepository;
use wayfarer_core::tour::Tour;

use crate::retry::{with_retries, Attempt};
use crate::tour_repo::{TourRow, SELECT_TOUR};

pub struct StoreBookingRepository {
    pool: PgPool,
    retry_attempts: u32,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool, retry_attempts: u32) -> Self {
        Self {
            pool,
            retry_attempts,
        }
    }

    async fn fetch_tour_tx(
        tx: &mut Transaction<'_, Postgres>,
        tour_id: Uuid,
    ) -> Result<Tour, LedgerError> {
        let row = sqlx::query_as::<_, TourRow>(&format!("{} WHERE id = $1", SELECT_TOUR))
            .bind(tour_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(storage)?;
        row.ok_or_else(|| LedgerError::tour_not_found(tour_id))?
            .into_tour()
    }

    /// Write the tour's capacity fields under its version guard. Returns
    /// false when another writer got there first.
    async fn write_capacity_tx(
        tx: &mut Transaction<'_, Postgres>,
        tour: &Tour,
        expected_version: i64,
    ) -> Result<bool, LedgerError> {
        let res = sqlx::query(
            "UPDATE tours SET seats_committed = $1, status = $2, version = version + 1, \
             updated_at = NOW() WHERE id = $3 AND version = $4",
        )
        .bind(tour.seats_committed)
        .bind(tour.status.as_str())
        .bind(tour.id)
        .bind(expected_version)
        .execute(&mut **tx)
        .await
        .map_err(storage)?;
        Ok(res.rows_affected() == 1)
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    tour_id: Uuid,
    customer_id: String,
    party_size: i32,
    total_price_cents: i64,
    status: String,
    payment_status: String,
    special_requests: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, LedgerError> {
        let status = BookingStatus::parse(&self.status).ok_or_else(|| {
            LedgerError::Storage(format!("unknown booking status '{}'", self.status))
        })?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            LedgerError::Storage(format!("unknown payment status '{}'", self.payment_status))
        })?;
        Ok(Booking {
            id: self.id,
            tour_id: self.tour_id,
            customer_id: self.customer_id,
            party_size: self.party_size,
            total_price_cents: self.total_price_cents,
            status,
            payment_status,
            special_requests: self.special_requests,
            confirmed_at: self.confirmed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_BOOKING: &str = "SELECT id, tour_id, customer_id, party_size, total_price_cents, \
     status, payment_status, special_requests, confirmed_at, created_at, updated_at FROM bookings";

fn storage(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    /// Reserve seats inside one transaction: read the tour, run the
    /// domain checks, bump the committed count under the version guard,
    /// insert the PENDING booking. Both writes commit or fail together;
    /// a lost version race rolls back and retries a bounded number of
    /// times.
    async fn reserve(&self, req: &ReservationRequest) -> Result<Booking, LedgerError> {
        req.validate()?;

        with_retries(self.retry_attempts, |attempt| async move {
            let now = Utc::now();
            let mut tx = self.pool.begin().await.map_err(storage)?;

            let mut tour = Self::fetch_tour_tx(&mut tx, req.tour_id).await?;
            tour.check_accepting(now)?;
            tour.check_capacity_for(req.party_size)?;

            // Price frozen at reservation time.
            let total = total_price_cents(tour.price_cents, req.party_size);
            let expected_version = tour.version;
            tour.commit_seats(req.party_size)?;

            if !Self::write_capacity_tx(&mut tx, &tour, expected_version).await? {
                tx.rollback().await.map_err(storage)?;
                tracing::debug!(
                    tour_id = %req.tour_id,
                    attempt,
                    "reservation lost capacity race, retrying"
                );
                return Ok(Attempt::LostRace(LedgerError::ConcurrencyConflict {
                    tour_id: req.tour_id,
                }));
            }

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

            sqlx::query(
                "INSERT INTO bookings (id, tour_id, customer_id, party_size, total_price_cents, \
                 status, payment_status, special_requests, confirmed_at, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(booking.id)
            .bind(booking.tour_id)
            .bind(&booking.customer_id)
            .bind(booking.party_size)
            .bind(booking.total_price_cents)
            .bind(booking.status.as_str())
            .bind(booking.payment_status.as_str())
            .bind(&booking.special_requests)
            .bind(booking.confirmed_at)
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

            tx.commit().await.map_err(storage)?;

            tracing::info!(
                booking_id = %booking.id,
                tour_id = %req.tour_id,
                party_size = req.party_size,
                "seats reserved"
            );
            Ok(Attempt::Commit(booking))
        })
        .await
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, LedgerError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{} WHERE id = $1", SELECT_BOOKING))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_bookings(&self, customer_id: &str) -> Result<Vec<Booking>, LedgerError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{} WHERE customer_id = $1 ORDER BY created_at DESC",
            SELECT_BOOKING
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    /// Status transition. The booking write is guarded on the status the
    /// transition was validated against, so a concurrent transition on the
    /// same booking forces a re-read instead of silently overwriting it.
    /// Cancellations release the held seats in the same transaction as the
    /// booking update, so the release can be neither skipped nor
    /// double-applied.
    async fn update_status(&self, id: Uuid, target: BookingStatus) -> Result<Booking, LedgerError> {
        with_retries(self.retry_attempts, |attempt| async move {
            let now = Utc::now();
            let mut tx = self.pool.begin().await.map_err(storage)?;

            let row = sqlx::query_as::<_, BookingRow>(&format!("{} WHERE id = $1", SELECT_BOOKING))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage)?;
            let mut booking = row
                .ok_or_else(|| LedgerError::booking_not_found(id))?
                .into_booking()?;

            let previous = booking.status;
            let was_holding = previous.holds_seats();
            booking.transition_to(target, now)?;

            let res = sqlx::query(
                "UPDATE bookings SET status = $1, confirmed_at = $2, updated_at = $3 \
                 WHERE id = $4 AND status = $5",
            )
            .bind(booking.status.as_str())
            .bind(booking.confirmed_at)
            .bind(booking.updated_at)
            .bind(id)
            .bind(previous.as_str())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

            if res.rows_affected() == 0 {
                // Someone else moved this booking between our read and
                // write; the next read sees the committed state and the
                // transition table rules on it.
                tx.rollback().await.map_err(storage)?;
                tracing::debug!(
                    booking_id = %id,
                    tour_id = %booking.tour_id,
                    attempt,
                    "booking status moved underneath transition, retrying"
                );
                return Ok(Attempt::LostRace(LedgerError::ConcurrencyConflict {
                    tour_id: booking.tour_id,
                }));
            }

            if target == BookingStatus::CANCELLED && was_holding {
                let mut tour = Self::fetch_tour_tx(&mut tx, booking.tour_id).await?;
                let expected_version = tour.version;
                tour.release_seats(booking.party_size)?;

                if !Self::write_capacity_tx(&mut tx, &tour, expected_version).await? {
                    tx.rollback().await.map_err(storage)?;
                    tracing::debug!(
                        booking_id = %id,
                        tour_id = %booking.tour_id,
                        attempt,
                        "cancellation lost capacity race, retrying"
                    );
                    return Ok(Attempt::LostRace(LedgerError::ConcurrencyConflict {
                        tour_id: booking.tour_id,
                    }));
                }
                tracing::info!(
                    booking_id = %id,
                    tour_id = %booking.tour_id,
                    released = booking.party_size,
                    "reservation cancelled, seats released"
                );
            }

            tx.commit().await.map_err(storage)?;
            Ok(Attempt::Commit(booking))
        })
        .await
    }
}
