use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use wayfarer_core::error::LedgerError;
use wayfarer_core::repository::TourRepository;
use wayfarer_core::tour::{Tour, TourStatus, TourUpdate};

use crate::retry::{with_retries, Attempt};

pub struct StoreTourRepository {
    pool: PgPool,
    retry_attempts: u32,
}

impl StoreTourRepository {
    pub fn new(pool: PgPool, retry_attempts: u32) -> Self {
        Self {
            pool,
            retry_attempts,
        }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
pub(crate) struct TourRow {
    pub id: Uuid,
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub max_participants: i32,
    pub seats_committed: i32,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TourRow {
    pub(crate) fn into_tour(self) -> Result<Tour, LedgerError> {
        let status = TourStatus::parse(&self.status)
            .ok_or_else(|| LedgerError::Storage(format!("unknown tour status '{}'", self.status)))?;
        Ok(Tour {
            id: self.id,
            name: self.name,
            destination: self.destination,
            description: self.description,
            price_cents: self.price_cents,
            max_participants: self.max_participants,
            seats_committed: self.seats_committed,
            status,
            start_date: self.start_date,
            registration_deadline: self.registration_deadline,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub(crate) const SELECT_TOUR: &str = "SELECT id, name, destination, description, price_cents, \
     max_participants, seats_committed, status, start_date, registration_deadline, version, \
     created_at, updated_at FROM tours";

fn storage(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

#[async_trait]
impl TourRepository for StoreTourRepository {
    async fn create_tour(&self, tour: &Tour) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO tours (id, name, destination, description, price_cents, max_participants, \
             seats_committed, status, start_date, registration_deadline, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(tour.id)
        .bind(&tour.name)
        .bind(&tour.destination)
        .bind(&tour.description)
        .bind(tour.price_cents)
        .bind(tour.max_participants)
        .bind(tour.seats_committed)
        .bind(tour.status.as_str())
        .bind(tour.start_date)
        .bind(tour.registration_deadline)
        .bind(tour.version)
        .bind(tour.created_at)
        .bind(tour.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn get_tour(&self, id: Uuid) -> Result<Option<Tour>, LedgerError> {
        let row = sqlx::query_as::<_, TourRow>(&format!("{} WHERE id = $1", SELECT_TOUR))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(TourRow::into_tour).transpose()
    }

    async fn list_tours(&self) -> Result<Vec<Tour>, LedgerError> {
        let rows = sqlx::query_as::<_, TourRow>(&format!("{} ORDER BY created_at DESC", SELECT_TOUR))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.into_iter().map(TourRow::into_tour).collect()
    }

    /// Field update under the tour's optimistic version guard. The query
    /// never writes `seats_committed`; capacity accounting moves only
    /// through the booking repository.
    async fn update_tour(&self, id: Uuid, update: &TourUpdate) -> Result<Tour, LedgerError> {
        with_retries(self.retry_attempts, |attempt| async move {
            let row = sqlx::query_as::<_, TourRow>(&format!("{} WHERE id = $1", SELECT_TOUR))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
            let mut tour = row
                .ok_or_else(|| LedgerError::tour_not_found(id))?
                .into_tour()?;
            let expected_version = tour.version;

            update.apply(&mut tour)?;

            let res = sqlx::query(
                "UPDATE tours SET name = $1, destination = $2, description = $3, price_cents = $4, \
                 max_participants = $5, status = $6, start_date = $7, registration_deadline = $8, \
                 version = version + 1, updated_at = NOW() \
                 WHERE id = $9 AND version = $10",
            )
            .bind(&tour.name)
            .bind(&tour.destination)
            .bind(&tour.description)
            .bind(tour.price_cents)
            .bind(tour.max_participants)
            .bind(tour.status.as_str())
            .bind(tour.start_date)
            .bind(tour.registration_deadline)
            .bind(id)
            .bind(expected_version)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

            if res.rows_affected() == 0 {
                tracing::debug!(tour_id = %id, attempt, "tour update lost version race, retrying");
                return Ok(Attempt::LostRace(LedgerError::ConcurrencyConflict {
                    tour_id: id,
                }));
            }
            tour.version = expected_version + 1;
            Ok(Attempt::Commit(tour))
        })
        .await
    }

    async fn availability(&self, id: Uuid) -> Result<i32, LedgerError> {
        // Single stale-tolerant read; the authoritative check runs inside
        // the reservation transaction.
        let row = sqlx::query_as::<_, TourRow>(&format!("{} WHERE id = $1", SELECT_TOUR))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        let tour = row
            .ok_or_else(|| LedgerError::tour_not_found(id))?
            .into_tour()?;
        tour.seats_available()
    }
}
