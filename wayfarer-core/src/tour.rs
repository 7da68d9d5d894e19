use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TourStatus {
    AVAILABLE,
    FULL,
    CANCELLED,
    COMPLETED,
}

impl TourStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourStatus::AVAILABLE => "AVAILABLE",
            TourStatus::FULL => "FULL",
            TourStatus::CANCELLED => "CANCELLED",
            TourStatus::COMPLETED => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(TourStatus::AVAILABLE),
            "FULL" => Some(TourStatus::FULL),
            "CANCELLED" => Some(TourStatus::CANCELLED),
            "COMPLETED" => Some(TourStatus::COMPLETED),
            _ => None,
        }
    }
}

impl std::fmt::Display for TourStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable tour with finite participant capacity.
///
/// `seats_committed` counts every seat held by a PENDING or CONFIRMED
/// booking. It is mutated only by the reservation ledger, never by the
/// general tour-update path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    /// Price per participant in minor currency units.
    pub price_cents: i64,
    pub max_participants: i32,
    pub seats_committed: i32,
    pub status: TourStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    /// Optimistic-concurrency counter, bumped on every capacity write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tour {
    pub fn new(name: &str, destination: &str, price_cents: i64, max_participants: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            destination: destination.to_string(),
            description: None,
            price_cents,
            max_participants,
            seats_committed: 0,
            // committed == max from the start when capacity is zero.
            status: if max_participants == 0 {
                TourStatus::FULL
            } else {
                TourStatus::AVAILABLE
            },
            start_date: None,
            registration_deadline: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remaining seats. Errors out (loudly) if the stored state already
    /// violates `0 <= committed <= max` instead of clamping.
    pub fn seats_available(&self) -> Result<i32, LedgerError> {
        self.check_capacity_invariant()?;
        Ok(self.max_participants - self.seats_committed)
    }

    pub fn check_capacity_invariant(&self) -> Result<(), LedgerError> {
        if self.seats_committed < 0 || self.seats_committed > self.max_participants {
            tracing::error!(
                tour_id = %self.id,
                committed = self.seats_committed,
                max = self.max_participants,
                "capacity invariant violated, refusing to serve tour"
            );
            return Err(LedgerError::CapacityInvariant {
                tour_id: self.id,
                committed: self.seats_committed,
                max: self.max_participants,
            });
        }
        Ok(())
    }

    /// Whether the tour accepts new reservations at `now`.
    pub fn check_accepting(&self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        match self.status {
            // FULL is derived from capacity, so a full tour is still
            // accepting; the capacity check is what rejects, with the
            // numeric shortfall.
            TourStatus::AVAILABLE | TourStatus::FULL => {}
            other => {
                return Err(LedgerError::TourClosed {
                    tour_id: self.id,
                    reason: format!("tour status is {}", other),
                })
            }
        }
        if let Some(deadline) = self.registration_deadline {
            if deadline < now {
                return Err(LedgerError::TourClosed {
                    tour_id: self.id,
                    reason: "registration deadline has passed".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn check_capacity_for(&self, party_size: i32) -> Result<(), LedgerError> {
        let available = self.seats_available()?;
        if party_size > available {
            return Err(LedgerError::CapacityExceeded {
                requested: party_size,
                available,
            });
        }
        Ok(())
    }

    /// Commit `party_size` seats. Callers must have run the accepting and
    /// capacity checks first; this re-verifies capacity as a last line.
    pub fn commit_seats(&mut self, party_size: i32) -> Result<(), LedgerError> {
        self.check_capacity_for(party_size)?;
        self.seats_committed += party_size;
        if self.seats_committed == self.max_participants {
            // Derived state: a tour at capacity reads as FULL.
            self.status = TourStatus::FULL;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Return `party_size` seats to the pool after a cancellation.
    pub fn release_seats(&mut self, party_size: i32) -> Result<(), LedgerError> {
        self.check_capacity_invariant()?;
        if party_size > self.seats_committed {
            // Releasing more than was ever committed means the ledger and
            // the booking store disagree.
            return Err(LedgerError::CapacityInvariant {
                tour_id: self.id,
                committed: self.seats_committed - party_size,
                max: self.max_participants,
            });
        }
        self.seats_committed -= party_size;
        if self.status == TourStatus::FULL {
            self.status = TourStatus::AVAILABLE;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Field-level tour update. Capacity accounting (`seats_committed`,
/// `version`) is deliberately absent: those move only through the ledger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TourUpdate {
    pub name: Option<String>,
    pub destination: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub max_participants: Option<i32>,
    pub status: Option<TourStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
}

impl TourUpdate {
    /// Apply the update to a tour, preserving capacity accounting.
    pub fn apply(&self, tour: &mut Tour) -> Result<(), LedgerError> {
        if let Some(max) = self.max_participants {
            if max < tour.seats_committed {
                return Err(LedgerError::InvalidInput(format!(
                    "max_participants {} is below {} already-committed seats",
                    max, tour.seats_committed
                )));
            }
            tour.max_participants = max;
        }
        if let Some(status) = self.status {
            if status == TourStatus::FULL {
                return Err(LedgerError::InvalidInput(
                    "FULL is derived from capacity and cannot be set directly".to_string(),
                ));
            }
            tour.status = status;
        }
        if let Some(ref name) = self.name {
            tour.name = name.clone();
        }
        if let Some(ref destination) = self.destination {
            tour.destination = destination.clone();
        }
        if let Some(ref description) = self.description {
            tour.description = Some(description.clone());
        }
        if let Some(price) = self.price_cents {
            tour.price_cents = price;
        }
        if let Some(start) = self.start_date {
            tour.start_date = Some(start);
        }
        if let Some(deadline) = self.registration_deadline {
            tour.registration_deadline = Some(deadline);
        }
        // Re-derive FULL/AVAILABLE after a capacity resize.
        if tour.status == TourStatus::AVAILABLE && tour.seats_committed == tour.max_participants {
            tour.status = TourStatus::FULL;
        } else if tour.status == TourStatus::FULL && tour.seats_committed < tour.max_participants {
            tour.status = TourStatus::AVAILABLE;
        }
        tour.updated_at = Utc::now();
        Ok(())
    }
}
