use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wayfarer_core::booking::{Booking, BookingStatus, ReservationRequest};
use wayfarer_core::error::LedgerError;

use crate::error::AppError;
use crate::middleware::auth::{customer_auth_middleware, CustomerClaims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub tour_id: Uuid,
    pub party_size: i32,
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub party_size: i32,
    pub total_price_cents: i64,
    pub status: String,
    pub payment_status: String,
    pub special_requests: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            tour_id: b.tour_id,
            party_size: b.party_size,
            total_price_cents: b.total_price_cents,
            status: b.status.to_string(),
            payment_status: b.payment_status.as_str().to_string(),
            special_requests: b.special_requests,
            confirmed_at: b.confirmed_at,
            created_at: b.created_at,
        }
    }
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/status", patch(update_booking_status))
        .layer(axum::middleware::from_fn_with_state(
            state,
            customer_auth_middleware,
        ))
}

/// Reserve seats on a tour for the authenticated customer.
async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    if req.party_size > state.business_rules.max_party_size {
        return Err(LedgerError::InvalidInput(format!(
            "party size {} exceeds the per-booking limit of {}",
            req.party_size, state.business_rules.max_party_size
        ))
        .into());
    }

    let reservation = ReservationRequest {
        tour_id: req.tour_id,
        customer_id: claims.sub,
        party_size: req.party_size,
        special_requests: req.special_requests,
    };

    let booking = state.bookings.reserve(&reservation).await?;
    Ok(Json(booking.into()))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.bookings.list_bookings(&claims.sub).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = fetch_owned_booking(&state, &claims, id).await?;
    Ok(Json(booking.into()))
}

async fn update_booking_status(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let target = BookingStatus::parse(&req.status).ok_or_else(|| {
        LedgerError::InvalidInput(format!("unknown booking status '{}'", req.status))
    })?;

    // Ownership check before any mutation.
    fetch_owned_booking(&state, &claims, id).await?;

    let booking = state.bookings.update_status(id, target).await?;
    Ok(Json(booking.into()))
}

async fn fetch_owned_booking(
    state: &AppState,
    claims: &CustomerClaims,
    id: Uuid,
) -> Result<Booking, AppError> {
    let booking = state
        .bookings
        .get_booking(id)
        .await?
        .ok_or_else(|| LedgerError::booking_not_found(id))?;
    if booking.customer_id != claims.sub {
        return Err(AppError::AuthorizationError(
            "booking does not belong to you".to_string(),
        ));
    }
    Ok(booking)
}
