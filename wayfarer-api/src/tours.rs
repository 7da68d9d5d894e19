use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chrono::{DateTime, Utc};
use wayfarer_core::tour::{Tour, TourUpdate};

use crate::error::AppError;
use crate::middleware::auth::admin_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTourRequest {
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub max_participants: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    tour_id: Uuid,
    seats_available: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tours", get(list_tours))
        .route("/v1/tours/{id}", get(get_tour))
        .route("/v1/tours/{id}/availability", get(get_availability))
}

pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/tours", post(create_tour))
        .route("/v1/admin/tours/{id}", put(update_tour))
        .layer(axum::middleware::from_fn_with_state(
            state,
            admin_auth_middleware,
        ))
}

async fn list_tours(State(state): State<AppState>) -> Result<Json<Vec<Tour>>, AppError> {
    let tours = state.tours.list_tours().await?;
    Ok(Json(tours))
}

async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tour>, AppError> {
    let tour = state
        .tours
        .get_tour(id)
        .await?
        .ok_or_else(|| wayfarer_core::error::LedgerError::tour_not_found(id))?;
    Ok(Json(tour))
}

/// Advisory read of remaining seats. The binding capacity check happens
/// inside the reservation itself.
async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let seats_available = state.tours.availability(id).await?;
    Ok(Json(AvailabilityResponse {
        tour_id: id,
        seats_available,
    }))
}

async fn create_tour(
    State(state): State<AppState>,
    Json(req): Json<CreateTourRequest>,
) -> Result<Json<Tour>, AppError> {
    if req.max_participants < 0 {
        return Err(wayfarer_core::error::LedgerError::InvalidInput(
            "max_participants must not be negative".to_string(),
        )
        .into());
    }
    if req.price_cents < 0 {
        return Err(wayfarer_core::error::LedgerError::InvalidInput(
            "price_cents must not be negative".to_string(),
        )
        .into());
    }

    let mut tour = Tour::new(
        &req.name,
        &req.destination,
        req.price_cents,
        req.max_participants,
    );
    tour.description = req.description;
    tour.start_date = req.start_date;
    tour.registration_deadline = req.registration_deadline;

    state.tours.create_tour(&tour).await?;
    tracing::info!(tour_id = %tour.id, name = %tour.name, "tour created");
    Ok(Json(tour))
}

/// Field-level update. The repository contract keeps `seats_committed`
/// out of reach of this path.
async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<TourUpdate>,
) -> Result<Json<Tour>, AppError> {
    let tour = state.tours.update_tour(id, &update).await?;
    Ok(Json(tour))
}
