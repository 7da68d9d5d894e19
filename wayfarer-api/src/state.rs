use std::sync::Arc;

use wayfarer_core::repository::{BookingRepository, TourRepository};
use wayfarer_store::app_config::BusinessRules;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub tours: Arc<dyn TourRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}
