pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod memory;
mod retry;
pub mod tour_repo;

pub use app_config::{BusinessRules, Config};
pub use booking_repo::StoreBookingRepository;
pub use database::DbClient;
pub use memory::MemoryStore;
pub use tour_repo::StoreTourRepository;
